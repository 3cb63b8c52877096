//! Binary encoding for index snapshots.
//!
//! Every persisted shape implements [`Codec`]. The impl is picked from the
//! declared type, so nested containers compose without any per-call-site
//! glue:
//!
//! ```
//! use darwin::utils::{from_bytes, to_bytes};
//! use std::collections::HashMap;
//!
//! let mut cities: HashMap<String, Vec<String>> = HashMap::new();
//! cities.insert("Beijing".into(), vec!["010".into(), "North China".into()]);
//!
//! let bytes = to_bytes(&cities).unwrap();
//! let back: HashMap<String, Vec<String>> = from_bytes(&bytes).unwrap();
//! assert_eq!(cities, back);
//! ```
//!
//! A type without a `Codec` impl is rejected when the program is compiled,
//! and the compiler error names the type:
//!
//! ```compile_fail
//! struct Opaque;
//! darwin::utils::to_bytes(&Opaque).unwrap();
//! ```
//!
//! ## Layout
//!
//! - scalars: fixed-width little-endian bytes (`usize`/`isize` widened to 64 bits)
//! - strings: `u64` byte length, then the raw UTF-8 bytes
//! - pairs: first, then second
//! - sequences, maps, sets: `u64` count, then each element (key before value)
//! - records: each field in declared order, no tags

use std::any::type_name;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fs::File;
use std::hash::{BuildHasher, Hash};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;
use thiserror::Error;

/// Upper bound on elements reserved up front from a decoded count.
/// Counts come from untrusted input; larger containers grow as they fill.
const MAX_PREALLOC: usize = 4096;

/// Errors raised while encoding or decoding.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("unexpected end of input while decoding {shape}")]
    Truncated { shape: &'static str },

    #[error("invalid {shape} encoding: {reason}")]
    Invalid { shape: &'static str, reason: String },

    #[error("{count} trailing bytes after decoding {shape}")]
    TrailingBytes { shape: &'static str, count: usize },
}

impl CodecError {
    pub fn invalid<T: ?Sized>(reason: impl Into<String>) -> Self {
        CodecError::Invalid {
            shape: type_name::<T>(),
            reason: reason.into(),
        }
    }
}

/// A value with a self-delimiting binary encoding.
///
/// `decode` must consume exactly the bytes `encode` wrote.
pub trait Codec: Sized {
    fn encode<W: Write + ?Sized>(&self, writer: &mut W) -> Result<(), CodecError>;

    fn decode<R: Read + ?Sized>(reader: &mut R) -> Result<Self, CodecError>;
}

/// Fill `buf` from `reader`, reporting a short read as truncation of `T`.
fn read_exact<T: ?Sized, R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> Result<(), CodecError> {
    reader.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => CodecError::Truncated {
            shape: type_name::<T>(),
        },
        _ => CodecError::Io(e),
    })
}

/// Write a length or element count
pub fn encode_len<W: Write + ?Sized>(len: usize, writer: &mut W) -> Result<(), CodecError> {
    (len as u64).encode(writer)
}

/// Read a length or element count written by [`encode_len`], on behalf of `T`
pub fn decode_len<T: ?Sized, R: Read + ?Sized>(reader: &mut R) -> Result<usize, CodecError> {
    let mut buf = [0u8; 8];
    read_exact::<T, R>(reader, &mut buf)?;
    let len = u64::from_le_bytes(buf);
    usize::try_from(len).map_err(|_| CodecError::invalid::<T>(format!("length {len} does not fit in usize")))
}

macro_rules! impl_scalar_codec {
    ($($ty:ty),* $(,)?) => {$(
        impl Codec for $ty {
            #[inline]
            fn encode<W: Write + ?Sized>(&self, writer: &mut W) -> Result<(), CodecError> {
                writer.write_all(&self.to_le_bytes())?;
                Ok(())
            }

            #[inline]
            fn decode<R: Read + ?Sized>(reader: &mut R) -> Result<Self, CodecError> {
                let mut buf = [0u8; std::mem::size_of::<$ty>()];
                read_exact::<$ty, R>(reader, &mut buf)?;
                Ok(<$ty>::from_le_bytes(buf))
            }
        }
    )*};
}

impl_scalar_codec!(u8, u16, u32, u64, u128, i8, i16, i32, i64, i128, f32, f64);

impl Codec for usize {
    fn encode<W: Write + ?Sized>(&self, writer: &mut W) -> Result<(), CodecError> {
        (*self as u64).encode(writer)
    }

    fn decode<R: Read + ?Sized>(reader: &mut R) -> Result<Self, CodecError> {
        let value = u64::decode(reader)?;
        usize::try_from(value).map_err(|_| CodecError::invalid::<usize>(format!("{value} out of range")))
    }
}

impl Codec for isize {
    fn encode<W: Write + ?Sized>(&self, writer: &mut W) -> Result<(), CodecError> {
        (*self as i64).encode(writer)
    }

    fn decode<R: Read + ?Sized>(reader: &mut R) -> Result<Self, CodecError> {
        let value = i64::decode(reader)?;
        isize::try_from(value).map_err(|_| CodecError::invalid::<isize>(format!("{value} out of range")))
    }
}

impl Codec for bool {
    fn encode<W: Write + ?Sized>(&self, writer: &mut W) -> Result<(), CodecError> {
        (*self as u8).encode(writer)
    }

    fn decode<R: Read + ?Sized>(reader: &mut R) -> Result<Self, CodecError> {
        match u8::decode(reader)? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(CodecError::invalid::<bool>(format!("byte {other:#04x}"))),
        }
    }
}

impl Codec for char {
    fn encode<W: Write + ?Sized>(&self, writer: &mut W) -> Result<(), CodecError> {
        (*self as u32).encode(writer)
    }

    fn decode<R: Read + ?Sized>(reader: &mut R) -> Result<Self, CodecError> {
        let value = u32::decode(reader)?;
        char::from_u32(value)
            .ok_or_else(|| CodecError::invalid::<char>(format!("{value:#x} is not a scalar value")))
    }
}

impl Codec for String {
    fn encode<W: Write + ?Sized>(&self, writer: &mut W) -> Result<(), CodecError> {
        encode_len(self.len(), writer)?;
        writer.write_all(self.as_bytes())?;
        Ok(())
    }

    fn decode<R: Read + ?Sized>(reader: &mut R) -> Result<Self, CodecError> {
        let len = decode_len::<String, R>(reader)?;
        let mut bytes = Vec::with_capacity(len.min(MAX_PREALLOC * 16));
        let read = (&mut *reader).take(len as u64).read_to_end(&mut bytes)?;
        if read != len {
            return Err(CodecError::Truncated {
                shape: type_name::<String>(),
            });
        }
        String::from_utf8(bytes).map_err(|e| CodecError::invalid::<String>(e.to_string()))
    }
}

impl<A: Codec, B: Codec> Codec for (A, B) {
    fn encode<W: Write + ?Sized>(&self, writer: &mut W) -> Result<(), CodecError> {
        self.0.encode(writer)?;
        self.1.encode(writer)
    }

    fn decode<R: Read + ?Sized>(reader: &mut R) -> Result<Self, CodecError> {
        let first = A::decode(reader)?;
        let second = B::decode(reader)?;
        Ok((first, second))
    }
}

impl<T: Codec> Codec for Vec<T> {
    fn encode<W: Write + ?Sized>(&self, writer: &mut W) -> Result<(), CodecError> {
        encode_len(self.len(), writer)?;
        for item in self {
            item.encode(writer)?;
        }
        Ok(())
    }

    fn decode<R: Read + ?Sized>(reader: &mut R) -> Result<Self, CodecError> {
        let count = decode_len::<Self, R>(reader)?;
        let mut items = Vec::with_capacity(count.min(MAX_PREALLOC));
        for _ in 0..count {
            items.push(T::decode(reader)?);
        }
        Ok(items)
    }
}

impl<K, V, S> Codec for HashMap<K, V, S>
where
    K: Codec + Eq + Hash,
    V: Codec,
    S: BuildHasher + Default,
{
    fn encode<W: Write + ?Sized>(&self, writer: &mut W) -> Result<(), CodecError> {
        encode_len(self.len(), writer)?;
        for (key, value) in self {
            key.encode(writer)?;
            value.encode(writer)?;
        }
        Ok(())
    }

    fn decode<R: Read + ?Sized>(reader: &mut R) -> Result<Self, CodecError> {
        let count = decode_len::<Self, R>(reader)?;
        let mut map = HashMap::with_capacity_and_hasher(count.min(MAX_PREALLOC), S::default());
        for _ in 0..count {
            let key = K::decode(reader)?;
            let value = V::decode(reader)?;
            if map.insert(key, value).is_some() {
                return Err(CodecError::invalid::<Self>("duplicate key"));
            }
        }
        Ok(map)
    }
}

impl<T, S> Codec for HashSet<T, S>
where
    T: Codec + Eq + Hash,
    S: BuildHasher + Default,
{
    fn encode<W: Write + ?Sized>(&self, writer: &mut W) -> Result<(), CodecError> {
        encode_len(self.len(), writer)?;
        for item in self {
            item.encode(writer)?;
        }
        Ok(())
    }

    fn decode<R: Read + ?Sized>(reader: &mut R) -> Result<Self, CodecError> {
        let count = decode_len::<Self, R>(reader)?;
        let mut set = HashSet::with_capacity_and_hasher(count.min(MAX_PREALLOC), S::default());
        for _ in 0..count {
            if !set.insert(T::decode(reader)?) {
                return Err(CodecError::invalid::<Self>("duplicate element"));
            }
        }
        Ok(set)
    }
}

impl<K: Codec + Ord, V: Codec> Codec for BTreeMap<K, V> {
    fn encode<W: Write + ?Sized>(&self, writer: &mut W) -> Result<(), CodecError> {
        encode_len(self.len(), writer)?;
        for (key, value) in self {
            key.encode(writer)?;
            value.encode(writer)?;
        }
        Ok(())
    }

    fn decode<R: Read + ?Sized>(reader: &mut R) -> Result<Self, CodecError> {
        let count = decode_len::<Self, R>(reader)?;
        let mut map = BTreeMap::new();
        for _ in 0..count {
            let key = K::decode(reader)?;
            let value = V::decode(reader)?;
            if map.insert(key, value).is_some() {
                return Err(CodecError::invalid::<Self>("duplicate key"));
            }
        }
        Ok(map)
    }
}

impl<T: Codec + Ord> Codec for BTreeSet<T> {
    fn encode<W: Write + ?Sized>(&self, writer: &mut W) -> Result<(), CodecError> {
        encode_len(self.len(), writer)?;
        for item in self {
            item.encode(writer)?;
        }
        Ok(())
    }

    fn decode<R: Read + ?Sized>(reader: &mut R) -> Result<Self, CodecError> {
        let count = decode_len::<Self, R>(reader)?;
        let mut set = BTreeSet::new();
        for _ in 0..count {
            if !set.insert(T::decode(reader)?) {
                return Err(CodecError::invalid::<Self>("duplicate element"));
            }
        }
        Ok(set)
    }
}

/// Encode a value into a fresh buffer
pub fn to_bytes<T: Codec>(value: &T) -> Result<Vec<u8>, CodecError> {
    let mut buf = Vec::new();
    value.encode(&mut buf)?;
    Ok(buf)
}

/// Decode a value that must span the whole of `bytes`
pub fn from_bytes<T: Codec>(bytes: &[u8]) -> Result<T, CodecError> {
    let mut cursor = bytes;
    let value = T::decode(&mut cursor)?;
    if !cursor.is_empty() {
        return Err(CodecError::TrailingBytes {
            shape: type_name::<T>(),
            count: cursor.len(),
        });
    }
    Ok(value)
}

/// Encode a value into a file, replacing any previous contents
pub fn save<T: Codec>(path: &Path, value: &T) -> Result<(), CodecError> {
    let mut file = BufWriter::new(File::create(path)?);
    value.encode(&mut file)?;
    file.flush()?;
    Ok(())
}

/// Decode a value that must span the whole file at `path`
pub fn load<T: Codec>(path: &Path) -> Result<T, CodecError> {
    let mut file = BufReader::new(File::open(path)?);
    let value = T::decode(&mut file)?;

    let mut rest = Vec::new();
    file.read_to_end(&mut rest)?;
    if !rest.is_empty() {
        return Err(CodecError::TrailingBytes {
            shape: type_name::<T>(),
            count: rest.len(),
        });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_basic_types_share_one_stream() {
        let mut buf = Vec::new();
        10i32.encode(&mut buf).unwrap();
        10.0f64.encode(&mut buf).unwrap();
        'd'.encode(&mut buf).unwrap();
        10u16.encode(&mut buf).unwrap();
        true.encode(&mut buf).unwrap();
        usize::MAX.encode(&mut buf).unwrap();
        assert_eq!(buf.len(), 4 + 8 + 4 + 2 + 1 + 8);

        let mut cursor = buf.as_slice();
        assert_eq!(i32::decode(&mut cursor).unwrap(), 10);
        assert_eq!(f64::decode(&mut cursor).unwrap(), 10.0);
        assert_eq!(char::decode(&mut cursor).unwrap(), 'd');
        assert_eq!(u16::decode(&mut cursor).unwrap(), 10);
        assert!(bool::decode(&mut cursor).unwrap());
        assert_eq!(usize::decode(&mut cursor).unwrap(), usize::MAX);
        assert!(cursor.is_empty());
    }

    #[test]
    fn test_scalars_are_little_endian() {
        assert_eq!(to_bytes(&0x0102_0304u32).unwrap(), vec![4, 3, 2, 1]);
        assert_eq!(to_bytes(&-2i16).unwrap(), vec![0xfe, 0xff]);
    }

    #[test]
    fn test_string_layout() {
        let bytes = to_bytes(&"hi".to_string()).unwrap();
        assert_eq!(bytes, vec![2, 0, 0, 0, 0, 0, 0, 0, b'h', b'i']);
    }

    #[test]
    fn test_containers_share_one_stream() {
        let s = "hello world!".to_string();
        let vi = vec![10, 20, 30];
        let vs: Vec<String> = vec!["hello".into(), "my".into(), "love".into()];
        let mis: HashMap<i32, String> =
            [(0, "xu".to_string()), (1, "ruochen".to_string()), (2, "cool".to_string())]
                .into_iter()
                .collect();
        let msvs: HashMap<String, Vec<String>> = [
            ("Beijing", ["010", "North China", "beijing@cstdlib.com"]),
            ("Guangzhou", ["020", "South China", "guangzhou@cstdlib.com"]),
            ("Shanghai", ["021", "Southeast China", "shanghai@cstdlib.com"]),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.iter().map(|s| s.to_string()).collect()))
        .collect();

        let mut buf = Vec::new();
        s.encode(&mut buf).unwrap();
        vi.encode(&mut buf).unwrap();
        vs.encode(&mut buf).unwrap();
        mis.encode(&mut buf).unwrap();
        msvs.encode(&mut buf).unwrap();

        let mut cursor = buf.as_slice();
        assert_eq!(String::decode(&mut cursor).unwrap(), s);
        assert_eq!(Vec::<i32>::decode(&mut cursor).unwrap(), vi);
        assert_eq!(Vec::<String>::decode(&mut cursor).unwrap(), vs);
        assert_eq!(HashMap::<i32, String>::decode(&mut cursor).unwrap(), mis);
        assert_eq!(HashMap::<String, Vec<String>>::decode(&mut cursor).unwrap(), msvs);
        assert!(cursor.is_empty());
    }

    #[test]
    fn test_nested_sets_and_trees() {
        let value: BTreeMap<u8, BTreeSet<(u32, String)>> = [
            (1, [(7, "a".to_string()), (9, "b".to_string())].into_iter().collect()),
            (2, BTreeSet::new()),
        ]
        .into_iter()
        .collect();
        let bytes = to_bytes(&value).unwrap();
        assert_eq!(from_bytes::<BTreeMap<u8, BTreeSet<(u32, String)>>>(&bytes).unwrap(), value);

        let set: HashSet<u64> = [3, 1, 4, 159].into_iter().collect();
        let bytes = to_bytes(&set).unwrap();
        assert_eq!(from_bytes::<HashSet<u64>>(&bytes).unwrap(), set);
    }

    #[test]
    fn test_truncated_input() {
        let bytes = to_bytes(&vec![1u32, 2, 3]).unwrap();
        let err = from_bytes::<Vec<u32>>(&bytes[..bytes.len() - 1]).unwrap_err();
        assert!(matches!(err, CodecError::Truncated { shape } if shape == "u32"));

        let bytes = to_bytes(&"hello".to_string()).unwrap();
        let err = from_bytes::<String>(&bytes[..bytes.len() - 2]).unwrap_err();
        assert!(matches!(err, CodecError::Truncated { .. }));
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut bytes = to_bytes(&42u32).unwrap();
        bytes.push(0);
        let err = from_bytes::<u32>(&bytes).unwrap_err();
        assert!(matches!(err, CodecError::TrailingBytes { count: 1, .. }));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            from_bytes::<bool>(&[2]).unwrap_err(),
            CodecError::Invalid { shape: "bool", .. }
        ));
        assert!(matches!(
            from_bytes::<char>(&0xD800u32.to_le_bytes()).unwrap_err(),
            CodecError::Invalid { shape: "char", .. }
        ));

        let mut bytes = Vec::new();
        encode_len(2, &mut bytes).unwrap();
        bytes.extend_from_slice(&[0xff, 0xfe]);
        assert!(matches!(
            from_bytes::<String>(&bytes).unwrap_err(),
            CodecError::Invalid { .. }
        ));
    }

    #[test]
    fn test_duplicate_keys_rejected() {
        let mut bytes = Vec::new();
        encode_len(2, &mut bytes).unwrap();
        (5u32, 1u8).encode(&mut bytes).unwrap();
        (5u32, 2u8).encode(&mut bytes).unwrap();
        assert!(matches!(
            from_bytes::<HashMap<u32, u8>>(&bytes).unwrap_err(),
            CodecError::Invalid { .. }
        ));
    }

    #[test]
    fn test_huge_count_does_not_preallocate() {
        let mut bytes = Vec::new();
        encode_len(usize::MAX >> 8, &mut bytes).unwrap();
        let err = from_bytes::<Vec<u64>>(&bytes).unwrap_err();
        assert!(matches!(err, CodecError::Truncated { .. }));
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dump_stl");
        let value: Vec<(String, i64)> = vec![("a".into(), -1), ("b".into(), i64::MAX)];
        save(&path, &value).unwrap();
        assert_eq!(load::<Vec<(String, i64)>>(&path).unwrap(), value);
        assert!(matches!(load::<u8>(&path).unwrap_err(), CodecError::TrailingBytes { .. }));
    }

    proptest! {
        #[test]
        fn prop_string_map_roundtrip(map in proptest::collection::hash_map(".*", any::<u32>(), 0..32)) {
            let bytes = to_bytes(&map).unwrap();
            prop_assert_eq!(from_bytes::<HashMap<String, u32>>(&bytes).unwrap(), map);
        }

        #[test]
        fn prop_pair_roundtrip(pair in (any::<i64>(), ".*")) {
            let bytes = to_bytes(&pair).unwrap();
            prop_assert_eq!(from_bytes::<(i64, String)>(&bytes).unwrap(), pair);
        }

        #[test]
        fn prop_btree_set_roundtrip(set in proptest::collection::btree_set(any::<u16>(), 0..64)) {
            let bytes = to_bytes(&set).unwrap();
            prop_assert_eq!(bytes.len(), 8 + 2 * set.len());
            prop_assert_eq!(from_bytes::<BTreeSet<u16>>(&bytes).unwrap(), set);
        }

        #[test]
        fn prop_float_bits_preserved(value in any::<f64>()) {
            let back: f64 = from_bytes(&to_bytes(&value).unwrap()).unwrap();
            prop_assert_eq!(back.to_bits(), value.to_bits());
        }
    }
}
