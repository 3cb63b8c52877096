use crate::error::{IndexError, Result};
use crate::utils::encoding::{Codec, CodecError};
use crate::utils::tokenizer::DEFAULT_DELIMITERS;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;

/// Unique identifier for a word within one tokenizer
pub type WordId = u32;

/// Position of a document in the manifest (0-based, accepted lines only)
pub type DocId = u32;

/// Returned by lookups for words that were never tokenized
pub const UNKNOWN_WORD_ID: WordId = 0;

/// One occurrence of a word: the document, the byte offset where the line
/// starts, and the 0-based line number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Posting {
    pub doc_id: DocId,
    pub offset: u64,
    pub lineno: u32,
}

impl Posting {
    pub fn new(doc_id: DocId, offset: u64, lineno: u32) -> Self {
        Self {
            doc_id,
            offset,
            lineno,
        }
    }
}

impl Codec for Posting {
    fn encode<W: Write + ?Sized>(&self, writer: &mut W) -> std::result::Result<(), CodecError> {
        self.doc_id.encode(writer)?;
        self.offset.encode(writer)?;
        self.lineno.encode(writer)
    }

    fn decode<R: Read + ?Sized>(reader: &mut R) -> std::result::Result<Self, CodecError> {
        Ok(Self {
            doc_id: DocId::decode(reader)?,
            offset: u64::decode(reader)?,
            lineno: u32::decode(reader)?,
        })
    }
}

/// Word id -> every distinct place the word occurs
pub type InvertedIndex = FxHashMap<WordId, FxHashSet<Posting>>;

/// Search match result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchMatch {
    pub doc_id: DocId,
    pub doc_name: String,
    pub line_number: u32,
    pub line_content: String,
}

/// Configuration for the index builder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Bytes that separate words inside document lines
    pub delimiters: String,
    /// Sizing hint handed to the tokenizer
    pub avg_word_length: usize,
    /// Index unreadable documents as empty instead of failing the build
    pub skip_missing_documents: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            delimiters: DEFAULT_DELIMITERS.to_string(),
            avg_word_length: 5,
            skip_missing_documents: true,
        }
    }
}

impl IndexConfig {
    /// Load a configuration from a JSON file; missing fields take defaults
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| IndexError::io(path, e))?;
        serde_json::from_reader(BufReader::new(file)).map_err(|source| IndexError::Config {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Summary counts for a built index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexStats {
    pub documents: usize,
    pub words: usize,
    pub indexed_words: usize,
    pub postings: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::encoding::{from_bytes, to_bytes};
    use proptest::prelude::*;

    #[test]
    fn test_posting_layout() {
        let posting = Posting::new(1, 11, 2);
        let bytes = to_bytes(&posting).unwrap();
        assert_eq!(bytes.len(), 4 + 8 + 4);
        assert_eq!(from_bytes::<Posting>(&bytes).unwrap(), posting);
    }

    #[test]
    fn test_postings_are_unique_by_all_fields() {
        let mut set = FxHashSet::default();
        assert!(set.insert(Posting::new(0, 11, 1)));
        assert!(!set.insert(Posting::new(0, 11, 1)));
        assert!(set.insert(Posting::new(0, 11, 2)));
        assert!(set.insert(Posting::new(1, 11, 1)));
    }

    #[test]
    fn test_config_partial_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "delimiters": " ,." }"#).unwrap();

        let config = IndexConfig::load(&path).unwrap();
        assert_eq!(config.delimiters, " ,.");
        assert_eq!(config.avg_word_length, 5);
        assert!(config.skip_missing_documents);
    }

    #[test]
    fn test_config_errors_name_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "not json").unwrap();
        let err = IndexConfig::load(&path).unwrap_err();
        assert!(matches!(err, IndexError::Config { .. }));
        assert!(err.to_string().contains("config.json"));

        let missing = dir.path().join("absent.json");
        assert!(matches!(
            IndexConfig::load(&missing).unwrap_err(),
            IndexError::Io { .. }
        ));
    }

    proptest! {
        #[test]
        fn prop_posting_roundtrip(doc_id in any::<u32>(), offset in any::<u64>(), lineno in any::<u32>()) {
            let posting = Posting::new(doc_id, offset, lineno);
            prop_assert_eq!(from_bytes::<Posting>(&to_bytes(&posting).unwrap()).unwrap(), posting);
        }
    }
}
