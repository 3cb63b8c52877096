use crate::error::{IndexError, Result};
use crate::index::types::{UNKNOWN_WORD_ID, WordId};
use crate::utils::encoding::{Codec, CodecError};
use memchr::{memchr, memchr2, memchr3};
use rustc_hash::FxHashMap;
use std::io::{Read, Write};

/// Delimiters used when none are configured
pub const DEFAULT_DELIMITERS: &str = " ";

/// Delimiters separating the two manifest fields
pub const MANIFEST_DELIMITERS: &[u8] = b" \t";

/// Splits lines into words and assigns each distinct word a stable id.
///
/// Words are raw byte strings; no text encoding is assumed. Ids are handed
/// out in first-seen order starting at 1; [`UNKNOWN_WORD_ID`] is never
/// assigned. Only [`Tokenizer::tokenize`] mutates the word map.
#[derive(Debug, Clone, PartialEq)]
pub struct Tokenizer {
    /// Sizing hint for split output, no effect on results
    avg_word_length: usize,
    word_map: FxHashMap<Vec<u8>, WordId>,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new(5)
    }
}

impl Tokenizer {
    pub fn new(avg_word_length: usize) -> Self {
        Self {
            avg_word_length: avg_word_length.max(1),
            word_map: FxHashMap::default(),
        }
    }

    pub fn avg_word_length(&self) -> usize {
        self.avg_word_length
    }

    /// Number of distinct words seen so far
    pub fn len(&self) -> usize {
        self.word_map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.word_map.is_empty()
    }

    /// Split `text` on any byte of `delimiters`.
    ///
    /// Runs of delimiters collapse, so no empty words are produced.
    pub fn split<'a>(&self, text: &'a [u8], delimiters: &[u8]) -> Vec<&'a [u8]> {
        let mut words = Vec::with_capacity(text.len() / self.avg_word_length);

        if delimiters.is_empty() {
            if !text.is_empty() {
                words.push(text);
            }
            return words;
        }

        let finder = DelimiterFinder::new(delimiters);
        let mut start = 0;
        while start < text.len() {
            let end = finder
                .find(&text[start..])
                .map(|pos| start + pos)
                .unwrap_or(text.len());
            if end > start {
                words.push(&text[start..end]);
            }
            start = end + 1;
        }

        words
    }

    /// Split `text` and map every word to its id, assigning new ids on first sight
    pub fn tokenize(&mut self, text: &[u8], delimiters: &[u8]) -> Result<Vec<WordId>> {
        self.split(text, delimiters)
            .into_iter()
            .map(|word| self.assign(word))
            .collect()
    }

    /// Look up the id of `word` without assigning one.
    ///
    /// Returns [`UNKNOWN_WORD_ID`] for words never tokenized.
    pub fn word_id(&self, word: impl AsRef<[u8]>) -> WordId {
        self.word_map
            .get(word.as_ref())
            .copied()
            .unwrap_or(UNKNOWN_WORD_ID)
    }

    fn assign(&mut self, word: &[u8]) -> Result<WordId> {
        if let Some(&id) = self.word_map.get(word) {
            return Ok(id);
        }
        let id = next_word_id(self.word_map.len())?;
        self.word_map.insert(word.to_vec(), id);
        Ok(id)
    }
}

/// Id for the word after `assigned` words, if the id space has room
fn next_word_id(assigned: usize) -> Result<WordId> {
    WordId::try_from(assigned)
        .ok()
        .and_then(|n| n.checked_add(1))
        .ok_or(IndexError::Exhausted("word ids"))
}

/// Byte search specialised on the number of delimiters
enum DelimiterFinder {
    One(u8),
    Two(u8, u8),
    Three(u8, u8, u8),
    Table(Box<[bool; 256]>),
}

impl DelimiterFinder {
    fn new(delims: &[u8]) -> Self {
        match delims {
            &[a] => DelimiterFinder::One(a),
            &[a, b] => DelimiterFinder::Two(a, b),
            &[a, b, c] => DelimiterFinder::Three(a, b, c),
            _ => {
                let mut table = Box::new([false; 256]);
                for &d in delims {
                    table[d as usize] = true;
                }
                DelimiterFinder::Table(table)
            }
        }
    }

    #[inline]
    fn find(&self, haystack: &[u8]) -> Option<usize> {
        match self {
            DelimiterFinder::One(a) => memchr(*a, haystack),
            DelimiterFinder::Two(a, b) => memchr2(*a, *b, haystack),
            DelimiterFinder::Three(a, b, c) => memchr3(*a, *b, *c, haystack),
            DelimiterFinder::Table(table) => haystack.iter().position(|&b| table[b as usize]),
        }
    }
}


impl Codec for Tokenizer {
    fn encode<W: Write + ?Sized>(&self, writer: &mut W) -> std::result::Result<(), CodecError> {
        self.avg_word_length.encode(writer)?;
        self.word_map.encode(writer)
    }

    fn decode<R: Read + ?Sized>(reader: &mut R) -> std::result::Result<Self, CodecError> {
        let avg_word_length = usize::decode(reader)?;
        let word_map = FxHashMap::<Vec<u8>, WordId>::decode(reader)?;

        // Ids must be exactly 1..=len so the next assignment cannot collide
        let mut seen = vec![false; word_map.len()];
        for &id in word_map.values() {
            // id 0 wraps to usize::MAX and falls outside
            match seen.get_mut((id as usize).wrapping_sub(1)) {
                Some(slot) if !*slot => *slot = true,
                Some(_) => {
                    return Err(CodecError::invalid::<Self>(format!(
                        "word id {id} assigned twice"
                    )));
                }
                None => {
                    return Err(CodecError::invalid::<Self>(format!(
                        "word id {id} outside 1..={}",
                        word_map.len()
                    )));
                }
            }
        }

        Ok(Self {
            avg_word_length: avg_word_length.max(1),
            word_map,
        })
    }
}
