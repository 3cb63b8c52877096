//! Manifest-driven index construction and line lookups.
//!
//! A manifest lists one document per line as `<id> <file name>`. File names
//! resolve against the manifest's own directory. Every document is scanned
//! once; each posting remembers where its line starts so [`IndexBuilder::search`]
//! can re-read just that line later.

use crate::error::{IndexError, Result};
use crate::index::types::*;
use crate::utils::encoding::{self, Codec, CodecError};
use crate::utils::progress::BuildProgress;
use crate::utils::tokenizer::{MANIFEST_DELIMITERS, Tokenizer};
use rustc_hash::{FxHashMap, FxHashSet};
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{MAIN_SEPARATOR, Path};
use tracing::{debug, info, warn};

/// Directory of the manifest, with a trailing separator.
///
/// `"a/b/documents"` gives `"a/b/"`; a bare file name gives `"./"`.
pub fn base_directory(manifest: &str) -> String {
    match manifest.rfind(|c: char| c == '/' || c == MAIN_SEPARATOR) {
        Some(pos) => manifest[..=pos].to_string(),
        None => "./".to_string(),
    }
}

/// Inverted index over the documents named by a manifest
#[derive(Debug, Clone)]
pub struct IndexBuilder {
    tokenizer: Tokenizer,
    data_directory: String,
    documents: Vec<String>,
    index: InvertedIndex,
    config: IndexConfig,
}

impl PartialEq for IndexBuilder {
    fn eq(&self, other: &Self) -> bool {
        self.tokenizer == other.tokenizer
            && self.data_directory == other.data_directory
            && self.documents == other.documents
            && self.index == other.index
    }
}

impl IndexBuilder {
    pub fn new(tokenizer: Tokenizer) -> Self {
        Self::with_config(tokenizer, IndexConfig::default())
    }

    pub fn with_config(tokenizer: Tokenizer, config: IndexConfig) -> Self {
        Self {
            tokenizer,
            data_directory: String::new(),
            documents: Vec::new(),
            index: InvertedIndex::default(),
            config,
        }
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    pub fn data_directory(&self) -> &str {
        &self.data_directory
    }

    /// Document names in manifest order; the position is the [`DocId`]
    pub fn documents(&self) -> &[String] {
        &self.documents
    }

    pub fn index(&self) -> &InvertedIndex {
        &self.index
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Id of `word`, or [`UNKNOWN_WORD_ID`]. Never assigns.
    pub fn word_id(&self, word: impl AsRef<[u8]>) -> WordId {
        self.tokenizer.word_id(word)
    }

    /// Postings recorded for `word`, if any
    pub fn postings(&self, word: impl AsRef<[u8]>) -> Option<&FxHashSet<Posting>> {
        match self.word_id(word) {
            UNKNOWN_WORD_ID => None,
            id => self.index.get(&id),
        }
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            documents: self.documents.len(),
            words: self.tokenizer.len(),
            indexed_words: self.index.len(),
            postings: self.index.values().map(|p| p.len()).sum(),
        }
    }

    /// Build the index from the manifest at `manifest`, replacing any
    /// previous state. Nothing changes if the build fails.
    pub fn build(&mut self, manifest: impl AsRef<Path>) -> Result<()> {
        self.build_with_progress(manifest, &BuildProgress::hidden())
    }

    /// [`IndexBuilder::build`], ticking `progress` once per document
    pub fn build_with_progress(
        &mut self,
        manifest: impl AsRef<Path>,
        progress: &BuildProgress,
    ) -> Result<()> {
        let manifest = manifest.as_ref();
        let data_directory = base_directory(&manifest.to_string_lossy());
        info!(manifest = %manifest.display(), %data_directory, "building index");

        let documents = self.read_manifest(manifest)?;

        progress.start(documents.len());

        let mut tokenizer = self.tokenizer.clone();
        let mut index = InvertedIndex::default();
        for (doc_id, name) in documents.iter().enumerate() {
            let doc_id =
                DocId::try_from(doc_id).map_err(|_| IndexError::Exhausted("document ids"))?;
            progress.document(name);
            let path = format!("{data_directory}{name}");
            self.index_document(doc_id, &path, &mut tokenizer, &mut index)?;
            progress.advance();
        }
        progress.finish();

        self.tokenizer = tokenizer;
        self.data_directory = data_directory;
        self.documents = documents;
        self.index = index;

        let stats = self.stats();
        info!(
            documents = stats.documents,
            words = stats.words,
            postings = stats.postings,
            "index built"
        );
        Ok(())
    }

    /// Document names from every manifest line with exactly two fields
    fn read_manifest(&self, manifest: &Path) -> Result<Vec<String>> {
        let file = File::open(manifest).map_err(|e| IndexError::io(manifest, e))?;
        let mut reader = BufReader::new(file);
        let mut documents = Vec::new();

        let mut buf = Vec::new();
        let mut lineno = 0usize;
        while read_line(&mut reader, &mut buf).map_err(|e| IndexError::io(manifest, e))? > 0 {
            let fields = self.tokenizer.split(trim_newline(&buf), MANIFEST_DELIMITERS);
            if let &[_, name] = fields.as_slice() {
                documents.push(String::from_utf8_lossy(name).into_owned());
            } else {
                debug!(lineno, fields = fields.len(), "skipping manifest line");
            }
            lineno += 1;
        }

        Ok(documents)
    }

    /// Stream one document, adding a posting per word per line
    fn index_document(
        &self,
        doc_id: DocId,
        path: &str,
        tokenizer: &mut Tokenizer,
        index: &mut InvertedIndex,
    ) -> Result<()> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if self.config.skip_missing_documents => {
                warn!(path, error = %e, "document unreadable, indexing it as empty");
                return Ok(());
            }
            Err(e) => return Err(IndexError::io(path, e)),
        };

        let mut reader = BufReader::new(file);
        let mut buf = Vec::new();
        let mut offset = 0u64;
        let mut lineno = 0u32;

        loop {
            let read = read_line(&mut reader, &mut buf).map_err(|e| IndexError::io(path, e))?;
            if read == 0 {
                break;
            }

            let line = trim_newline(&buf);
            for word_id in tokenizer.tokenize(line, self.config.delimiters.as_bytes())? {
                index
                    .entry(word_id)
                    .or_default()
                    .insert(Posting::new(doc_id, offset, lineno));
            }

            offset += read as u64;
            lineno = lineno
                .checked_add(1)
                .ok_or(IndexError::Exhausted("line numbers"))?;
        }

        debug!(doc_id, path, lines = lineno, bytes = offset, "indexed document");
        Ok(())
    }

    /// Every line containing `word` exactly, ordered by document then line.
    ///
    /// Unknown words give an empty result. Line content is decoded as UTF-8
    /// for display, with invalid bytes replaced; see [`IndexBuilder::line_bytes`]
    /// for the exact bytes.
    pub fn search(&self, word: impl AsRef<[u8]>) -> Result<Vec<SearchMatch>> {
        let Some(postings) = self.postings(word) else {
            return Ok(Vec::new());
        };

        let mut sorted: Vec<&Posting> = postings.iter().collect();
        sorted.sort_unstable();

        sorted
            .into_iter()
            .map(|posting| -> Result<SearchMatch> {
                Ok(SearchMatch {
                    doc_id: posting.doc_id,
                    doc_name: self.document_name(posting.doc_id)?.to_string(),
                    line_number: posting.lineno,
                    line_content: String::from_utf8_lossy(
                        &self.line_bytes(posting.doc_id, posting.offset)?,
                    )
                    .into_owned(),
                })
            })
            .collect()
    }

    fn document_name(&self, doc_id: DocId) -> Result<&str> {
        self.documents
            .get(doc_id as usize)
            .map(String::as_str)
            .ok_or(IndexError::UnknownDocument(doc_id))
    }

    /// Re-open a document and read the single line starting at `offset`,
    /// without its line terminator
    pub fn line_bytes(&self, doc_id: DocId, offset: u64) -> Result<Vec<u8>> {
        let path = format!("{}{}", self.data_directory, self.document_name(doc_id)?);
        let mut file = File::open(&path).map_err(|e| IndexError::io(&path, e))?;
        file.seek(SeekFrom::Start(offset))
            .map_err(|e| IndexError::io(&path, e))?;

        let mut reader = BufReader::new(file);
        let mut buf = Vec::new();
        read_line(&mut reader, &mut buf).map_err(|e| IndexError::io(&path, e))?;
        let len = trim_newline(&buf).len();
        buf.truncate(len);
        Ok(buf)
    }

    /// Write the full state to `path`
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        encoding::save(path, self).map_err(|source| snapshot_error(path, source))?;
        info!(path = %path.display(), "snapshot saved");
        Ok(())
    }

    /// Restore a builder written by [`IndexBuilder::save`]
    pub fn load(path: impl AsRef<Path>, config: IndexConfig) -> Result<Self> {
        let path = path.as_ref();
        let mut builder: Self =
            encoding::load(path).map_err(|source| snapshot_error(path, source))?;
        builder.config = config;
        Ok(builder)
    }
}

/// File system failures stay I/O errors; only bad bytes are snapshot errors
fn snapshot_error(path: &Path, source: CodecError) -> IndexError {
    match source {
        CodecError::Io(e) => IndexError::io(path, e),
        source => IndexError::Snapshot {
            path: path.to_path_buf(),
            source,
        },
    }
}

/// Read up to and including the next newline into `buf`, returning the
/// number of bytes consumed (0 at end of input)
fn read_line<R: BufRead>(reader: &mut R, buf: &mut Vec<u8>) -> std::io::Result<usize> {
    buf.clear();
    reader.read_until(b'\n', buf)
}

fn trim_newline(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

impl Codec for IndexBuilder {
    fn encode<W: Write + ?Sized>(&self, writer: &mut W) -> std::result::Result<(), CodecError> {
        self.tokenizer.encode(writer)?;
        self.data_directory.encode(writer)?;
        self.documents.encode(writer)?;
        self.index.encode(writer)
    }

    fn decode<R: Read + ?Sized>(reader: &mut R) -> std::result::Result<Self, CodecError> {
        let tokenizer = Tokenizer::decode(reader)?;
        let data_directory = String::decode(reader)?;
        let documents = Vec::<String>::decode(reader)?;
        let index = FxHashMap::<WordId, FxHashSet<Posting>>::decode(reader)?;

        if let Some(posting) = index
            .values()
            .flatten()
            .find(|p| p.doc_id as usize >= documents.len())
        {
            return Err(CodecError::invalid::<Self>(format!(
                "posting refers to document {} of {}",
                posting.doc_id,
                documents.len()
            )));
        }

        Ok(Self {
            tokenizer,
            data_directory,
            documents,
            index,
            config: IndexConfig::default(),
        })
    }
}
