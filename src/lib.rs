//! # Darwin - exact-word line search
//!
//! Darwin indexes a small corpus of line-oriented text documents and answers
//! single-word lookups with the document, line number and line text of every
//! occurrence.
//!
//! ## Architecture
//!
//! - [`index`] - Manifest scanning, the inverted index, and search
//! - [`utils`] - Tokenizer, binary snapshot encoding, progress bars
//! - [`output`] - Result formatting
//! - [`error`] - Error types
//!
//! ## Quick Start
//!
//! ```no_run
//! use darwin::index::IndexBuilder;
//! use darwin::utils::Tokenizer;
//!
//! let mut builder = IndexBuilder::new(Tokenizer::default());
//! builder.build("data/documents")?;
//!
//! for m in builder.search("harry")? {
//!     println!("{}(line {}): {}", m.doc_name, m.line_number, m.line_content);
//! }
//!
//! // Persist the whole state and restore it later
//! builder.save("index.bin")?;
//! # Ok::<(), darwin::error::IndexError>(())
//! ```
//!
//! ## Manifest format
//!
//! One document per line, `<id> <file name>`, with names relative to the
//! manifest's directory. Lines with any other number of fields are ignored.

pub mod error;
pub mod index;
pub mod output;
pub mod utils;

pub use error::{IndexError, Result};
pub use index::{IndexBuilder, SearchMatch};
pub use utils::Tokenizer;
