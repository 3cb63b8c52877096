//! Utility functions and data structures.
//!
//! - [`encoding`] - Binary encoding for snapshots (the [`Codec`] trait)
//! - [`tokenizer`] - Word splitting and word id assignment
//! - [`progress`] - Build progress, silent without the `progress` feature
//!
//! ```
//! use darwin::utils::Tokenizer;
//!
//! let mut tokenizer = Tokenizer::default();
//! assert_eq!(tokenizer.tokenize(b"harry potter harry", b" ")?, vec![1, 2, 1]);
//! assert_eq!(tokenizer.word_id("potter"), 2);
//! assert_eq!(tokenizer.word_id("ron"), 0);
//! # Ok::<(), darwin::IndexError>(())
//! ```

pub mod encoding;
pub mod progress;
pub mod tokenizer;

pub use encoding::*;
pub use tokenizer::*;
