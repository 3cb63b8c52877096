//! Per-document progress while an index is built.
//!
//! With the `progress` feature a bar is drawn on stderr. Without it every
//! call is empty.

#[cfg(feature = "progress")]
use indicatif::{ProgressBar, ProgressStyle};

#[cfg(feature = "progress")]
const TEMPLATE: &str = "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}";

/// Ticks once per manifest document during
/// [`IndexBuilder::build_with_progress`](crate::index::IndexBuilder::build_with_progress)
pub struct BuildProgress {
    #[cfg(feature = "progress")]
    bar: ProgressBar,
}

impl BuildProgress {
    /// Draw a bar on stderr
    pub fn visible() -> Self {
        Self {
            #[cfg(feature = "progress")]
            bar: ProgressBar::new(0),
        }
    }

    /// Track nothing on screen
    pub fn hidden() -> Self {
        Self {
            #[cfg(feature = "progress")]
            bar: ProgressBar::hidden(),
        }
    }

    pub(crate) fn start(&self, documents: usize) {
        #[cfg(feature = "progress")]
        {
            self.bar.set_length(documents as u64);
            self.bar.set_style(
                ProgressStyle::default_bar()
                    .template(TEMPLATE)
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("=>-"),
            );
        }
        #[cfg(not(feature = "progress"))]
        let _ = documents;
    }

    /// Show `name` as the document being indexed
    pub(crate) fn document(&self, name: &str) {
        #[cfg(feature = "progress")]
        self.bar.set_message(name.to_string());
        #[cfg(not(feature = "progress"))]
        let _ = name;
    }

    pub(crate) fn advance(&self) {
        #[cfg(feature = "progress")]
        self.bar.inc(1);
    }

    pub(crate) fn finish(&self) {
        #[cfg(feature = "progress")]
        self.bar.finish_and_clear();
    }
}
