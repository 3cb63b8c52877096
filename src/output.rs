//! Output formatting for search results and index stats

use crate::index::types::{IndexStats, SearchMatch};
use std::io::{self, Write};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Print matches to stdout as `name(line N): content`
pub fn print_matches(matches: &[SearchMatch], color: bool) -> io::Result<()> {
    let choice = if color {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    };
    let mut stdout = StandardStream::stdout(choice);
    write_matches(&mut stdout, matches)
}

/// Write matches in `name(line N): content` form
pub fn write_matches<W: WriteColor>(out: &mut W, matches: &[SearchMatch]) -> io::Result<()> {
    for m in matches {
        out.set_color(ColorSpec::new().set_fg(Some(Color::Magenta)).set_bold(true))?;
        write!(out, "{}", m.doc_name)?;
        out.reset()?;
        write!(out, "(line ")?;

        out.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
        write!(out, "{}", m.line_number)?;
        out.reset()?;

        writeln!(out, "): {}", m.line_content)?;
    }

    Ok(())
}

/// Print matches to stdout as a JSON array
pub fn print_matches_json(matches: &[SearchMatch]) -> io::Result<()> {
    let stdout = io::stdout();
    let mut lock = stdout.lock();
    serde_json::to_writer_pretty(&mut lock, matches)?;
    writeln!(lock)
}

/// Print index statistics
pub fn print_stats(stats: &IndexStats, color: bool) -> io::Result<()> {
    let choice = if color {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    };
    let mut stdout = StandardStream::stdout(choice);
    write_stats(&mut stdout, stats)
}

pub fn write_stats<W: WriteColor>(out: &mut W, stats: &IndexStats) -> io::Result<()> {
    let rows = [
        ("documents", stats.documents),
        ("words", stats.words),
        ("indexed words", stats.indexed_words),
        ("postings", stats.postings),
    ];

    for (label, value) in rows {
        write!(out, "{label:>14}: ")?;
        out.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)))?;
        writeln!(out, "{value}")?;
        out.reset()?;
    }

    Ok(())
}
