//! Markdown post loader.
//!
//! A Markdown post is a directory holding `blog.md` with a fixed header:
//!
//! ```text
//! # Title               <- line 0
//! Date: Jan 26, 2026    <- line 1
//! By Tomaso Poggio      <- line 2
//!                       <- blank separator
//! Body starts here...
//! ```
//!
//! Header lines are read by position, never searched for. No external tool
//! is involved.

use super::{Category, EXCERPT_PLACEHOLDER, MAX_EXCERPT_LEN, MIN_EXCERPT_LEN, PostKind, PostRecord, truncate_chars};
use crate::utils::date;
use anyhow::{Context, Result};
use regex::Regex;
use std::{fs, path::Path, sync::LazyLock};

/// Title used when line 0 is missing or empty.
pub const DEFAULT_TITLE: &str = "Untitled";

/// Author used when line 2 is not a `By ...` line.
pub const DEFAULT_AUTHOR: &str = "Unknown Author";

/// Number of positional header lines.
const HEADER_LINES: usize = 3;

static RE_TITLE_MARKER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^#\s*").unwrap());
static RE_DATE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^Date:\s*(.+)$").unwrap());
static RE_AUTHOR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^By\s+(.+)$").unwrap());

/// Load the Markdown post in `dir`.
///
/// Returns `Ok(None)` when the directory has no `entry` file.
pub fn load_post(dir: &Path, slug: &str, entry: &str) -> Result<Option<PostRecord>> {
    let path = dir.join(entry);
    if !path.is_file() {
        return Ok(None);
    }
    let text = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(Some(parse_post(slug, &text)))
}

/// Parse a post body, defaulting a missing date to today.
pub fn parse_post(slug: &str, text: &str) -> PostRecord {
    parse_post_with_date(slug, text, date::today)
}

/// Parse a post body; `fallback_date` is only called when line 1 has no date.
pub fn parse_post_with_date(
    slug: &str,
    text: &str,
    fallback_date: impl FnOnce() -> String,
) -> PostRecord {
    // Split on '\n' only: header lines are trimmed, the body is kept byte for byte
    let lines: Vec<&str> = text.split('\n').collect();
    let line = |n: usize| lines.get(n).map_or("", |l| l.trim());

    let title = RE_TITLE_MARKER.replace(line(0), "").trim().to_owned();
    let title = if title.is_empty() { DEFAULT_TITLE.to_owned() } else { title };

    let date = RE_DATE
        .captures(line(1))
        .map(|c| c[1].trim().to_owned())
        .unwrap_or_else(fallback_date);

    let author = RE_AUTHOR
        .captures(line(2))
        .map_or_else(|| DEFAULT_AUTHOR.to_owned(), |c| c[1].trim().to_owned());

    // Body begins at the first non-blank line after the header
    let start = lines
        .iter()
        .enumerate()
        .skip(HEADER_LINES)
        .find(|(_, l)| !l.trim().is_empty())
        .map_or(lines.len(), |(i, _)| i);
    let content = lines[start..].join("\n");

    PostRecord {
        slug: slug.to_owned(),
        title,
        author,
        date,
        excerpt: excerpt(&content),
        content,
        category: Category::Blog,
        kind: Some(PostKind::Markdown),
    }
}

/// First 200 characters of the body with `#` and `*` removed.
///
/// Only heading and emphasis markers are stripped; links and other syntax
/// pass through as written.
pub fn excerpt(content: &str) -> String {
    let excerpt: String = truncate_chars(content, MAX_EXCERPT_LEN)
        .chars()
        .filter(|c| !matches!(c, '#' | '*'))
        .collect();
    let excerpt = excerpt.trim();

    if excerpt.chars().count() < MIN_EXCERPT_LEN {
        EXCERPT_PLACEHOLDER.to_owned()
    } else {
        excerpt.to_owned()
    }
}
