//! Normalized post records.
//!
//! `PostRecord` is the single shape every loader produces, whatever the
//! authoring format. The page-rendering layer consumes these records and
//! owns sorting, filtering and presentation.
//!
//! # Architecture
//!
//! ```text
//! content/blogs/<slug>/
//!     ├── blog.md   ──► post::markdown::load_post() ──┐
//!     │                                               ├──► PostRecord
//!     └── main.tex  ──► latex::build_post()  ─────────┘
//! ```

pub mod markdown;

use crate::utils::date::parse_display_date;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Shortest derived excerpt worth showing; anything shorter is replaced.
pub const MIN_EXCERPT_LEN: usize = 20;

/// Longest excerpt, in characters.
pub const MAX_EXCERPT_LEN: usize = 200;

/// Excerpt used when the derived text is too short to be meaningful.
pub const EXCERPT_PLACEHOLDER: &str = "Click to read more...";

/// Display grouping of a post.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    #[default]
    Blog,
    #[serde(rename = "Interesting Bit")]
    InterestingBit,
    Research,
    Publication,
    News,
    Press,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Blog => "Blog",
            Self::InterestingBit => "Interesting Bit",
            Self::Research => "Research",
            Self::Publication => "Publication",
            Self::News => "News",
            Self::Press => "Press",
        };
        f.write_str(name)
    }
}

/// Authoring format a record was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostKind {
    Markdown,
    Latex,
}

impl PostKind {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Markdown => "markdown",
            Self::Latex => "latex",
        }
    }
}

/// One blog entry, normalized.
///
/// Serializes to the `BlogPost` interface of the page-rendering layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRecord {
    /// Source directory name; stable across rebuilds
    pub slug: String,
    pub title: String,
    pub author: String,
    /// Free-form display date, e.g.: "Jan 26, 2026"
    pub date: String,
    pub excerpt: String,
    /// Markdown body, or empty for LaTeX posts (their HTML is a side file)
    pub content: String,
    pub category: Category,
    /// Format the record came from; not part of the exported shape
    #[serde(skip)]
    pub kind: Option<PostKind>,
}

impl PostRecord {
    /// Best-effort calendar date, `None` when the display string is not a
    /// recognized date format.
    pub fn parsed_date(&self) -> Option<NaiveDate> {
        parse_display_date(&self.date)
    }
}

/// Sort records newest first. Records whose date does not parse keep their
/// relative order and go last.
pub fn sort_newest_first(posts: &mut [PostRecord]) {
    posts.sort_by(|a, b| match (a.parsed_date(), b.parsed_date()) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
}

/// Cut a string to at most `max` characters.
pub(crate) fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
