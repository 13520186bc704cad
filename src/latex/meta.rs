//! LaTeX header metadata and excerpt extraction.
//!
//! `\title{}`, `\author{}` and `\date{}` are matched independently: a missing
//! or malformed command only defaults its own field.

use crate::post::{EXCERPT_PLACEHOLDER, MAX_EXCERPT_LEN, MIN_EXCERPT_LEN, truncate_chars};
use crate::utils::date;
use regex::Regex;
use std::sync::LazyLock;

pub const DEFAULT_TITLE: &str = "Untitled";
pub const DEFAULT_AUTHOR: &str = "Unknown";

static RE_TITLE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\\title\{([^}]+)\}").unwrap());
static RE_AUTHOR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\\author\{([^}]+)\}").unwrap());
static RE_DATE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\\date\{([^}]+)\}").unwrap());

static RE_ABSTRACT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\\begin\{abstract\}(.*?)\\end\{abstract\}").unwrap()
});
static RE_FIRST_SECTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\\maketitle.*?\\section").unwrap());

static RE_BEGIN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\\begin\{[^}]+\}").unwrap());
static RE_END: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\\end\{[^}]+\}").unwrap());
static RE_COMMAND: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\[a-zA-Z]+(\[[^\]]*\])?(\{[^}]*\})?").unwrap());
static RE_BRACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[{}]").unwrap());
static RE_WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Declared header fields of a LaTeX document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatexMeta {
    pub title: String,
    pub author: String,
    pub date: String,
}

/// Extract header fields, defaulting a missing date to today.
pub fn extract_meta(text: &str) -> LatexMeta {
    extract_meta_with_date(text, date::today)
}

/// Extract header fields; `fallback_date` is only called when `\date{}` is absent.
pub fn extract_meta_with_date(text: &str, fallback_date: impl FnOnce() -> String) -> LatexMeta {
    let capture = |re: &Regex| re.captures(text).map(|c| c[1].to_owned());

    LatexMeta {
        title: capture(&RE_TITLE).unwrap_or_else(|| DEFAULT_TITLE.to_owned()),
        author: capture(&RE_AUTHOR).unwrap_or_else(|| DEFAULT_AUTHOR.to_owned()),
        date: capture(&RE_DATE).unwrap_or_else(fallback_date),
    }
}

/// Derive a plain-text preview of the document.
///
/// Sources, each tried only when the previous one is empty:
/// 1. the `abstract` environment
/// 2. the text between `\maketitle` and the first `\section`
///
/// The result is stripped of markup and cut to 200 characters; anything
/// shorter than 20 characters becomes a generic placeholder.
pub fn excerpt(text: &str) -> String {
    let raw = RE_ABSTRACT
        .captures(text)
        .map(|c| c[1].trim().to_owned())
        .unwrap_or_default();

    let raw = if raw.is_empty() {
        RE_FIRST_SECTION
            .find(text)
            .map(|m| {
                m.as_str()
                    .replacen("\\maketitle", "", 1)
                    .replacen("\\section", "", 1)
                    .trim()
                    .to_owned()
            })
            .unwrap_or_default()
    } else {
        raw
    };

    let cleaned = strip_markup(&raw);
    let excerpt = truncate_chars(&cleaned, MAX_EXCERPT_LEN);

    if excerpt.chars().count() < MIN_EXCERPT_LEN {
        EXCERPT_PLACEHOLDER.to_owned()
    } else {
        excerpt.to_owned()
    }
}

/// Remove environments, commands (with their first optional and mandatory
/// argument), stray braces, and collapse whitespace.
fn strip_markup(s: &str) -> String {
    let s = RE_BEGIN.replace_all(s, "");
    let s = RE_END.replace_all(&s, "");
    let s = RE_COMMAND.replace_all(&s, " ");
    let s = RE_BRACES.replace_all(&s, "");
    let s = RE_WHITESPACE.replace_all(&s, " ");
    s.trim().to_owned()
}
