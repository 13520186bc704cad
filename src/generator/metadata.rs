//! Post metadata export.
//!
//! Two files are written after every build:
//!
//! - a TypeScript module exporting the LaTeX post records, imported by the
//!   site at render time:
//!
//! ```ts
//! // Auto-generated by labsite - DO NOT EDIT MANUALLY
//! import type { BlogPost } from "@/app/data/blogs";
//!
//! export const latexBlogs: BlogPost[] = [
//!   {
//!     "slug": "real-numbers",
//!     ...
//!   }
//! ];
//! ```
//!
//! - a JSON index of every record, Markdown posts included, each tagged with
//!   the format it came from. `write_index = false` turns it off.

use crate::{
    config::MetadataConfig,
    log,
    post::{PostKind, PostRecord},
    utils::fs::write_file,
};
use anyhow::Result;
use serde::Serialize;
use std::{fmt::Write as _, path::Path};

const GENERATED_HEADER: &str = "// Auto-generated by labsite - DO NOT EDIT MANUALLY";

/// Write every export configured in `config`.
pub fn write_all(posts: &[PostRecord], config: &MetadataConfig) -> Result<()> {
    write_latex_module(posts, config)?;
    if config.write_index {
        write_index(posts, &config.index)?;
    }
    Ok(())
}

/// Write the TypeScript module holding the LaTeX records of `posts`.
///
/// The module is written even when there are no LaTeX posts, so the import
/// in the site never dangles.
pub fn write_latex_module(posts: &[PostRecord], config: &MetadataConfig) -> Result<()> {
    let latex: Vec<&PostRecord> = posts
        .iter()
        .filter(|p| p.kind == Some(PostKind::Latex))
        .collect();

    let content = render_latex_module(&latex, config)?;
    write_file(&config.path, content)?;
    log!("metadata"; "wrote {} LaTeX posts to {}", latex.len(), config.path.display());
    Ok(())
}

fn render_latex_module(posts: &[&PostRecord], config: &MetadataConfig) -> Result<String> {
    let json = serde_json::to_string_pretty(posts)?;

    let mut out = String::with_capacity(json.len() + 128);
    writeln!(out, "{GENERATED_HEADER}")?;
    writeln!(out, "import type {{ BlogPost }} from \"{}\";", config.type_import)?;
    writeln!(out)?;
    writeln!(out, "export const {}: BlogPost[] = {json};", config.export_name)?;
    Ok(out)
}

/// One entry of the JSON index.
#[derive(Serialize)]
struct IndexEntry<'a> {
    #[serde(flatten)]
    record: &'a PostRecord,
    format: &'static str,
}

/// Write a JSON array of every record to `path`.
pub fn write_index(posts: &[PostRecord], path: &Path) -> Result<()> {
    let content = render_index(posts)?;
    write_file(path, content)?;
    log!("metadata"; "wrote index of {} posts to {}", posts.len(), path.display());
    Ok(())
}

fn render_index(posts: &[PostRecord]) -> Result<String> {
    let entries: Vec<IndexEntry<'_>> = posts
        .iter()
        .map(|record| IndexEntry {
            record,
            format: record.kind.map_or("unknown", PostKind::name),
        })
        .collect();
    Ok(serde_json::to_string_pretty(&entries)?)
}
