//! Content ingestion orchestration.
//!
//! # Architecture
//!
//! ```text
//! build_site()
//!     │
//!     ├── discover() ──► sorted post directories under the posts root
//!     │
//!     ├── run_pipeline()  (rayon, one task per directory)
//!     │       │
//!     │       ├── copy assets/ ──► <public_assets>/<slug>/assets
//!     │       ├── blog.md  ──► post::markdown::load_post()
//!     │       └── main.tex ──► latex::build_post()
//!     │
//!     └── generator::metadata::write_all()
//! ```
//!
//! Problems with a single post never abort the run: they are logged and
//! collected as [`Skipped`] entries. Only environment failures (output
//! directory or metadata export not writable) are errors.

use crate::{
    config::{BuildConfig, SiteConfig},
    generator::metadata,
    latex::{
        self,
        compile::{FigureCompiler, ScratchDir, TikzToolchain},
        convert::{DocumentConverter, Pandoc},
    },
    log,
    post::{PostKind, PostRecord, markdown},
    utils::{fs::copy_dir, log::Progress},
};
use anyhow::{Context, Result};
use rayon::prelude::*;
use std::{
    fmt, fs,
    path::{Path, PathBuf},
};

/// Why a post directory produced no record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Neither a Markdown nor a LaTeX entry file exists
    MissingEntry,
    /// An entry file exists but could not be read or processed
    Unreadable(String),
    /// The directory name cannot be used as a slug
    InvalidSlug,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingEntry => f.write_str("no entry file"),
            Self::Unreadable(e) => write!(f, "unreadable: {e}"),
            Self::InvalidSlug => f.write_str("directory name is not a valid slug"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skipped {
    pub slug: String,
    pub reason: SkipReason,
}

/// Everything a run produced.
#[derive(Debug, Default)]
pub struct BuildReport {
    /// Records in discovery order; a directory with both entry files
    /// contributes its Markdown record first
    pub posts: Vec<PostRecord>,
    pub skipped: Vec<Skipped>,
}

impl BuildReport {
    fn count(&self, kind: PostKind) -> usize {
        self.posts.iter().filter(|p| p.kind == Some(kind)).count()
    }

    fn extend(&mut self, other: Self) {
        self.posts.extend(other.posts);
        self.skipped.extend(other.skipped);
    }

    fn skip(&mut self, slug: &str, reason: SkipReason) {
        log!("warn"; "skipping {slug}: {reason}");
        self.skipped.push(Skipped {
            slug: slug.to_owned(),
            reason,
        });
    }
}

/// Run the whole ingestion pipeline with the configured toolchain.
///
/// A missing posts root is a no-op: nothing is written and the report is
/// empty.
pub fn build_site(config: &SiteConfig) -> Result<BuildReport> {
    let build = &config.build;

    if !build.content.is_dir() {
        log!("warn"; "posts root {} not found, nothing to build", build.content.display());
        return Ok(BuildReport::default());
    }

    config.check_output()?;
    prepare_output(build)?;
    config.check_toolchain();

    let scratch = ScratchDir::new_in(&build.output)?;
    let compiler = TikzToolchain::new(build, &scratch);
    let converter = Pandoc::new(&build.pandoc);
    let report = run_pipeline(build, &compiler, &converter, &scratch)?;
    scratch.close()?;

    metadata::write_all(&report.posts, &build.metadata)?;
    log_build_result(&report);
    Ok(report)
}

/// Create the output directory, emptying it first when `clean` is set.
fn prepare_output(config: &BuildConfig) -> Result<()> {
    let output = &config.output;
    if config.clean && output.exists() {
        fs::remove_dir_all(output)
            .with_context(|| format!("Failed to clean output directory {}", output.display()))?;
        log!("build"; "cleaned {}", output.display());
    }
    fs::create_dir_all(output)
        .with_context(|| format!("Failed to create output directory {}", output.display()))
}

/// Process every post directory with the given toolchain.
///
/// Directories are handled in parallel on a pool of `config.jobs` threads;
/// the report keeps discovery order regardless.
pub fn run_pipeline<C, D>(
    config: &BuildConfig,
    compiler: &C,
    converter: &D,
    scratch: &ScratchDir,
) -> Result<BuildReport>
where
    C: FigureCompiler + ?Sized,
    D: DocumentConverter + ?Sized,
{
    let dirs = discover(&config.content)?;
    log!("build"; "found {} post directories in {}", dirs.len(), config.content.display());

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.jobs)
        .build()
        .context("Failed to start worker threads")?;

    let progress = Progress::new("posts", dirs.len());
    let reports: Vec<BuildReport> = pool.install(|| {
        dirs.par_iter()
            .map(|dir| {
                let report = process_dir(dir, config, compiler, converter, scratch);
                progress.inc();
                report
            })
            .collect()
    });
    progress.finish();

    let mut report = BuildReport::default();
    for r in reports {
        report.extend(r);
    }
    Ok(report)
}

/// Load every post without running any tool or writing any file.
pub fn list_posts(config: &BuildConfig) -> Result<BuildReport> {
    let mut report = BuildReport::default();
    if !config.content.is_dir() {
        log!("warn"; "posts root {} not found", config.content.display());
        return Ok(report);
    }

    for dir in discover(&config.content)? {
        let Some(slug) = slug_of(&dir) else {
            report.skip(&dir.display().to_string(), SkipReason::InvalidSlug);
            continue;
        };

        let entry = &config.entry;
        let loaded = [
            markdown::load_post(&dir, slug, &entry.markdown),
            latex::load_record(&dir, slug, &entry.latex),
        ];
        let mut found = false;
        for result in loaded {
            match result {
                Ok(Some(record)) => {
                    found = true;
                    report.posts.push(record);
                }
                Ok(None) => {}
                Err(e) => {
                    found = true;
                    report.skip(slug, SkipReason::Unreadable(format!("{e:#}")));
                }
            }
        }
        if !found {
            report.skip(slug, SkipReason::MissingEntry);
        }
    }
    Ok(report)
}

/// Sorted subdirectories of `root`, hidden ones excluded.
fn discover(root: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(root)
        .with_context(|| format!("Failed to read posts root {}", root.display()))?;

    let mut dirs: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_ok_and(|t| t.is_dir()))
        .filter(|e| !e.file_name().to_string_lossy().starts_with('.'))
        .map(|e| e.path())
        .collect();
    dirs.sort();
    Ok(dirs)
}

/// Directory name as a slug, `None` when it is not usable in paths and URLs.
fn slug_of(dir: &Path) -> Option<&str> {
    let name = dir.file_name()?.to_str()?;
    let valid = !name.is_empty()
        && !name.contains("..")
        && !name.contains(['/', '\\', '"'])
        && !name.chars().any(char::is_control);
    valid.then_some(name)
}

/// Run every step for one post directory.
fn process_dir<C, D>(
    dir: &Path,
    config: &BuildConfig,
    compiler: &C,
    converter: &D,
    scratch: &ScratchDir,
) -> BuildReport
where
    C: FigureCompiler + ?Sized,
    D: DocumentConverter + ?Sized,
{
    let mut report = BuildReport::default();
    let Some(slug) = slug_of(dir) else {
        report.skip(&dir.display().to_string(), SkipReason::InvalidSlug);
        return report;
    };

    // Assets are published even when the directory has no entry file
    copy_assets(dir, slug, config);

    let entry = &config.entry;
    let mut found = false;

    match markdown::load_post(dir, slug, &entry.markdown) {
        Ok(Some(record)) => {
            found = true;
            log!("markdown"; "{slug}: \"{}\" by {}", record.title, record.author);
            report.posts.push(record);
        }
        Ok(None) => {}
        Err(e) => {
            found = true;
            report.skip(slug, SkipReason::Unreadable(format!("{e:#}")));
        }
    }

    if dir.join(&entry.latex).is_file() {
        found = true;
        match latex::build_post(dir, slug, config, compiler, converter, scratch) {
            Ok(outcome) => {
                if let Some(summary) = outcome.figure_summary() {
                    log!("tikz"; "{slug}: {summary}");
                }
                report.posts.push(outcome.record);
            }
            Err(e) => report.skip(slug, SkipReason::Unreadable(format!("{e:#}"))),
        }
    }

    if !found {
        report.skip(slug, SkipReason::MissingEntry);
    }
    report
}

/// Copy `<dir>/assets` to `<public_assets>/<slug>/assets`.
///
/// Failures only cost the post its assets.
fn copy_assets(dir: &Path, slug: &str, config: &BuildConfig) {
    let src = dir.join(&config.entry.assets);
    if !src.is_dir() {
        return;
    }
    let dest = config.public_assets.join(slug).join(&config.entry.assets);
    match copy_dir(&src, &dest) {
        Ok(n) => log!("assets"; "{slug}: copied {n} files"),
        Err(e) => log!("warn"; "{slug}: failed to copy assets: {e:#}"),
    }
}

fn log_build_result(report: &BuildReport) {
    log!(
        "done";
        "{} posts ({} markdown, {} latex), {} skipped",
        report.posts.len(),
        report.count(PostKind::Markdown),
        report.count(PostKind::Latex),
        report.skipped.len()
    );
}
