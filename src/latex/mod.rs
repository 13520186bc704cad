//! LaTeX post pipeline.
//!
//! # Architecture
//!
//! ```text
//! main.tex
//!     │
//!     ├── meta::extract_meta() + meta::excerpt() ──► PostRecord
//!     │
//!     ├── figure::extract_figures()
//!     │       └── FigureCompiler::compile() ──► <output>/tikz/<slug>/fig-N.svg
//!     │
//!     ├── DocumentConverter::convert() ──► <output>/<slug>.html
//!     │
//!     └── inject ──► figures re-attached to the HTML
//! ```
//!
//! The record is complete before conversion starts, so a post whose
//! conversion fails is still listed.

pub mod compile;
pub mod convert;
pub mod figure;
pub mod inject;
pub mod meta;

use crate::{
    config::{BuildConfig, FigureMatching},
    log,
    post::{Category, PostKind, PostRecord},
};
use anyhow::{Context, Result};
use compile::{CompiledFigure, FigureCompiler, ScratchDir};
use convert::DocumentConverter;
use figure::FigureBlock;
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Result of building one LaTeX post.
#[derive(Debug)]
pub struct LatexOutcome {
    pub record: PostRecord,
    /// Generated HTML fragment, `None` when conversion failed
    pub html: Option<PathBuf>,
    /// Figure blocks found in the source
    pub figures: usize,
    /// Figures whose image was written
    pub compiled: usize,
    /// Images placed into the HTML
    pub embedded: usize,
}

impl LatexOutcome {
    /// One-line figure tally, `None` for a post without figures.
    pub fn figure_summary(&self) -> Option<String> {
        (self.figures > 0).then(|| {
            format!(
                "{} of {} figures compiled, {} embedded",
                self.compiled, self.figures, self.embedded
            )
        })
    }
}

/// Build the record of a LaTeX source without running any tool.
pub fn read_record(slug: &str, text: &str) -> PostRecord {
    let meta = meta::extract_meta(text);
    PostRecord {
        slug: slug.to_owned(),
        title: meta.title,
        author: meta.author,
        date: meta.date,
        excerpt: meta::excerpt(text),
        content: String::new(),
        category: Category::Blog,
        kind: Some(PostKind::Latex),
    }
}

/// Load the record of the LaTeX post in `dir` without running any tool.
///
/// Returns `Ok(None)` when the directory has no `entry` file.
pub fn load_record(dir: &Path, slug: &str, entry: &str) -> Result<Option<PostRecord>> {
    let path = dir.join(entry);
    if !path.is_file() {
        return Ok(None);
    }
    let text = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(Some(read_record(slug, &text)))
}

/// Run the full pipeline for the LaTeX post in `dir`.
///
/// Only an unreadable source is an error. Failing figures and a failing
/// conversion are logged and reflected in the outcome.
pub fn build_post<C, D>(
    dir: &Path,
    slug: &str,
    config: &BuildConfig,
    compiler: &C,
    converter: &D,
    scratch: &ScratchDir,
) -> Result<LatexOutcome>
where
    C: FigureCompiler + ?Sized,
    D: DocumentConverter + ?Sized,
{
    let path = dir.join(&config.entry.latex);
    let text = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let record = read_record(slug, &text);
    log!("latex"; "{slug}: \"{}\" by {}", record.title, record.author);

    let blocks = figure::extract_figures(&text);
    let compiled = compile_figures(&blocks, slug, config, compiler);

    let mut outcome = LatexOutcome {
        record,
        html: None,
        figures: blocks.len(),
        compiled: compiled.len(),
        embedded: 0,
    };

    let html_path = config.output.join(format!("{slug}.html"));
    let source = match config.figures.matching {
        FigureMatching::Position => path,
        FigureMatching::Marker => {
            let marked = scratch.path().join(marked_source_name(slug));
            fs::write(&marked, inject::mark_figures(&text, &blocks, &compiled))
                .with_context(|| format!("Failed to write {}", marked.display()))?;
            marked
        }
    };

    if let Err(e) = converter.convert(&source, &html_path, dir) {
        log!("warn"; "{slug}: conversion failed, figures not embedded: {e:#}");
        return Ok(outcome);
    }

    let html = fs::read_to_string(&html_path)
        .with_context(|| format!("Failed to read {}", html_path.display()))?;
    let alt = &config.figures.alt;
    let (html, embedded) = match config.figures.matching {
        FigureMatching::Position => inject::inject_by_position(&html, &compiled, alt),
        FigureMatching::Marker => inject::inject_by_marker(&html, &compiled, alt),
    };
    fs::write(&html_path, html)
        .with_context(|| format!("Failed to write {}", html_path.display()))?;

    outcome.html = Some(html_path);
    outcome.embedded = embedded;
    Ok(outcome)
}

/// Compile every block to `<output>/tikz/<slug>/fig-N.svg`, keeping the ones
/// that succeed in source order.
fn compile_figures<C>(
    blocks: &[FigureBlock],
    slug: &str,
    config: &BuildConfig,
    compiler: &C,
) -> Vec<CompiledFigure>
where
    C: FigureCompiler + ?Sized,
{
    let url_prefix = config.url_prefix.trim_end_matches('/');

    blocks
        .iter()
        .filter_map(|block| {
            let label = block.label();
            let path = config.output.join("tikz").join(slug).join(format!("{label}.svg"));
            compiler
                .compile(block, &figure_scratch_name(slug, block), &path)
                .then(|| CompiledFigure {
                    id: block.id,
                    path,
                    url: format!("{url_prefix}/tikz/{slug}/{label}.svg"),
                })
        })
        .collect()
}

/// Scratch file stem of one figure: `<slug>-fig-N`.
fn figure_scratch_name(slug: &str, block: &FigureBlock) -> String {
    format!("{slug}-{}", block.label())
}

/// Scratch file of the marked source. Never ends in `-fig-N.tex`, so it
/// cannot clash with a figure of another post.
fn marked_source_name(slug: &str) -> String {
    format!("{slug}.marked.tex")
}

/// Toolchain stand-ins for tests.
#[cfg(test)]
pub(crate) mod testing {
    use super::{FigureBlock, FigureCompiler, convert::DocumentConverter};
    use anyhow::{Result, bail};
    use regex::Regex;
    use std::{fs, path::Path, sync::LazyLock};

    static RE_FIGURE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?s)\\begin\{figure\}(.*?)\\end\{figure\}").unwrap()
    });
    static RE_CAPTION: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\\caption\{([^}]*)\}").unwrap());
    static RE_GRAPHICS: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\\includegraphics\{([^}]*)\}").unwrap());

    /// Writes a stub SVG for every figure whose id is not in `failing`.
    pub struct FakeCompiler {
        pub failing: Vec<usize>,
    }

    impl FakeCompiler {
        pub fn ok() -> Self {
            Self { failing: vec![] }
        }
    }

    impl FigureCompiler for FakeCompiler {
        fn compile(&self, figure: &FigureBlock, _name: &str, output: &Path) -> bool {
            if self.failing.contains(&figure.id) {
                return false;
            }
            fs::create_dir_all(output.parent().unwrap()).unwrap();
            fs::write(output, format!("<svg><!-- {} --></svg>", figure.id)).unwrap();
            true
        }
    }

    /// Converts `figure` environments the way pandoc does: a figure whose
    /// only content pandoc cannot render becomes an empty slot, and
    /// `\includegraphics` becomes an `<img>`.
    pub struct FakeConverter;

    impl DocumentConverter for FakeConverter {
        fn convert(&self, source: &Path, output: &Path, _workdir: &Path) -> Result<()> {
            let text = fs::read_to_string(source)?;
            let mut html = String::from("<p>converted</p>\n");
            for figure in RE_FIGURE.captures_iter(&text) {
                let body = &figure[1];
                let caption = RE_CAPTION.captures(body).map_or("", |c| c.get(1).unwrap().as_str());
                match RE_GRAPHICS.captures(body) {
                    Some(img) => html.push_str(&format!(
                        "<figure>\n<img src=\"{}\" />\n<figcaption>{caption}</figcaption>\n</figure>\n",
                        &img[1]
                    )),
                    None => html.push_str(&format!(
                        "<figure>\n\n<figcaption>{caption}</figcaption>\n</figure>\n"
                    )),
                }
            }
            fs::create_dir_all(output.parent().unwrap())?;
            fs::write(output, html)?;
            Ok(())
        }
    }

    /// Always fails, like a missing `pandoc`.
    pub struct FailingConverter;

    impl DocumentConverter for FailingConverter {
        fn convert(&self, _source: &Path, _output: &Path, _workdir: &Path) -> Result<()> {
            bail!("converter unavailable")
        }
    }

    pub const TWO_FIGURES: &str = r"\documentclass{article}
\title{Most Real Numbers Do Not Exist}
\author{Tomaso Poggio}
\date{Jan 26, 2026}
\begin{document}
\maketitle
\begin{abstract}
Almost every real number can never be named, computed or described.
\end{abstract}
\section{Setup}
\begin{figure}
\begin{tikzpicture}\draw (0,0) -- (1,1);\end{tikzpicture}
\caption{Figure one}
\end{figure}
\begin{figure}
\begin{tikzpicture}\draw (1,1) -- (2,2);\end{tikzpicture}
\caption{Figure two}
\end{figure}
\end{document}
";
}
