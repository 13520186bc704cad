//! TikZ figure compilation.
//!
//! Each figure is wrapped in a `standalone` document and run through
//! `latex` (DVI output) and `dvisvgm`:
//!
//! ```text
//! FigureBlock ──► <scratch>/<name>.tex ──latex──► <name>.dvi ──dvisvgm──► tikz/<slug>/fig-N.svg
//! ```
//!
//! A failing figure is reported and dropped; it never stops its siblings or
//! the batch.

use super::figure::FigureBlock;
use crate::{
    config::{BuildConfig, LatexConfig},
    exec, log,
};
use anyhow::{Context, Result, bail};
use std::{
    fmt::Write as _,
    fs,
    path::{Path, PathBuf},
};
use tempfile::TempDir;

/// Compiles one figure into an image file.
pub trait FigureCompiler: Sync {
    /// Compile `figure` to `output`. `name` is unique within the build and
    /// may be used for intermediate files.
    ///
    /// Returns whether `output` was written.
    fn compile(&self, figure: &FigureBlock, name: &str, output: &Path) -> bool;
}

/// A figure whose image was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledFigure {
    /// Id of the source [`FigureBlock`]
    pub id: usize,
    /// Image file on disk
    pub path: PathBuf,
    /// Public URL of the image
    pub url: String,
}

// ============================================================================
// Scratch Directory
// ============================================================================

/// Temporary directory for intermediate compilation artifacts.
///
/// One instance lives for a whole build. It is removed when dropped, so every
/// exit path of the build (errors and panics included) cleans it up. Files
/// inside are namespaced by post slug, which keeps posts processed on
/// different threads apart.
#[derive(Debug)]
pub struct ScratchDir {
    dir: TempDir,
}

impl ScratchDir {
    /// Create a fresh scratch directory inside `parent`.
    pub fn new_in(parent: &Path) -> Result<Self> {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
        let dir = tempfile::Builder::new()
            .prefix("temp-tikz-")
            .tempdir_in(parent)
            .with_context(|| format!("Failed to create scratch directory in {}", parent.display()))?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Remove the directory now, reporting failures instead of ignoring them.
    pub fn close(self) -> Result<()> {
        let path = self.dir.path().to_path_buf();
        self.dir
            .close()
            .with_context(|| format!("Failed to remove {}", path.display()))
    }
}

// ============================================================================
// LaTeX Toolchain
// ============================================================================

/// Compiles figures with the configured `latex` and `dvisvgm` commands.
pub struct TikzToolchain<'a> {
    config: &'a BuildConfig,
    scratch: &'a ScratchDir,
}

impl<'a> TikzToolchain<'a> {
    pub fn new(config: &'a BuildConfig, scratch: &'a ScratchDir) -> Self {
        Self { config, scratch }
    }

    fn try_compile(&self, figure: &FigureBlock, name: &str, output: &Path) -> Result<()> {
        let dir = self.scratch.path();
        let tex = dir.join(format!("{name}.tex"));
        let dvi = dir.join(format!("{name}.dvi"));

        fs::write(&tex, standalone_document(&figure.source, &self.config.latex))
            .with_context(|| format!("Failed to write {}", tex.display()))?;

        exec!(
            dir;
            &self.config.latex.command;
            "-interaction=nonstopmode",
            format!("-output-directory={}", dir.display()),
            &tex
        )?;

        if !dvi.is_file() {
            bail!("latex produced no {}", dvi.display());
        }

        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        exec!(
            dir;
            &self.config.svg.command;
            "--exact",
            format!("--output={}", output.display()),
            &dvi
        )?;

        if !output.is_file() {
            bail!("dvisvgm produced no {}", output.display());
        }

        Ok(())
    }
}

impl FigureCompiler for TikzToolchain<'_> {
    fn compile(&self, figure: &FigureBlock, name: &str, output: &Path) -> bool {
        match self.try_compile(figure, name, output) {
            Ok(()) => true,
            Err(e) => {
                log!("tikz"; "failed to compile {name}: {e:#}");
                false
            }
        }
    }
}

/// Wrap figure code in a minimal `standalone` document.
pub fn standalone_document(code: &str, latex: &LatexConfig) -> String {
    let mut doc = String::with_capacity(code.len() + 256);
    doc.push_str("\\documentclass[tikz,border=2pt]{standalone}\n");
    doc.push_str("\\usepackage{amsmath,amssymb}\n");
    doc.push_str("\\usepackage{tikz}\n");
    if !latex.libraries.is_empty() {
        writeln!(doc, "\\usetikzlibrary{{{}}}", latex.libraries.join(", ")).ok();
    }
    for package in &latex.packages {
        writeln!(doc, "{package}").ok();
    }
    doc.push_str("\n\\begin{document}\n");
    doc.push_str(code);
    doc.push_str("\n\\end{document}");
    doc
}
