//! LaTeX to HTML conversion.

use crate::{config::PandocConfig, exec};
use anyhow::{Context, Result, bail};
use std::{fs, path::Path};

/// Converts a whole source document into an HTML file.
pub trait DocumentConverter: Sync {
    /// Convert `source` to `output`. Relative `\input`/`\includegraphics`
    /// paths resolve against `workdir`.
    fn convert(&self, source: &Path, output: &Path, workdir: &Path) -> Result<()>;
}

/// Runs the configured `pandoc` command.
///
/// Equivalent to `pandoc <args...> <source> -o <output>` run in `workdir`.
pub struct Pandoc<'a> {
    config: &'a PandocConfig,
}

impl<'a> Pandoc<'a> {
    pub fn new(config: &'a PandocConfig) -> Self {
        Self { config }
    }

    /// Command followed by the configured arguments.
    fn command_line(&self) -> Vec<String> {
        self.config
            .command
            .iter()
            .chain(&self.config.args)
            .cloned()
            .collect()
    }
}

impl DocumentConverter for Pandoc<'_> {
    fn convert(&self, source: &Path, output: &Path, workdir: &Path) -> Result<()> {
        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let command = self.command_line();
        exec!(workdir; &command; source, "-o", output)?;

        if !output.is_file() {
            bail!("pandoc produced no {}", output.display());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line_order() {
        let config = PandocConfig::default();
        let pandoc = Pandoc::new(&config);
        assert_eq!(
            pandoc.command_line(),
            vec!["pandoc", "-s", "--mathjax", "--from=latex"]
        );
    }

    #[test]
    fn test_missing_converter_is_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = PandocConfig {
            command: vec!["labsite-no-such-pandoc".into()],
            args: vec![],
        };
        let source = dir.path().join("main.tex");
        fs::write(&source, "\\section{A}").unwrap();

        let result = Pandoc::new(&config).convert(&source, &dir.path().join("out/a.html"), dir.path());
        assert!(result.is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_zero_exit_without_output_is_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = PandocConfig {
            command: vec!["true".into()],
            args: vec![],
        };
        let source = dir.path().join("main.tex");
        let output = dir.path().join("out/a.html");

        let err = Pandoc::new(&config).convert(&source, &output, dir.path()).unwrap_err();
        assert!(err.to_string().contains("produced no"));
        // the output directory is prepared before running
        assert!(dir.path().join("out").is_dir());
    }
}
