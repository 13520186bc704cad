//! Pipeline configuration management.
//!
//! Handles loading, parsing, and validating the `labsite.toml` configuration file.
//! Every field has a default matching the lab website's directory layout, so a
//! project without a config file builds exactly as the site expects.

use crate::cli::{Cli, Commands};
use crate::log;
use anyhow::{Result, bail};
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

/// Default config filename
pub const CONFIG_FILE: &str = "labsite.toml";

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error when reading `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Config file parsing error")]
    Toml(#[from] toml::de::Error),

    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Default values for serde deserialization
pub mod config_defaults {
    pub fn r#false() -> bool {
        false
    }
    pub fn r#true() -> bool {
        true
    }

    pub mod build {
        use std::path::PathBuf;

        pub fn content() -> PathBuf {
            "content/blogs".into()
        }
        pub fn output() -> PathBuf {
            "generated/blogs".into()
        }
        pub fn public_assets() -> PathBuf {
            "public/blog-assets".into()
        }
        pub fn url_prefix() -> String {
            "/generated/blogs".into()
        }
        pub fn jobs() -> usize {
            0
        }

        pub mod entry {
            pub fn markdown() -> String {
                "blog.md".into()
            }
            pub fn latex() -> String {
                "main.tex".into()
            }
            pub fn assets() -> String {
                "assets".into()
            }
        }

        pub mod metadata {
            use std::path::PathBuf;

            pub fn path() -> PathBuf {
                "app/data/latexBlogs.ts".into()
            }
            pub fn export_name() -> String {
                "latexBlogs".into()
            }
            pub fn type_import() -> String {
                "@/app/data/blogs".into()
            }
            pub fn index() -> PathBuf {
                "generated/blogs/posts.json".into()
            }
        }

        pub mod latex {
            pub fn command() -> Vec<String> {
                vec!["latex".into()]
            }
            pub fn libraries() -> Vec<String> {
                ["positioning", "arrows.meta", "calc", "shapes.geometric"]
                    .into_iter()
                    .map(Into::into)
                    .collect()
            }
        }

        pub mod svg {
            pub fn command() -> Vec<String> {
                vec!["dvisvgm".into()]
            }
        }

        pub mod pandoc {
            pub fn command() -> Vec<String> {
                vec!["pandoc".into()]
            }
            pub fn args() -> Vec<String> {
                ["-s", "--mathjax", "--from=latex"]
                    .into_iter()
                    .map(Into::into)
                    .collect()
            }
        }

        pub mod figures {
            pub fn alt() -> String {
                "TikZ Diagram".into()
            }
        }
    }
}

/// How compiled figures are attached to the converted HTML.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FigureMatching {
    /// Fill empty `<figure>` slots in order with compiled figures in order
    #[default]
    Position,
    /// Swap compiled figures for `\includegraphics{<id>.svg}` before
    /// conversion and rewrite the image sources afterwards
    Marker,
}

/// `[build]` section in labsite.toml
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Posts root: one subdirectory per post (relative to root)
    #[serde(default = "config_defaults::build::content")]
    #[educe(Default = config_defaults::build::content())]
    pub content: PathBuf,

    /// Generated HTML fragments and compiled figures (relative to root)
    #[serde(default = "config_defaults::build::output")]
    #[educe(Default = config_defaults::build::output())]
    pub output: PathBuf,

    /// Destination of copied post asset directories (relative to root)
    #[serde(default = "config_defaults::build::public_assets")]
    #[educe(Default = config_defaults::build::public_assets())]
    pub public_assets: PathBuf,

    /// URL under which `output` is served, e.g.: "/generated/blogs"
    #[serde(default = "config_defaults::build::url_prefix")]
    #[educe(Default = config_defaults::build::url_prefix())]
    pub url_prefix: String,

    /// Remove the output directory before building
    #[serde(default = "config_defaults::r#false")]
    #[educe(Default = false)]
    pub clean: bool,

    /// Worker threads for post processing (0 = one per CPU, 1 = sequential)
    #[serde(default = "config_defaults::build::jobs")]
    #[educe(Default = config_defaults::build::jobs())]
    pub jobs: usize,

    /// Entry file names inside a post directory
    #[serde(default)]
    pub entry: EntryConfig,

    /// Generated metadata export
    #[serde(default)]
    pub metadata: MetadataConfig,

    /// LaTeX compiler used for figures
    #[serde(default)]
    pub latex: LatexConfig,

    /// DVI to SVG converter used for figures
    #[serde(default)]
    pub svg: SvgConfig,

    /// Document converter
    #[serde(default)]
    pub pandoc: PandocConfig,

    /// Figure injection settings
    #[serde(default)]
    pub figures: FiguresConfig,
}

/// `[build.entry]` section
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct EntryConfig {
    /// Markdown post body file
    #[serde(default = "config_defaults::build::entry::markdown")]
    #[educe(Default = config_defaults::build::entry::markdown())]
    pub markdown: String,

    /// LaTeX post source file
    #[serde(default = "config_defaults::build::entry::latex")]
    #[educe(Default = config_defaults::build::entry::latex())]
    pub latex: String,

    /// Optional asset subdirectory copied verbatim
    #[serde(default = "config_defaults::build::entry::assets")]
    #[educe(Default = config_defaults::build::entry::assets())]
    pub assets: String,
}

/// `[build.metadata]` section
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct MetadataConfig {
    /// Generated TypeScript module exporting LaTeX post records
    #[serde(default = "config_defaults::build::metadata::path")]
    #[educe(Default = config_defaults::build::metadata::path())]
    pub path: PathBuf,

    /// Name of the exported array
    #[serde(default = "config_defaults::build::metadata::export_name")]
    #[educe(Default = config_defaults::build::metadata::export_name())]
    pub export_name: String,

    /// Module the `BlogPost` type is imported from
    #[serde(default = "config_defaults::build::metadata::type_import")]
    #[educe(Default = config_defaults::build::metadata::type_import())]
    pub type_import: String,

    /// JSON index of every post record
    #[serde(default = "config_defaults::build::metadata::index")]
    #[educe(Default = config_defaults::build::metadata::index())]
    pub index: PathBuf,

    /// Write `index` after each build; set to false to disable
    #[serde(default = "config_defaults::r#true")]
    #[educe(Default = true)]
    pub write_index: bool,
}

/// `[build.latex]` section
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct LatexConfig {
    /// LaTeX command producing DVI output
    #[serde(default = "config_defaults::build::latex::command")]
    #[educe(Default = config_defaults::build::latex::command())]
    pub command: Vec<String>,

    /// TikZ libraries loaded by the standalone wrapper
    #[serde(default = "config_defaults::build::latex::libraries")]
    #[educe(Default = config_defaults::build::latex::libraries())]
    pub libraries: Vec<String>,

    /// Extra preamble lines, e.g.: "\\usepackage{pgfplots}"
    #[serde(default)]
    pub packages: Vec<String>,
}

/// `[build.svg]` section
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct SvgConfig {
    /// DVI to SVG command
    #[serde(default = "config_defaults::build::svg::command")]
    #[educe(Default = config_defaults::build::svg::command())]
    pub command: Vec<String>,
}

/// `[build.pandoc]` section
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct PandocConfig {
    /// Converter command
    #[serde(default = "config_defaults::build::pandoc::command")]
    #[educe(Default = config_defaults::build::pandoc::command())]
    pub command: Vec<String>,

    /// Arguments placed between the source file and `-o <output>`
    #[serde(default = "config_defaults::build::pandoc::args")]
    #[educe(Default = config_defaults::build::pandoc::args())]
    pub args: Vec<String>,
}

/// `[build.figures]` section
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct FiguresConfig {
    #[serde(default)]
    pub matching: FigureMatching,

    /// `alt` text of injected images
    #[serde(default = "config_defaults::build::figures::alt")]
    #[educe(Default = config_defaults::build::figures::alt())]
    pub alt: String,
}

/// Root configuration structure representing labsite.toml
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct SiteConfig {
    /// Project root, all relative paths resolve against it
    #[serde(skip)]
    #[educe(Default = PathBuf::from("./"))]
    pub root: PathBuf,

    /// Path of the loaded config file
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Build settings
    #[serde(default)]
    pub build: BuildConfig,
}

impl SiteConfig {
    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: SiteConfig = toml::from_str(content).map_err(ConfigError::from)?;
        Ok(config)
    }

    /// Load configuration from file path
    pub fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        Self::from_str(&content)
    }

    /// Load the config named by the CLI, falling back to defaults when the
    /// file does not exist, then apply CLI overrides.
    pub fn load(cli: &Cli) -> Result<Self> {
        let root = expand_path(cli.root.as_deref().unwrap_or(Path::new("./")));
        let root = match &cli.command {
            Commands::Init { name: Some(name) } => root.join(name),
            _ => root,
        };
        // external tools run with their own working directory
        let root = std::path::absolute(&root)
            .map_err(|err| ConfigError::Io(root.clone(), err))?;
        let config_path = root.join(&cli.config);

        let mut config = if config_path.exists() && !cli.is_init() {
            Self::from_path(&config_path)?
        } else {
            Self::default()
        };
        config.config_path = config_path;
        config.update_with_cli(cli, &root);
        Ok(config)
    }

    /// Get the root directory path
    pub fn get_root(&self) -> &Path {
        &self.root
    }

    /// Apply command-line overrides and resolve every path against `root`.
    fn update_with_cli(&mut self, cli: &Cli, root: &Path) {
        self.root = root.to_path_buf();

        if let Some(content) = &cli.content {
            self.build.content = content.clone();
        }
        if let Some(output) = &cli.output {
            self.build.output = output.clone();
        }
        if let Commands::Build {
            clean,
            figure_matching,
        } = &cli.command
        {
            self.build.clean |= *clean;
            if let Some(matching) = figure_matching {
                self.build.figures.matching = *matching;
            }
        }

        self.resolve_paths();
    }

    /// Join relative paths onto the root directory.
    fn resolve_paths(&mut self) {
        let root = self.root.clone();
        let resolve = |path: &Path| root.join(expand_path(path));

        self.build.content = resolve(&self.build.content);
        self.build.output = resolve(&self.build.output);
        self.build.public_assets = resolve(&self.build.public_assets);
        self.build.metadata.path = resolve(&self.build.metadata.path);
        self.build.metadata.index = resolve(&self.build.metadata.index);
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let commands = [
            ("[build.latex.command]", &self.build.latex.command),
            ("[build.svg.command]", &self.build.svg.command),
            ("[build.pandoc.command]", &self.build.pandoc.command),
        ];
        for (field, command) in commands {
            if command.first().is_none_or(|c| c.trim().is_empty()) {
                bail!(ConfigError::Validation(format!(
                    "{field} must have at least one element"
                )));
            }
        }

        let entry = &self.build.entry;
        for (field, name) in [
            ("[build.entry.markdown]", &entry.markdown),
            ("[build.entry.latex]", &entry.latex),
            ("[build.entry.assets]", &entry.assets),
        ] {
            if name.is_empty() || name.contains(['/', '\\']) {
                bail!(ConfigError::Validation(format!(
                    "{field} must be a plain file name"
                )));
            }
        }

        if !self.build.url_prefix.starts_with('/') && !self.build.url_prefix.starts_with("http") {
            bail!(ConfigError::Validation(
                "[build.url_prefix] must start with `/` or http:// or https://".into()
            ));
        }

        if self.build.metadata.export_name.is_empty()
            || !self
                .build
                .metadata
                .export_name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        {
            bail!(ConfigError::Validation(
                "[build.metadata.export_name] must be a valid identifier".into()
            ));
        }

        self.check_output()
    }

    /// Refuse an output directory that would swallow the posts or the
    /// project when `clean` empties it.
    pub fn check_output(&self) -> Result<()> {
        let output = &self.build.output;
        for (name, path) in [("posts root", &self.build.content), ("project root", &self.root)] {
            if path.starts_with(output) {
                bail!(ConfigError::Validation(format!(
                    "[build.output] `{}` must not equal or contain the {name} `{}`",
                    output.display(),
                    path.display()
                )));
            }
        }
        Ok(())
    }

    /// Warn about toolchain commands that are not installed.
    ///
    /// A missing tool only degrades the artifacts that need it, so this never
    /// fails the build.
    pub fn check_toolchain(&self) {
        let commands = [
            &self.build.latex.command,
            &self.build.svg.command,
            &self.build.pandoc.command,
        ];
        for command in commands {
            if let Some(cmd) = command.first()
                && which::which(cmd).is_err()
            {
                log!("warn"; "`{cmd}` not found, artifacts that need it will be skipped");
            }
        }
    }
}

/// Expand a leading `~` in a path.
fn expand_path(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(s) => PathBuf::from(shellexpand::tilde(s).into_owned()),
        None => path.to_path_buf(),
    }
}
