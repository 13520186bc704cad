//! Command-line interface definitions.
//!
//! Defines all CLI arguments and subcommands using clap.

use crate::config::{CONFIG_FILE, FigureMatching};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Lab website content pipeline
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Project root directory (default: current directory)
    #[arg(short, long)]
    pub root: Option<PathBuf>,

    /// Posts root directory (relative to project root)
    #[arg(short, long)]
    pub content: Option<PathBuf>,

    /// Generated output directory (relative to project root)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Config file name (default: labsite.toml)
    #[arg(short = 'C', long, default_value = CONFIG_FILE)]
    pub config: PathBuf,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Write a default config and create the posts directory
    Init {
        /// the name(path) of project directory, related to `root`
        name: Option<PathBuf>,
    },

    /// Ingest every post: convert LaTeX, compile figures, copy assets, export metadata
    Build {
        /// Remove the generated output directory before building
        #[arg(long)]
        clean: bool,

        /// How compiled figures are matched to figures in the converted HTML
        #[arg(long, value_enum)]
        figure_matching: Option<FigureMatching>,
    },

    /// Load every post and print its metadata, newest first (writes nothing)
    List,
}

#[allow(unused)]
impl Cli {
    pub const fn is_init(&self) -> bool {
        matches!(self.command, Commands::Init { .. })
    }
    pub const fn is_build(&self) -> bool {
        matches!(self.command, Commands::Build { .. })
    }
    pub const fn is_list(&self) -> bool {
        matches!(self.command, Commands::List)
    }
}
