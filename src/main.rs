//! labsite - content ingestion pipeline for a research lab website.
//!
//! Turns a directory of Markdown and LaTeX posts into HTML fragments,
//! compiled TikZ figures and a metadata module for the site.

mod build;
mod cli;
mod config;
mod generator;
mod init;
mod latex;
mod post;
mod utils;

use anyhow::Result;
use build::{build_site, list_posts};
use clap::Parser;
use cli::{Cli, Commands};
use config::SiteConfig;
use init::new_site;
use post::sort_newest_first;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = SiteConfig::load(&cli)?;

    match &cli.command {
        Commands::Init { .. } => new_site(&config),
        Commands::Build { .. } => {
            config.validate()?;
            build_site(&config).map(|_| ())
        }
        Commands::List => {
            config.validate()?;
            list_all(&config)
        }
    }
}

/// Print every post, newest first.
fn list_all(config: &SiteConfig) -> Result<()> {
    let mut report = list_posts(&config.build)?;
    sort_newest_first(&mut report.posts);

    for post in &report.posts {
        let kind = post.kind.map_or("-", |k| k.name());
        log!("post"; "{:<10} {:<14} {:<28} {}", kind, post.date, post.slug, post.title);
    }
    log!("done"; "{} posts, {} skipped", report.posts.len(), report.skipped.len());
    Ok(())
}
