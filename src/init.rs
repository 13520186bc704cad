//! Project initialization.
//!
//! Writes a default `labsite.toml` and the posts root into a project.

use crate::{config::SiteConfig, log};
use anyhow::{Context, Result, bail};
use std::{fs, path::Path};

/// Ignore file that receives the generated paths
const IGNORE_FILE: &str = ".gitignore";

/// Initialize the project at the config's root.
pub fn new_site(config: &SiteConfig) -> Result<()> {
    let root = config.get_root();
    if config.config_path.exists() {
        bail!(
            "Config file `{}` already exists. Remove it manually or init in a different path.",
            config.config_path.display()
        );
    }

    fs::create_dir_all(&config.build.content)
        .with_context(|| format!("Failed to create {}", config.build.content.display()))?;
    init_default_config(&config.config_path)?;

    let generated = [&config.build.output, &config.build.public_assets];
    init_ignored_files(root, &generated.map(|p| p.as_path()))?;

    log!("init"; "initialized {}", root.display());
    Ok(())
}

/// Write default configuration file
fn init_default_config(path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(&SiteConfig::default())?;
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Append generated paths to `.gitignore`, skipping lines already present.
fn init_ignored_files(root: &Path, paths: &[&Path]) -> Result<()> {
    let path = root.join(IGNORE_FILE);
    let existing = fs::read_to_string(&path).unwrap_or_default();

    let mut content = existing.clone();
    for p in paths {
        let rel = p.strip_prefix(root).unwrap_or(p);
        let Some(rel) = rel.to_str() else { continue };
        let line = format!("/{}/", rel.trim_matches('/'));
        if existing.lines().any(|l| l.trim() == line) {
            continue;
        }
        if !content.is_empty() && !content.ends_with('\n') {
            content.push('\n');
        }
        content.push_str(&line);
        content.push('\n');
    }

    if content != existing {
        fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    }
    Ok(())
}
