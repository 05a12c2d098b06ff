use crate::pattern_set::{PatternSet, PatternSetConfig};
use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};

/// Load every enabled pattern-set module (`*.yaml` / `*.yml`) in `module_dir`.
///
/// Files are read in sorted order so registration order, and with it
/// provider precedence, is stable. A module that fails to parse or compile
/// is skipped with a warning; a missing directory is an error.
pub fn load_pattern_sets(module_dir: &str) -> Result<Vec<PatternSet>> {
    let dir_path = Path::new(module_dir);
    if !dir_path.is_dir() {
        return Err(anyhow::anyhow!(
            "Pattern directory does not exist: {}",
            module_dir
        ));
    }

    let mut yaml_files: Vec<PathBuf> = Vec::new();
    for entry in fs::read_dir(dir_path)? {
        let path = entry?.path();
        if path.is_file() {
            if let Some(extension) = path.extension() {
                if extension == "yaml" || extension == "yml" {
                    yaml_files.push(path);
                }
            }
        }
    }
    yaml_files.sort();

    log::debug!("Found {} pattern modules in {}", yaml_files.len(), module_dir);

    let mut sets = Vec::new();
    for path in &yaml_files {
        match load_module(path) {
            Ok(Some(set)) => {
                log::info!("Loaded pattern set {} from {}", set.name, path.display());
                sets.push(set);
            }
            Ok(None) => {
                log::info!("Pattern module {} is disabled, skipping", path.display());
            }
            Err(e) => {
                log::warn!("Failed to load pattern module {}: {}", path.display(), e);
            }
        }
    }

    Ok(sets)
}

fn load_module(path: &Path) -> Result<Option<PatternSet>> {
    let config = PatternSetConfig::from_file(path)?;
    if !config.enabled {
        return Ok(None);
    }
    config.compile().map(Some)
}
