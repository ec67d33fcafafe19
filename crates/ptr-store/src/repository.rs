//! JSON file repository for reusable column-map configurations.
//!
//! Profiles and hand-maintained run configurations live as
//! `{name}.json` files under a base directory. The CLI loads run
//! configuration from here; nothing in the pipeline itself depends on the
//! filesystem.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use ptr_model::ColumnMapConfig;

/// Directory-backed storage for named `ColumnMapConfig`s.
#[derive(Debug, Clone)]
pub struct MapRepository {
    base_dir: PathBuf,
}

impl MapRepository {
    /// Open (creating if necessary) a repository at `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir)
            .with_context(|| format!("create map repository: {}", base_dir.display()))?;
        Ok(Self { base_dir })
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.base_dir.join(format!("{name}.json"))
    }

    pub fn save(&self, name: &str, config: &ColumnMapConfig) -> Result<PathBuf> {
        let path = self.path_for(name);
        let json = serde_json::to_string_pretty(config).context("serialize column map")?;
        fs::write(&path, json).with_context(|| format!("write {}", path.display()))?;
        debug!(name, path = %path.display(), "column map saved");
        Ok(path)
    }

    pub fn load(&self, name: &str) -> Result<ColumnMapConfig> {
        load_config(&self.path_for(name))
    }

    /// Names of every stored configuration, sorted.
    pub fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.base_dir)
            .with_context(|| format!("read {}", self.base_dir.display()))?
        {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json")
                && let Some(stem) = path.file_stem().and_then(|s| s.to_str())
            {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}

/// Load a column-map configuration from an explicit path.
///
/// Malformed configuration (unknown rule kind, missing required rule
/// fields) fails here, before any pipeline stage runs.
pub fn load_config(path: &Path) -> Result<ColumnMapConfig> {
    let json =
        fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let config: ColumnMapConfig = serde_json::from_str(&json)
        .with_context(|| format!("parse column map {}", path.display()))?;
    debug!(
        path = %path.display(),
        mappings = config.mappings.len(),
        rules = config.rules.len(),
        "column map loaded"
    );
    Ok(config)
}
