//! Runtime configuration, loaded once at startup and passed down.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// What happens to a channel's episodes when the channel is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrphanPolicy {
    /// Episodes survive with `channel_id` cleared.
    #[default]
    NullifyEpisodes,
    /// Episodes are hard-deleted along with the channel.
    CascadeDelete,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite database file. Relative paths resolve against the data dir.
    pub database_path: PathBuf,
    /// Upper bound on a single metadata-provider call, in seconds.
    pub metadata_timeout_secs: u64,
    pub orphan_policy: OrphanPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: default_data_dir().join("playlater.db"),
            metadata_timeout_secs: 15,
            orphan_policy: OrphanPolicy::default(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("playlater")
}

impl Config {
    /// Read config from a YAML file; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => serde_yaml::from_str(&content)
                .with_context(|| format!("invalid config at {}", path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("no config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e).with_context(|| format!("reading {}", path.display())),
        }
    }

    pub fn metadata_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.metadata_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_missing_file_defaults() {
        let cfg = Config::load(Path::new("/nonexistent/playlater.yaml")).unwrap();
        assert_eq!(cfg.metadata_timeout_secs, 15);
        assert_eq!(cfg.orphan_policy, OrphanPolicy::NullifyEpisodes);
    }

    #[test]
    fn test_load_partial_yaml() {
        let cfg: Config = serde_yaml::from_str("metadata_timeout_secs: 3").unwrap();
        assert_eq!(cfg.metadata_timeout_secs, 3);
        assert_eq!(cfg.orphan_policy, OrphanPolicy::NullifyEpisodes);
    }

    #[test]
    fn test_orphan_policy_snake_case() {
        let cfg: Config = serde_yaml::from_str("orphan_policy: cascade_delete").unwrap();
        assert_eq!(cfg.orphan_policy, OrphanPolicy::CascadeDelete);
    }
}
