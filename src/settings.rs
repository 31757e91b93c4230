//! Engine settings.
//!
//! Small knobs the surrounding process hands to the engine: where referenced
//! files resolve from, where the default adapters keep their data, and the
//! instruction length bound. Loadable from a TOML file with an `ATTUNE_*`
//! environment overlay; every field has a default.

use crate::validate::DEFAULT_MAX_INSTRUCTIONS_LEN;
use config::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Base directory for relative file references. Defaults to the
    /// directory containing the declaration manifest.
    #[serde(default)]
    pub base_dir: Option<PathBuf>,

    /// Sled database location for the default store adapter.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Directory for the filesystem avatar adapter.
    #[serde(default = "default_avatar_dir")]
    pub avatar_dir: PathBuf,

    #[serde(default = "default_max_instructions_len")]
    pub max_instructions_len: usize,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("attune-data")
}

fn default_avatar_dir() -> PathBuf {
    PathBuf::from("attune-data/avatars")
}

fn default_max_instructions_len() -> usize {
    DEFAULT_MAX_INSTRUCTIONS_LEN
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            base_dir: None,
            data_dir: default_data_dir(),
            avatar_dir: default_avatar_dir(),
            max_instructions_len: default_max_instructions_len(),
        }
    }
}

/// Settings loader: optional file, then `ATTUNE_*` environment overlay.
pub struct SettingsLoader;

impl SettingsLoader {
    pub fn load(file: Option<&Path>) -> Result<SyncSettings, ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(file) = file {
            builder = builder.add_source(config::File::from(file));
        }
        let builder = builder.add_source(
            config::Environment::with_prefix("ATTUNE")
                .separator("__")
                .try_parsing(true),
        );
        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_usable() {
        let settings = SyncSettings::default();
        assert!(settings.base_dir.is_none());
        assert_eq!(settings.max_instructions_len, 10_000);
        assert_eq!(settings.data_dir, PathBuf::from("attune-data"));
    }

    #[test]
    fn loads_partial_file_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("attune.toml");
        std::fs::write(&path, "max_instructions_len = 500\n").unwrap();

        let settings = SettingsLoader::load(Some(path.as_path())).unwrap();
        assert_eq!(settings.max_instructions_len, 500);
        assert_eq!(settings.avatar_dir, PathBuf::from("attune-data/avatars"));
    }
}
