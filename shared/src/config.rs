//! Process configuration (`config.toml`).
//!
//! The configuration is read once and then passed by reference to the
//! resource manager and the script context. Nothing in the libraries reads it
//! from a global.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::i18n::LanguageId;
use crate::resref::{RESREF_MAX_LEN_EE, RESREF_MAX_LEN_V169};

/// Errors from writing a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to write config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    /// Install and user directories
    #[serde(default)]
    pub paths: PathsConfig,
    /// Game version and language
    #[serde(default)]
    pub game: GameConfig,
    /// Resource manager settings
    #[serde(default)]
    pub resources: ResourcesConfig,
    /// Script toolchain settings
    #[serde(default)]
    pub script: ScriptConfig,
}

/// Which generation of the game the data belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GameVersion {
    /// Enhanced Edition (32-byte resrefs)
    #[default]
    Ee,
    /// Version 1.69 (16-byte resrefs)
    V169,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PathsConfig {
    /// Game install directory (contains `data/`)
    #[serde(default)]
    pub install: Option<PathBuf>,
    /// User directory (contains `hak/`, `override/`, `servervault/`)
    #[serde(default)]
    pub user: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    /// Game version (default: ee)
    #[serde(default)]
    pub version: GameVersion,
    /// Short language code (default: en)
    #[serde(default = "default_language")]
    pub language: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourcesConfig {
    /// Mount the install's base containers (default: true)
    #[serde(default = "default_true")]
    pub include_install: bool,
    /// Mount the NWSync store when present (default: true)
    #[serde(default = "default_true")]
    pub nwsync: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptConfig {
    /// Diagnostics reported per script before suppression (default: 20)
    #[serde(default = "default_error_limit")]
    pub error_limit: usize,
    /// Maximum parser recursion depth (default: 128)
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    /// Script whose declarations are visible everywhere (default: nwscript)
    #[serde(default = "default_command_script")]
    pub command_script: String,
    /// Extra directories searched for includes
    #[serde(default)]
    pub include_paths: Vec<PathBuf>,
}

fn default_true() -> bool {
    true
}
fn default_language() -> String {
    "en".to_string()
}
fn default_error_limit() -> usize {
    20
}
fn default_max_depth() -> usize {
    128
}
fn default_command_script() -> String {
    "nwscript".to_string()
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            version: GameVersion::default(),
            language: default_language(),
        }
    }
}

impl Default for ResourcesConfig {
    fn default() -> Self {
        Self {
            include_install: default_true(),
            nwsync: default_true(),
        }
    }
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            error_limit: default_error_limit(),
            max_depth: default_max_depth(),
            command_script: default_command_script(),
            include_paths: Vec::new(),
        }
    }
}

impl Config {
    /// Max resref length for the configured game version.
    pub fn max_resref_len(&self) -> usize {
        match self.game.version {
            GameVersion::Ee => RESREF_MAX_LEN_EE,
            GameVersion::V169 => RESREF_MAX_LEN_V169,
        }
    }

    /// Configured language, falling back to English for unknown codes.
    pub fn language(&self) -> LanguageId {
        match LanguageId::from_short(&self.game.language) {
            LanguageId::Invalid => {
                tracing::warn!(language = %self.game.language, "unknown language, using english");
                LanguageId::English
            }
            lang => lang,
        }
    }
}

/// Returns the platform-specific configuration directory.
///
/// Returns `None` if the home directory cannot be determined.
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("io.rollkit", "", "Rollkit")
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Default configuration file path.
pub fn default_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}

/// Loads the configuration from `path`.
///
/// Returns default values if the file doesn't exist or cannot be parsed.
pub fn load(path: &Path) -> Config {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            tracing::debug!(path = %path.display(), "no config file: {e}");
            return Config::default();
        }
    };
    match toml::from_str(&content) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(path = %path.display(), "invalid config, using defaults: {e}");
            Config::default()
        }
    }
}

/// Saves the configuration to `path`, creating parent directories.
pub fn save(path: &Path, config: &Config) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.game.version, GameVersion::Ee);
        assert_eq!(config.game.language, "en");
        assert!(config.resources.include_install);
        assert_eq!(config.script.error_limit, 20);
        assert_eq!(config.script.max_depth, 128);
        assert_eq!(config.script.command_script, "nwscript");
        assert_eq!(config.max_resref_len(), 32);
    }

    #[test]
    fn test_config_deserialize_empty() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_config_deserialize_partial() {
        let toml_str = r#"
[game]
version = "v169"

[script]
error_limit = 5
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.game.version, GameVersion::V169);
        assert_eq!(config.game.language, "en");
        assert_eq!(config.max_resref_len(), 16);
        assert_eq!(config.script.error_limit, 5);
        assert_eq!(config.script.max_depth, 128);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.paths.install = Some(PathBuf::from("/games/nwn"));
        config.game.language = "de".into();
        save(&path, &config).unwrap();
        assert_eq!(load(&path), config);
        assert_eq!(load(&path).language(), LanguageId::German);
    }

    #[test]
    fn test_load_missing_or_invalid_is_default() {
        let dir = tempfile::TempDir::new().unwrap();
        assert_eq!(load(&dir.path().join("missing.toml")), Config::default());
        let bad = dir.path().join("bad.toml");
        std::fs::write(&bad, "[game\nversion = ").unwrap();
        assert_eq!(load(&bad), Config::default());
    }
}
