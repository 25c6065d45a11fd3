//! core::config
//!
//! Configuration schema and loading.
//!
//! # Overview
//!
//! scmkit has two configuration scopes:
//! - **Global**: User-level settings (engine preference, timeouts, avatars)
//! - **Project**: Per-project overrides (tool binary, remote, upstream branch)
//!
//! # Precedence
//!
//! Configuration values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Global config file
//! 3. Project config file (`.git/scmkit/config.toml`)
//!
//! # Global Config Locations
//!
//! Searched in order:
//! 1. `$SCMKIT_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/scmkit/config.toml`
//! 3. `~/.scmkit/config.toml`
//!
//! # Example
//!
//! ```no_run
//! use scmkit::core::config::Config;
//! use std::path::Path;
//!
//! let config = Config::load(Some(Path::new("/path/to/project"))).unwrap();
//! println!("Engine: {}", config.engine());
//! println!("Remote: {}", config.remote());
//! ```

pub mod schema;

pub use schema::{AvatarConfig, GlobalConfig, ProjectConfig};

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

/// Default timeout applied to every external command.
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 300;

/// Default avatar URL prefix.
pub const DEFAULT_AVATAR_BASE_URL: &str = "http://www.gravatar.com/avatar/";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("failed to write config file '{path}': {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config value: {0}")]
    InvalidValue(String),

    #[error("home directory not found")]
    NoHomeDir,
}

/// Merged configuration from all sources.
///
/// Accessor methods apply precedence rules automatically.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Global configuration
    pub global: GlobalConfig,
    /// Project configuration (if a project file exists)
    pub project: Option<ProjectConfig>,
    global_path: Option<PathBuf>,
    project_path: Option<PathBuf>,
}

impl Config {
    /// Build a configuration from in-memory parts (no files involved).
    pub fn from_parts(global: GlobalConfig, project: Option<ProjectConfig>) -> Self {
        Self {
            global,
            project,
            global_path: None,
            project_path: None,
        }
    }

    /// Load configuration from the default locations.
    ///
    /// If `project_root` is provided, also loads the project config.
    ///
    /// # Errors
    ///
    /// Returns an error if config files exist but cannot be parsed or hold
    /// invalid values. Missing files are not an error (defaults are used).
    pub fn load(project_root: Option<&Path>) -> Result<Config, ConfigError> {
        let global_path = Self::find_global();
        Self::load_from(global_path.as_deref(), project_root)
    }

    /// Load configuration from an explicit global file.
    ///
    /// `global_path` that does not exist is treated as absent.
    pub fn load_from(
        global_path: Option<&Path>,
        project_root: Option<&Path>,
    ) -> Result<Config, ConfigError> {
        let (global, global_path) = match global_path {
            Some(path) if path.exists() => (read_toml::<GlobalConfig>(path)?, Some(path)),
            _ => (GlobalConfig::default(), None),
        };

        let (project, project_path) = match project_root {
            Some(root) => {
                let path = Self::project_config_path(root);
                if path.exists() {
                    (Some(read_toml::<ProjectConfig>(&path)?), Some(path))
                } else {
                    (None, None)
                }
            }
            None => (None, None),
        };

        global.validate()?;
        if let Some(ref p) = project {
            p.validate()?;
        }

        Ok(Config {
            global,
            project,
            global_path: global_path.map(Path::to_path_buf),
            project_path,
        })
    }

    /// Locate the global config file, if any.
    fn find_global() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("SCMKIT_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("scmkit/config.toml");
            if path.exists() {
                return Some(path);
            }
        }

        dirs::home_dir()
            .map(|home| home.join(".scmkit/config.toml"))
            .filter(|path| path.exists())
    }

    /// Get the canonical path for global config.
    ///
    /// Returns `~/.scmkit/config.toml`.
    pub fn global_config_path() -> Result<PathBuf, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        Ok(home.join(".scmkit/config.toml"))
    }

    /// Get the path of the project config for `project_root`.
    ///
    /// Returns `.git/scmkit/config.toml` relative to the project root. The
    /// file lives in the control directory, which git never tracks.
    pub fn project_config_path(project_root: &Path) -> PathBuf {
        project_root.join(".git/scmkit/config.toml")
    }

    /// Write project config atomically.
    ///
    /// Creates parent directories if needed.
    pub fn write_project(
        project_root: &Path,
        config: &ProjectConfig,
    ) -> Result<PathBuf, ConfigError> {
        config.validate()?;
        let path = Self::project_config_path(project_root);
        write_toml_atomic(&path, config)?;
        Ok(path)
    }

    // =========================================================================
    // Accessor methods with precedence
    // =========================================================================

    /// Get the preferred engine name.
    ///
    /// Defaults to "git".
    pub fn engine(&self) -> &str {
        self.global.engine.as_deref().unwrap_or("git")
    }

    /// Get the tool binary override, if any.
    pub fn binary(&self) -> Option<&str> {
        self.project.as_ref().and_then(|p| p.binary.as_deref())
    }

    /// Get the remote name used by `remote_add`.
    ///
    /// Defaults to "origin".
    pub fn remote(&self) -> &str {
        self.project
            .as_ref()
            .and_then(|p| p.remote.as_deref())
            .unwrap_or("origin")
    }

    /// Get the branch pushed with `--set-upstream` after `remote_add`.
    ///
    /// Defaults to "master".
    pub fn upstream_branch(&self) -> &str {
        self.project
            .as_ref()
            .and_then(|p| p.upstream_branch.as_deref())
            .unwrap_or("master")
    }

    /// Get the timeout applied to each external command.
    ///
    /// Project overrides global; defaults to 300 seconds. `0` disables the
    /// timeout and yields `None`.
    pub fn command_timeout(&self) -> Option<Duration> {
        let secs = self
            .project
            .as_ref()
            .and_then(|p| p.command_timeout_secs)
            .or(self.global.command_timeout_secs)
            .unwrap_or(DEFAULT_COMMAND_TIMEOUT_SECS);

        (secs > 0).then(|| Duration::from_secs(secs))
    }

    /// Get the avatar URL prefix.
    pub fn avatar_base_url(&self) -> &str {
        self.global
            .avatar
            .as_ref()
            .and_then(|a| a.base_url.as_deref())
            .unwrap_or(DEFAULT_AVATAR_BASE_URL)
    }

    /// Get the path to the loaded global config file.
    pub fn global_config_loaded_from(&self) -> Option<&Path> {
        self.global_path.as_deref()
    }

    /// Get the path to the loaded project config file.
    pub fn project_config_loaded_from(&self) -> Option<&Path> {
        self.project_path.as_deref()
    }
}

/// Read and parse a TOML config file.
fn read_toml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Write a config file atomically (temp file, then rename).
fn write_toml_atomic<T: serde::Serialize>(path: &Path, config: &T) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            source: e,
        })?;
    }

    let contents =
        toml::to_string_pretty(config).map_err(|e| ConfigError::InvalidValue(e.to_string()))?;

    let temp_path = path.with_extension("toml.tmp");
    let mut file = fs::File::create(&temp_path).map_err(|e| ConfigError::WriteError {
        path: temp_path.clone(),
        source: e,
    })?;

    file.write_all(contents.as_bytes())
        .map_err(|e| ConfigError::WriteError {
            path: temp_path.clone(),
            source: e,
        })?;

    file.sync_all().map_err(|e| ConfigError::WriteError {
        path: temp_path.clone(),
        source: e,
    })?;

    fs::rename(&temp_path, path).map_err(|e| ConfigError::WriteError {
        path: path.to_path_buf(),
        source: e,
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;
    use assert_fs::TempDir;

    #[test]
    fn load_empty_defaults() {
        let config = Config::load_from(None, None).unwrap();

        assert_eq!(config.engine(), "git");
        assert_eq!(config.remote(), "origin");
        assert_eq!(config.upstream_branch(), "master");
        assert!(config.binary().is_none());
        assert_eq!(
            config.command_timeout(),
            Some(Duration::from_secs(DEFAULT_COMMAND_TIMEOUT_SECS))
        );
        assert_eq!(config.avatar_base_url(), DEFAULT_AVATAR_BASE_URL);
        assert!(config.global_config_loaded_from().is_none());
        assert!(config.project_config_loaded_from().is_none());
    }

    #[test]
    fn load_global_from_path() {
        let temp = TempDir::new().unwrap();
        let file = temp.child("config.toml");
        file.write_str(
            r#"
            engine = "git"
            command_timeout_secs = 15

            [avatar]
            base_url = "https://avatars.example.com/"
            "#,
        )
        .unwrap();

        let config = Config::load_from(Some(file.path()), None).unwrap();

        assert_eq!(config.command_timeout(), Some(Duration::from_secs(15)));
        assert_eq!(config.avatar_base_url(), "https://avatars.example.com/");
        assert_eq!(config.global_config_loaded_from(), Some(file.path()));
    }

    #[test]
    fn missing_global_path_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope.toml");

        let config = Config::load_from(Some(&missing), None).unwrap();
        assert!(config.global_config_loaded_from().is_none());
    }

    #[test]
    fn load_project_config() {
        let temp = TempDir::new().unwrap();
        temp.child(".git/scmkit/config.toml")
            .write_str(
                r#"
                remote = "upstream"
                upstream_branch = "main"
                "#,
            )
            .unwrap();

        let config = Config::load_from(None, Some(temp.path())).unwrap();

        assert_eq!(config.remote(), "upstream");
        assert_eq!(config.upstream_branch(), "main");
        assert!(config.project_config_loaded_from().is_some());
    }

    #[test]
    fn project_timeout_overrides_global() {
        let config = Config {
            global: GlobalConfig {
                command_timeout_secs: Some(10),
                ..Default::default()
            },
            project: Some(ProjectConfig {
                command_timeout_secs: Some(20),
                ..Default::default()
            }),
            global_path: None,
            project_path: None,
        };

        assert_eq!(config.command_timeout(), Some(Duration::from_secs(20)));
    }

    #[test]
    fn zero_timeout_disables() {
        let config = Config {
            global: GlobalConfig {
                command_timeout_secs: Some(0),
                ..Default::default()
            },
            ..Default::default()
        };

        assert_eq!(config.command_timeout(), None);
    }

    #[test]
    fn write_project_config_atomic() {
        let temp = TempDir::new().unwrap();

        let project = ProjectConfig {
            remote: Some("origin".to_string()),
            upstream_branch: Some("develop".to_string()),
            ..Default::default()
        };

        let path = Config::write_project(temp.path(), &project).unwrap();

        assert!(path.exists());
        assert!(!path.with_extension("toml.tmp").exists());
        let loaded = Config::load_from(None, Some(temp.path())).unwrap();
        assert_eq!(loaded.upstream_branch(), "develop");
    }

    #[test]
    fn invalid_engine_rejected() {
        let temp = TempDir::new().unwrap();
        let file = temp.child("config.toml");
        file.write_str("engine = \"cvs\"").unwrap();

        let result = Config::load_from(Some(file.path()), None);
        assert!(matches!(result, Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn tracked_project_file_ignored() {
        let temp = TempDir::new().unwrap();
        temp.child(".scmkit/config.toml")
            .write_str(r#"remote = "upstream""#)
            .unwrap();

        let config = Config::load_from(None, Some(temp.path())).unwrap();

        assert_eq!(config.remote(), "origin");
        assert!(config.project_config_loaded_from().is_none());
    }

    #[test]
    fn hostile_project_remote_rejected() {
        let temp = TempDir::new().unwrap();
        temp.child(".git/scmkit/config.toml")
            .write_str(r#"remote = "origin;touch${IFS}owned;true""#)
            .unwrap();

        let result = Config::load_from(None, Some(temp.path()));

        assert!(matches!(result, Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn unknown_fields_rejected() {
        let temp = TempDir::new().unwrap();
        temp.child(".git/scmkit/config.toml")
            .write_str(
                r#"
                remote = "origin"
                unknown_field = true
                "#,
            )
            .unwrap();

        let result = Config::load_from(None, Some(temp.path()));
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }
}
