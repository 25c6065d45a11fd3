//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Global Config
//!
//! Located at (in order of precedence):
//! 1. `$SCMKIT_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/scmkit/config.toml`
//! 3. `~/.scmkit/config.toml`
//!
//! # Project Config
//!
//! Located at `<project root>/.git/scmkit/config.toml`, inside the control
//! directory, so a repository cannot ship one.
//!
//! # Validation
//!
//! Config values are validated after parsing (e.g., the engine must be one
//! this build supports, names must not be empty).

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Global configuration (user scope).
///
/// # Example
///
/// ```toml
/// engine = "git"
/// command_timeout_secs = 120
///
/// [avatar]
/// base_url = "https://www.gravatar.com/avatar/"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GlobalConfig {
    /// Preferred engine (e.g., "git")
    pub engine: Option<String>,

    /// Timeout for each external command, in seconds (0 disables)
    pub command_timeout_secs: Option<u64>,

    /// Avatar lookup settings
    pub avatar: Option<AvatarConfig>,
}

impl GlobalConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(engine) = &self.engine {
            let valid = crate::scm::valid_engine_names();
            if !valid.contains(&engine.as_str()) {
                return Err(ConfigError::InvalidValue(format!(
                    "invalid engine '{}', must be one of: {}",
                    engine,
                    valid.join(", ")
                )));
            }
        }

        if let Some(avatar) = &self.avatar {
            avatar.validate()?;
        }

        Ok(())
    }
}

/// Project configuration.
///
/// # Example
///
/// ```toml
/// binary = "/usr/local/bin/git"
/// remote = "origin"
/// upstream_branch = "main"
/// command_timeout_secs = 600
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectConfig {
    /// Tool binary used in commands (defaults to the engine's tool name)
    pub binary: Option<String>,

    /// Remote created by `remote_add` (default: "origin")
    pub remote: Option<String>,

    /// Branch pushed with `--set-upstream` after `remote_add` (default: "master")
    pub upstream_branch: Option<String>,

    /// Per-project command timeout override, in seconds (0 disables)
    pub command_timeout_secs: Option<u64>,
}

impl ProjectConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("binary", &self.binary),
            ("remote", &self.remote),
            ("upstream_branch", &self.upstream_branch),
        ] {
            if let Some(value) = value {
                if value.trim().is_empty() {
                    return Err(ConfigError::InvalidValue(format!(
                        "{} cannot be empty",
                        field
                    )));
                }
            }
        }

        for (field, value) in [
            ("remote", &self.remote),
            ("upstream_branch", &self.upstream_branch),
        ] {
            if let Some(value) = value {
                if !is_ref_name(value) {
                    return Err(ConfigError::InvalidValue(format!(
                        "{} may only contain letters, digits, '.', '_', '/' and '-' \
                         and must not start with '-': '{}'",
                        field, value
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Whether `value` is a plain remote or branch name.
fn is_ref_name(value: &str) -> bool {
    !value.starts_with('-')
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '/' | '-'))
}

/// Avatar lookup configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct AvatarConfig {
    /// URL prefix the hashed email is appended to
    pub base_url: Option<String>,
}

impl AvatarConfig {
    /// Validate the avatar configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(url) = &self.base_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::InvalidValue(format!(
                    "invalid avatar base_url '{}', must start with http:// or https://",
                    url
                )));
            }
        }
        Ok(())
    }
}
