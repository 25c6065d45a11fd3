//! scm::factory
//!
//! Engine selection and creation.
//!
//! # Design
//!
//! Sessions call [`create_engine`] instead of constructing a specific
//! engine, so the rest of the crate only ever sees `dyn Engine`.
//!
//! An engine is created only when both hold:
//! - the project root contains the tool's control directory (`.git`)
//! - the tool binary can be found on `PATH` (or at the configured path)
//!
//! Anything else yields `None`: the project simply has no version control.
//!
//! # Example
//!
//! ```no_run
//! use scmkit::core::config::Config;
//! use scmkit::scm::create_engine;
//! use std::path::Path;
//!
//! let root = Path::new("/path/to/project");
//! let config = Config::load(Some(root)).unwrap();
//! match create_engine(root, &config) {
//!     Some(engine) => println!("using {}", engine.name()),
//!     None => println!("no version control"),
//! }
//! ```

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use super::git::GitEngine;
use super::traits::Engine;
use crate::core::config::Config;

/// Supported engine kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineKind {
    /// The git command-line tool
    Git,
}

impl EngineKind {
    /// Get all supported kinds, in detection order.
    pub fn all() -> &'static [EngineKind] {
        &[EngineKind::Git]
    }

    /// Tool name, as used in configuration and on the command line.
    pub fn name(&self) -> &'static str {
        match self {
            EngineKind::Git => "git",
        }
    }

    /// Name of the control directory at the project root.
    pub fn directory(&self) -> &'static str {
        match self {
            EngineKind::Git => ".git",
        }
    }

    /// Parse a kind from its name (case-insensitive).
    ///
    /// # Example
    ///
    /// ```
    /// use scmkit::scm::EngineKind;
    ///
    /// assert_eq!(EngineKind::parse("Git"), Some(EngineKind::Git));
    /// assert_eq!(EngineKind::parse("hg"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "git" => Some(EngineKind::Git),
            _ => None,
        }
    }
}

impl std::fmt::Display for EngineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Names accepted by the `engine` config key.
pub fn valid_engine_names() -> Vec<&'static str> {
    EngineKind::all().iter().map(|k| k.name()).collect()
}

/// Find the engine whose control directory exists at `root`.
///
/// `preferred` is checked first; the remaining kinds follow in
/// [`EngineKind::all`] order.
pub fn detect_engine(root: &Path, preferred: Option<EngineKind>) -> Option<EngineKind> {
    preferred
        .into_iter()
        .chain(EngineKind::all().iter().copied())
        .find(|kind| root.join(kind.directory()).exists())
}

/// Check whether a tool binary can be executed.
pub fn tool_installed(binary: &str) -> bool {
    which::which(binary).is_ok()
}

/// Create the engine for the project at `root`, if it has one.
///
/// Returns `None` when the project has no control directory or the tool
/// is not installed. Neither case is an error.
pub fn create_engine(root: &Path, config: &Config) -> Option<Arc<dyn Engine>> {
    let preferred = EngineKind::parse(config.engine());
    let Some(kind) = detect_engine(root, preferred) else {
        debug!(root = %root.display(), "no version control directory found");
        return None;
    };

    let binary = config.binary().unwrap_or(kind.name());
    if !tool_installed(binary) {
        info!(engine = %kind, binary, "version control tool not installed");
        return None;
    }

    info!(engine = %kind, root = %root.display(), "version control engine created");
    match kind {
        EngineKind::Git => Some(Arc::new(GitEngine::from_config(root, config))),
    }
}
