//! scm::traits
//!
//! Engine trait definition for driving a version-control tool.
//!
//! # Design
//!
//! The `Engine` trait is the capability set an editor needs from its
//! version-control tool. Each method maps to one (or two, for compound
//! operations) external commands run against the project root.
//!
//! Methods are synchronous and may block on the external process. Slow
//! operations are moved off the interactive thread by
//! [`AsyncDispatcher`](super::dispatch::AsyncDispatcher), never by the
//! engine itself.
//!
//! A nonzero exit code is a normal return value, not an error. `Err` is
//! reserved for failures to run the command at all (spawn failure, I/O,
//! timeout) and for calls made without an engine.
//!
//! # Example
//!
//! ```ignore
//! use scmkit::scm::{Engine, ScmError};
//!
//! fn stage_and_commit(engine: &dyn Engine, path: &str) -> Result<bool, ScmError> {
//!     if engine.file_add(path)? != 0 {
//!         return Ok(false);
//!     }
//!     Ok(engine.commit("Add file")? == 0)
//! }
//! ```

use std::path::Path;
use std::time::Duration;

use thiserror::Error;

use super::factory::EngineKind;
use crate::core::types::{ChangeKind, Status};

/// Errors from engine operations.
#[derive(Debug, Error)]
pub enum ScmError {
    /// An operation was called on a session without an engine.
    ///
    /// Callers are expected to check `enabled()` first; seeing this
    /// error means the caller skipped that check.
    #[error("no version control engine is active")]
    NoEngine,

    /// A background operation was requested outside a Tokio runtime.
    #[error("no async runtime available for background operations")]
    NoRuntime,

    /// The shell could not be started.
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        /// The command line
        command: String,
        /// Underlying error
        source: std::io::Error,
    },

    /// Waiting for the command or reading its output failed.
    #[error("i/o error while running `{command}`: {source}")]
    Io {
        /// The command line
        command: String,
        /// Underlying error
        source: std::io::Error,
    },

    /// The command did not finish in time and was killed.
    #[error("`{command}` timed out after {timeout:?}")]
    Timeout {
        /// The command line
        command: String,
        /// The timeout that expired
        timeout: Duration,
    },

    /// The background dispatcher shut down before the operation finished.
    #[error("background dispatcher is closed")]
    DispatcherClosed,
}

impl ScmError {
    /// Check if this error means no engine was available.
    pub fn is_no_engine(&self) -> bool {
        matches!(self, ScmError::NoEngine)
    }

    /// Check if this error is a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ScmError::Timeout { .. })
    }
}

/// The capability set of a version-control engine.
///
/// One implementation exists per supported tool. Implementations must be
/// `Send + Sync` so a single engine can be shared between the interactive
/// thread and the background dispatcher.
///
/// # Exit codes
///
/// Methods returning `i32` surface the tool's exit code unchanged.
/// `-1` means the process was terminated by a signal.
pub trait Engine: Send + Sync + std::fmt::Debug {
    /// Which tool this engine drives.
    fn kind(&self) -> EngineKind;

    /// Tool name (e.g., "git").
    fn name(&self) -> &'static str {
        self.kind().name()
    }

    /// Control directory name (e.g., ".git").
    fn directory(&self) -> &'static str {
        self.kind().directory()
    }

    /// Project root every command runs in.
    fn root(&self) -> &Path;

    /// Run a shell command in the project root and return its exit code.
    fn exec(&self, command: &str) -> Result<i32, ScmError>;

    /// Run a shell command in the project root and return its stdout.
    fn exec_response(&self, command: &str) -> Result<String, ScmError>;

    /// Start tracking / stage a file.
    fn file_add(&self, path: &str) -> Result<i32, ScmError>;

    /// Remove a file from the working tree and the index.
    fn file_del(&self, path: &str) -> Result<i32, ScmError>;

    /// Move or rename a tracked file.
    fn file_move(&self, source: &str, dest: &str) -> Result<i32, ScmError>;

    /// Run the tool's human-readable status report.
    fn status(&self) -> Result<i32, ScmError>;

    /// Fetch the status of every changed file, in tool order.
    fn status_get(&self) -> Result<Vec<Status>, ScmError>;

    /// Fetch the status of a single path (`ChangeKind::None` if clean).
    fn file_status(&self, path: &str) -> Result<ChangeKind, ScmError>;

    /// Unstaged changes as a unified diff.
    fn diff(&self) -> Result<String, ScmError>;

    /// Commit the index with `message`.
    fn commit(&self, message: &str) -> Result<i32, ScmError>;

    /// Push the current branch.
    fn push(&self) -> Result<i32, ScmError>;

    /// Pull into the current branch.
    fn pull(&self) -> Result<i32, ScmError>;

    /// Set aside uncommitted changes.
    fn stash(&self) -> Result<i32, ScmError>;

    /// Add the default remote and, if that succeeds, push with upstream
    /// tracking.
    fn remote_add(&self, url: &str) -> Result<i32, ScmError>;

    /// Set the committer name and email; returns the second exit code.
    fn credentials_set(&self, name: &str, email: &str) -> Result<i32, ScmError>;

    /// Configured user name. Read once per engine and cached.
    fn remote_name_get(&self) -> Result<String, ScmError>;

    /// Configured user email. Read once per engine and cached.
    fn remote_email_get(&self) -> Result<String, ScmError>;

    /// URL of the default remote. Read once per engine and cached.
    fn remote_url_get(&self) -> Result<String, ScmError>;

    /// Whether a default remote is configured.
    fn remote_enabled(&self) -> Result<bool, ScmError> {
        Ok(!self.remote_url_get()?.is_empty())
    }
}
