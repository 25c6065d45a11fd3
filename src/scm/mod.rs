//! scm
//!
//! Abstraction over external version-control tools.
//!
//! # Architecture
//!
//! The `Engine` trait defines what an editor can ask of its version-control
//! tool. Sessions obtain an engine from the [`create_engine`] factory rather
//! than constructing [`GitEngine`] directly, and everything above the
//! factory works with `dyn Engine`.
//!
//! - Every command runs with the project root as the child's working
//!   directory; the process directory is never changed
//! - A nonzero exit code is a result, not an error
//! - Background operations of one session run one at a time
//!
//! # Modules
//!
//! - `traits`: Core `Engine` trait and `ScmError`
//! - `factory`: Engine detection and creation
//! - [`git`]: The git engine
//! - [`runner`]: Shell command execution with timeouts
//! - [`porcelain`]: Porcelain status decoder
//! - [`dispatch`]: Serial background executor
//! - [`snapshot`]: Shared status snapshot
//! - [`avatar`]: Gravatar URLs
//! - `session`: The per-project [`ScmSession`]
//! - [`mock`]: Mock runner and engine for deterministic testing
//!
//! # Example
//!
//! ```no_run
//! use scmkit::core::config::Config;
//! use scmkit::scm::ScmSession;
//!
//! let config = Config::load(None).unwrap();
//! let session = ScmSession::init("/path/to/project", &config);
//! if session.enabled() {
//!     println!("{}", session.diff().unwrap());
//! }
//! ```

pub mod avatar;
pub mod dispatch;
mod factory;
pub mod git;
pub mod mock;
pub mod porcelain;
pub mod runner;
mod session;
pub mod snapshot;
mod traits;

pub use avatar::avatar_url;
pub use dispatch::{AsyncDispatcher, ScmTask};
pub use factory::{create_engine, detect_engine, tool_installed, valid_engine_names, EngineKind};
pub use git::{clone_repository, init_repository, GitEngine, GitSettings};
pub use runner::{CommandOutput, CommandRunner, ShellRunner};
pub use session::ScmSession;
pub use snapshot::{StatusSnapshot, StatusStore};
pub use traits::*;
