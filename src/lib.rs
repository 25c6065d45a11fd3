//! scmkit - Source-control engine for editors and IDEs
//!
//! scmkit drives an external version-control tool (git) as a subprocess,
//! decodes its porcelain status output into structured records, and runs
//! slow operations (commit, push, pull, stash, status refresh) on a
//! background worker so the interactive session never blocks.
//!
//! # Architecture
//!
//! - [`core`] - Domain types (status records) and configuration
//! - [`scm`] - Engine trait, git engine, command runner, porcelain parser,
//!   async dispatcher and the per-project [`scm::ScmSession`]
//!
//! # Invariants
//!
//! 1. At most one engine exists per open project session
//! 2. External commands never change the process working directory
//! 3. Background operations against one engine run one at a time
//! 4. A status snapshot is replaced wholesale, never mutated in place
//!
//! # Example
//!
//! ```no_run
//! use scmkit::core::config::Config;
//! use scmkit::scm::ScmSession;
//! use std::path::Path;
//!
//! let root = Path::new("/path/to/project");
//! let config = Config::load(Some(root)).unwrap();
//! let session = ScmSession::init(root, &config);
//!
//! if session.enabled() {
//!     let statuses = session.status_get().unwrap();
//!     for status in statuses.iter() {
//!         println!("{} {}", status.change(), status.path());
//!     }
//! }
//! ```

pub mod core;
pub mod scm;
