//! scm::session
//!
//! The per-project version-control context.
//!
//! # Design
//!
//! An editor opens one [`ScmSession`] per project. The session owns the
//! engine (if the project has one), the last-known status snapshot and
//! the background dispatcher. There is no process-wide state: two open
//! projects are two independent sessions.
//!
//! A session without an engine is a valid state. Its verbs return
//! [`ScmError::NoEngine`]; callers check [`ScmSession::enabled`] first.
//!
//! Quick verbs (`add`, `del`, `file_status`, ...) run on the calling
//! thread. Slow verbs (`status`, `commit`, `push`, `pull`, `stash`) are
//! queued on the dispatcher, created on first use from the ambient Tokio
//! runtime, and return an [`ScmTask`].
//!
//! # Example
//!
//! ```no_run
//! use scmkit::core::config::Config;
//! use scmkit::scm::ScmSession;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let root = std::path::Path::new("/path/to/project");
//! let config = Config::load(Some(root))?;
//! let session = ScmSession::init(root, &config);
//!
//! if session.enabled() {
//!     session.add("src/main.rs")?;
//!     let code = session.commit("Add entry point")?.await?;
//!     println!("commit exited with {code}");
//! }
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use tokio::runtime::Handle;
use tracing::{debug, info};

use super::avatar::avatar_url_with_base;
use super::dispatch::{AsyncDispatcher, ScmTask};
use super::factory::{create_engine, detect_engine, EngineKind};
use super::snapshot::{StatusSnapshot, StatusStore};
use super::traits::{Engine, ScmError};
use crate::core::config::{Config, DEFAULT_AVATAR_BASE_URL};
use crate::core::types::{ChangeKind, Status};

/// Version-control state of one open project.
#[derive(Debug)]
pub struct ScmSession {
    root: PathBuf,
    engine: Option<Arc<dyn Engine>>,
    initialized: bool,
    control_path: OnceCell<PathBuf>,
    statuses: Arc<StatusStore>,
    dispatcher: OnceCell<AsyncDispatcher>,
    avatar_base_url: String,
}

impl ScmSession {
    /// Open the session for the project at `root`.
    ///
    /// Never fails: a project without a repository, or a machine without
    /// the tool, gives a session with no engine.
    pub fn init(root: impl Into<PathBuf>, config: &Config) -> Self {
        let root = root.into();
        let initialized = detect_engine(&root, EngineKind::parse(config.engine())).is_some();
        let engine = create_engine(&root, config);

        Self {
            initialized,
            engine,
            avatar_base_url: config.avatar_base_url().to_string(),
            ..Self::disabled(root)
        }
    }

    /// A session with no engine.
    pub fn disabled(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            engine: None,
            initialized: false,
            control_path: OnceCell::new(),
            statuses: Arc::new(StatusStore::new()),
            dispatcher: OnceCell::new(),
            avatar_base_url: DEFAULT_AVATAR_BASE_URL.to_string(),
        }
    }

    /// A session driving an already constructed engine.
    pub fn with_engine(engine: Arc<dyn Engine>) -> Self {
        let root = engine.root().to_path_buf();
        let initialized = root.join(engine.directory()).exists();
        Self {
            initialized,
            engine: Some(engine),
            ..Self::disabled(root)
        }
    }

    /// Project root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The engine, if the project has one.
    pub fn engine(&self) -> Option<&Arc<dyn Engine>> {
        self.engine.as_ref()
    }

    /// Whether a control directory was found when the session was opened.
    pub fn initialized(&self) -> bool {
        self.initialized
    }

    /// Absolute path of the control directory.
    ///
    /// Resolved on first call and cached for the session.
    pub fn control_path(&self) -> Option<&Path> {
        let engine = self.engine.as_ref()?;
        let path = self.control_path.get_or_init(|| {
            let path = self.root.join(engine.directory());
            std::fs::canonicalize(&path).unwrap_or(path)
        });
        Some(path.as_path())
    }

    /// Whether version control is usable right now.
    ///
    /// Checks the control directory on disk on every call, so deleting it
    /// while the project is open disables the session.
    pub fn enabled(&self) -> bool {
        self.initialized && self.control_path().is_some_and(Path::exists)
    }

    /// Release the engine, the dispatcher and the status snapshot.
    ///
    /// Operations already queued on the dispatcher still finish.
    pub fn shutdown(&mut self) {
        let Some(engine) = self.engine.take() else {
            return;
        };
        self.dispatcher.take();
        self.control_path.take();
        self.statuses.clear();
        info!(engine = engine.name(), root = %self.root.display(), "version control session shut down");
    }

    fn require(&self) -> Result<&Arc<dyn Engine>, ScmError> {
        self.engine.as_ref().ok_or(ScmError::NoEngine)
    }

    /// Run a shell command in the project root; returns its exit code.
    pub fn exec(&self, command: &str) -> Result<i32, ScmError> {
        self.require()?.exec(command)
    }

    /// Run a shell command in the project root; returns its stdout.
    pub fn exec_response(&self, command: &str) -> Result<String, ScmError> {
        self.require()?.exec_response(command)
    }

    /// Stage a file.
    pub fn add(&self, path: &str) -> Result<i32, ScmError> {
        self.require()?.file_add(path)
    }

    /// Remove a file.
    pub fn del(&self, path: &str) -> Result<i32, ScmError> {
        self.require()?.file_del(path)
    }

    /// Move or rename a file.
    pub fn move_file(&self, source: &str, dest: &str) -> Result<i32, ScmError> {
        self.require()?.file_move(source, dest)
    }

    /// Run the tool's human-readable status; returns its exit code.
    pub fn status_report(&self) -> Result<i32, ScmError> {
        self.require()?.status()
    }

    /// Refresh the status snapshot on the calling thread and return it.
    pub fn status_get(&self) -> Result<Arc<[Status]>, ScmError> {
        let engine = self.require()?;
        refresh(engine.as_ref(), &self.statuses)
    }

    /// Status of one path.
    pub fn file_status(&self, path: &str) -> Result<ChangeKind, ScmError> {
        self.require()?.file_status(path)
    }

    /// Unstaged changes as a unified diff.
    pub fn diff(&self) -> Result<String, ScmError> {
        self.require()?.diff()
    }

    /// Add the default remote and push with upstream tracking.
    pub fn remote_add(&self, url: &str) -> Result<i32, ScmError> {
        self.require()?.remote_add(url)
    }

    /// Set the committer identity.
    pub fn credentials_set(&self, name: &str, email: &str) -> Result<i32, ScmError> {
        self.require()?.credentials_set(name, email)
    }

    /// Configured user name (cached for the session).
    pub fn remote_name_get(&self) -> Result<String, ScmError> {
        self.require()?.remote_name_get()
    }

    /// Configured user email (cached for the session).
    pub fn remote_email_get(&self) -> Result<String, ScmError> {
        self.require()?.remote_email_get()
    }

    /// Default remote URL (cached for the session).
    pub fn remote_url_get(&self) -> Result<String, ScmError> {
        self.require()?.remote_url_get()
    }

    /// Whether the project has a default remote.
    ///
    /// `false` without an engine or when the URL cannot be read.
    pub fn remote_enabled(&self) -> bool {
        self.engine
            .as_ref()
            .is_some_and(|engine| engine.remote_enabled().unwrap_or(false))
    }

    /// The last published status records.
    pub fn statuses(&self) -> Arc<[Status]> {
        self.statuses.records()
    }

    /// The last published status snapshot, with its generation and time.
    pub fn status_snapshot(&self) -> StatusSnapshot {
        self.statuses.snapshot()
    }

    /// Avatar URL for `email`, using the configured avatar service.
    pub fn avatar_url(&self, email: &str) -> Option<String> {
        avatar_url_with_base(email, &self.avatar_base_url)
    }

    fn dispatcher(&self) -> Result<&AsyncDispatcher, ScmError> {
        self.dispatcher.get_or_try_init(|| {
            let handle = Handle::try_current().map_err(|_| ScmError::NoRuntime)?;
            debug!(root = %self.root.display(), "starting background dispatcher");
            Ok(AsyncDispatcher::spawn(&handle))
        })
    }

    fn submit<T, F>(&self, op: &'static str, f: F) -> Result<ScmTask<T>, ScmError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn Engine) -> Result<T, ScmError> + Send + 'static,
    {
        let engine = Arc::clone(self.require()?);
        let dispatcher = self.dispatcher()?;
        Ok(dispatcher.submit(op, move || f(engine.as_ref())))
    }

    /// Refresh the status snapshot in the background.
    ///
    /// The task resolves to the records published by this refresh, or to
    /// newer ones if a later refresh finished first.
    pub fn status(&self) -> Result<ScmTask<Arc<[Status]>>, ScmError> {
        let statuses = Arc::clone(&self.statuses);
        self.submit("status", move |engine| refresh(engine, &statuses))
    }

    /// Commit the index in the background.
    pub fn commit(&self, message: impl Into<String>) -> Result<ScmTask<i32>, ScmError> {
        let message = message.into();
        self.submit("commit", move |engine| engine.commit(&message))
    }

    /// Push in the background.
    pub fn push(&self) -> Result<ScmTask<i32>, ScmError> {
        self.submit("push", |engine| engine.push())
    }

    /// Pull in the background.
    pub fn pull(&self) -> Result<ScmTask<i32>, ScmError> {
        self.submit("pull", |engine| engine.pull())
    }

    /// Stash in the background.
    pub fn stash(&self) -> Result<ScmTask<i32>, ScmError> {
        self.submit("stash", |engine| engine.stash())
    }
}

/// Fetch statuses under a fresh ticket and publish them.
fn refresh(engine: &dyn Engine, store: &StatusStore) -> Result<Arc<[Status]>, ScmError> {
    let ticket = store.begin();
    let records = engine.status_get()?;
    store.publish(ticket, records);
    Ok(store.records())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scm::mock::{FailOn, MockEngine, MockOperation};
    use tempfile::TempDir;

    fn repo() -> TempDir {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join(".git")).unwrap();
        temp
    }

    fn session(engine: &MockEngine) -> ScmSession {
        ScmSession::with_engine(Arc::new(engine.clone()))
    }

    #[test]
    fn disabled_session_rejects_verbs() {
        let session = ScmSession::disabled("/nowhere");

        assert!(!session.enabled());
        assert!(!session.initialized());
        assert!(session.engine().is_none());
        assert!(session.control_path().is_none());
        assert!(!session.remote_enabled());

        assert!(session.add("a").unwrap_err().is_no_engine());
        assert!(session.exec("true").unwrap_err().is_no_engine());
        assert!(session.status_get().unwrap_err().is_no_engine());
        assert!(session.file_status("a").unwrap_err().is_no_engine());
        assert!(session.remote_url_get().unwrap_err().is_no_engine());
        assert!(session.commit("msg").unwrap_err().is_no_engine());
    }

    #[test]
    fn init_without_repository() {
        let temp = TempDir::new().unwrap();
        let session = ScmSession::init(temp.path(), &Config::default());

        assert!(!session.initialized());
        assert!(!session.enabled());
        assert!(session.engine().is_none());
    }

    #[test]
    fn enabled_follows_control_directory() {
        let temp = repo();
        let session = session(&MockEngine::new(temp.path()));

        assert!(session.initialized());
        assert!(session.enabled());

        std::fs::remove_dir(temp.path().join(".git")).unwrap();
        assert!(!session.enabled());
    }

    #[test]
    fn control_path_is_absolute_and_cached() {
        let temp = repo();
        let session = session(&MockEngine::new(temp.path()));

        let path = session.control_path().unwrap().to_path_buf();
        assert!(path.is_absolute());
        assert!(path.ends_with(".git"));
        assert_eq!(session.control_path().unwrap(), path);
    }

    #[test]
    fn status_get_publishes_snapshot() {
        let temp = repo();
        let engine = MockEngine::new(temp.path()).with_statuses(vec![
            Status::new("a.rs", ChangeKind::Untracked),
            Status::new("b.rs", ChangeKind::ModifiedStaged),
        ]);
        let session = session(&engine);

        assert!(session.statuses().is_empty());
        let first = session.status_get().unwrap();
        let second = session.status_get().unwrap();

        assert_eq!(first, second);
        assert_eq!(session.statuses().len(), 2);
        assert_eq!(session.status_snapshot().generation, 2);
    }

    #[test]
    fn verbs_reach_engine() {
        let temp = repo();
        let engine = MockEngine::new(temp.path());
        let session = session(&engine);

        session.add("a.rs").unwrap();
        session.del("b.rs").unwrap();
        session.move_file("c.rs", "d.rs").unwrap();
        session.status_report().unwrap();
        session.credentials_set("Ada", "ada@example.com").unwrap();

        assert_eq!(
            engine.operations(),
            vec![
                MockOperation::FileAdd {
                    path: "a.rs".into()
                },
                MockOperation::FileDel {
                    path: "b.rs".into()
                },
                MockOperation::FileMove {
                    source: "c.rs".into(),
                    dest: "d.rs".into()
                },
                MockOperation::Status,
                MockOperation::CredentialsSet {
                    name: "Ada".into(),
                    email: "ada@example.com".into()
                },
            ]
        );
    }

    #[test]
    fn remote_enabled_swallows_errors() {
        let temp = repo();
        let engine = MockEngine::new(temp.path())
            .with_remote("Ada", "ada@example.com", "https://example.com/r.git")
            .fail_on(FailOn::Timeout("remote_url_get"));
        let session = session(&engine);

        assert!(!session.remote_enabled());
        engine.clear_fail_on();
        assert!(session.remote_enabled());
    }

    #[test]
    fn async_verbs_need_a_runtime() {
        let temp = repo();
        let session = session(&MockEngine::new(temp.path()));

        assert!(matches!(session.push(), Err(ScmError::NoRuntime)));
    }

    #[tokio::test]
    async fn async_commit_runs_on_engine() {
        let temp = repo();
        let engine = MockEngine::new(temp.path()).fail_on(FailOn::ExitCode("commit", 1));
        let session = session(&engine);

        let code = session.commit("Initial").unwrap().await.unwrap();

        assert_eq!(code, 1);
        assert_eq!(
            engine.operations(),
            vec![MockOperation::Commit {
                message: "Initial".into()
            }]
        );
    }

    #[tokio::test]
    async fn async_status_refreshes_snapshot() {
        let temp = repo();
        let engine = MockEngine::new(temp.path())
            .with_statuses(vec![Status::new("new.rs", ChangeKind::Untracked)]);
        let session = session(&engine);

        let records = session.status().unwrap().await.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(session.statuses()[0].path(), "new.rs");
        assert!(session.status_snapshot().refreshed_at.is_some());
    }

    #[tokio::test]
    async fn async_verbs_keep_order() {
        let temp = repo();
        let engine = MockEngine::new(temp.path());
        let session = session(&engine);

        let stash = session.stash().unwrap();
        let pull = session.pull().unwrap();
        let push = session.push().unwrap();
        stash.await.unwrap();
        pull.await.unwrap();
        push.await.unwrap();

        assert_eq!(
            engine.operations(),
            vec![
                MockOperation::Stash,
                MockOperation::Pull,
                MockOperation::Push
            ]
        );
    }

    #[test]
    fn shutdown_releases_engine() {
        let temp = repo();
        let engine = MockEngine::new(temp.path())
            .with_statuses(vec![Status::new("a.rs", ChangeKind::Modified)]);
        let mut session = session(&engine);
        session.status_get().unwrap();

        session.shutdown();

        assert!(session.engine().is_none());
        assert!(!session.enabled());
        assert!(session.statuses().is_empty());
        assert!(session.add("a.rs").unwrap_err().is_no_engine());

        // Second shutdown is a no-op.
        session.shutdown();
    }

    #[test]
    fn avatar_uses_configured_base() {
        let session = ScmSession::disabled("/nowhere");
        assert_eq!(
            session.avatar_url("a@b.com").as_deref(),
            Some("http://www.gravatar.com/avatar/357a20e8c56e69d6f9734d23ef9517e8")
        );
        assert_eq!(session.avatar_url(""), None);
    }
}
