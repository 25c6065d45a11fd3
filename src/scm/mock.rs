//! scm::mock
//!
//! In-memory runner and engine for deterministic testing.
//!
//! # Design
//!
//! [`MockRunner`] stands in for the shell: it records every command line
//! with its working directory and replays scripted outputs. It is used to
//! pin down the exact commands the git engine emits.
//!
//! [`MockEngine`] stands in for a whole engine: it serves a configurable
//! status list, records each verb it receives and can be told to fail or
//! to sleep. Sessions and the dispatcher are tested against it.
//!
//! Both are `Clone`, sharing state through `Arc<Mutex<...>>`, so a test can
//! keep a handle after moving a clone into the code under test.
//!
//! # Example
//!
//! ```
//! use scmkit::scm::mock::MockRunner;
//! use scmkit::scm::runner::{CommandOutput, CommandRunner};
//! use std::path::Path;
//!
//! let runner = MockRunner::new();
//! runner.respond("git status --porcelain", CommandOutput::stdout("?? a.txt\n"));
//!
//! let output = runner.run("git status --porcelain", Path::new("/repo")).unwrap();
//! assert_eq!(output.stdout, "?? a.txt\n");
//! assert_eq!(runner.count("git status --porcelain"), 1);
//! ```

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::factory::EngineKind;
use super::runner::{CommandOutput, CommandRunner};
use super::traits::{Engine, ScmError};
use crate::core::types::{ChangeKind, Status};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A command received by [`MockRunner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    /// The command line
    pub command: String,
    /// Working directory it was run in
    pub cwd: PathBuf,
}

/// Scripted command runner.
///
/// Commands without a scripted response succeed with empty output.
#[derive(Debug, Clone, Default)]
pub struct MockRunner {
    inner: Arc<Mutex<MockRunnerInner>>,
}

#[derive(Debug, Default)]
struct MockRunnerInner {
    responses: HashMap<String, VecDeque<CommandOutput>>,
    calls: Vec<RecordedCall>,
}

impl MockRunner {
    /// Create a runner with no scripted responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `output` as the next response to `command`.
    ///
    /// Responses for the same command are served in the order queued. The
    /// last one keeps being served once the queue is down to it.
    pub fn respond(&self, command: impl Into<String>, output: CommandOutput) {
        lock(&self.inner)
            .responses
            .entry(command.into())
            .or_default()
            .push_back(output);
    }

    /// Every call received, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.inner).calls.clone()
    }

    /// Every command line received, in order.
    pub fn commands(&self) -> Vec<String> {
        lock(&self.inner)
            .calls
            .iter()
            .map(|call| call.command.clone())
            .collect()
    }

    /// How many times `command` was run.
    pub fn count(&self, command: &str) -> usize {
        lock(&self.inner)
            .calls
            .iter()
            .filter(|call| call.command == command)
            .count()
    }
}

impl CommandRunner for MockRunner {
    fn run(&self, command: &str, cwd: &Path) -> Result<CommandOutput, ScmError> {
        let mut inner = lock(&self.inner);
        inner.calls.push(RecordedCall {
            command: command.to_string(),
            cwd: cwd.to_path_buf(),
        });

        let output = match inner.responses.get_mut(command) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or_default(),
            Some(queue) => queue.front().cloned().unwrap_or_default(),
            None => CommandOutput::default(),
        };
        Ok(output)
    }
}

/// How a [`MockEngine`] operation should fail.
#[derive(Debug, Clone)]
pub enum FailOn {
    /// Return this exit code from the named verb
    ExitCode(&'static str, i32),
    /// Return a timeout error from the named verb
    Timeout(&'static str),
}

/// Verb received by [`MockEngine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOperation {
    Exec { command: String },
    ExecResponse { command: String },
    FileAdd { path: String },
    FileDel { path: String },
    FileMove { source: String, dest: String },
    Status,
    StatusGet,
    FileStatus { path: String },
    Diff,
    Commit { message: String },
    Push,
    Pull,
    Stash,
    RemoteAdd { url: String },
    CredentialsSet { name: String, email: String },
    RemoteNameGet,
    RemoteEmailGet,
    RemoteUrlGet,
}

/// In-memory engine.
#[derive(Debug, Clone)]
pub struct MockEngine {
    root: PathBuf,
    inner: Arc<Mutex<MockEngineInner>>,
    running: Arc<AtomicUsize>,
    max_running: Arc<AtomicUsize>,
}

#[derive(Debug, Default)]
struct MockEngineInner {
    statuses: Vec<Status>,
    diff: String,
    user_name: String,
    user_email: String,
    remote_url: String,
    fail_on: Option<FailOn>,
    delay: Option<Duration>,
    operations: Vec<MockOperation>,
}

impl MockEngine {
    /// Create an engine for `root` reporting a clean tree.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            inner: Arc::new(Mutex::new(MockEngineInner::default())),
            running: Arc::new(AtomicUsize::new(0)),
            max_running: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Report `statuses` from `status_get`.
    pub fn with_statuses(self, statuses: Vec<Status>) -> Self {
        self.set_statuses(statuses);
        self
    }

    /// Replace the reported statuses.
    pub fn set_statuses(&self, statuses: Vec<Status>) {
        lock(&self.inner).statuses = statuses;
    }

    /// Report `diff` from `diff`.
    pub fn with_diff(self, diff: impl Into<String>) -> Self {
        lock(&self.inner).diff = diff.into();
        self
    }

    /// Report an identity and remote URL.
    pub fn with_remote(
        self,
        name: impl Into<String>,
        email: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        {
            let mut inner = lock(&self.inner);
            inner.user_name = name.into();
            inner.user_email = email.into();
            inner.remote_url = url.into();
        }
        self
    }

    /// Make one verb fail.
    ///
    /// # Example
    ///
    /// ```
    /// use scmkit::scm::mock::{FailOn, MockEngine};
    /// use scmkit::scm::Engine;
    ///
    /// let engine = MockEngine::new("/repo").fail_on(FailOn::ExitCode("push", 128));
    /// assert_eq!(engine.push().unwrap(), 128);
    /// assert_eq!(engine.pull().unwrap(), 0);
    /// ```
    pub fn fail_on(self, fail_on: FailOn) -> Self {
        lock(&self.inner).fail_on = Some(fail_on);
        self
    }

    /// Clear the failure configuration.
    pub fn clear_fail_on(&self) {
        lock(&self.inner).fail_on = None;
    }

    /// Sleep for `delay` inside every verb.
    pub fn with_delay(self, delay: Duration) -> Self {
        lock(&self.inner).delay = Some(delay);
        self
    }

    /// Every verb received, in order.
    pub fn operations(&self) -> Vec<MockOperation> {
        lock(&self.inner).operations.clone()
    }

    /// Clear recorded operations.
    pub fn clear_operations(&self) {
        lock(&self.inner).operations.clear();
    }

    /// Highest number of verbs observed running at the same time.
    pub fn max_concurrency(&self) -> usize {
        self.max_running.load(Ordering::SeqCst)
    }

    /// Record `op`, apply the configured delay and failure, and return the
    /// exit code the verb should report.
    fn enter(&self, verb: &'static str, op: MockOperation) -> Result<i32, ScmError> {
        let (delay, fail_on) = {
            let mut inner = lock(&self.inner);
            inner.operations.push(op);
            (inner.delay, inner.fail_on.clone())
        };

        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_running.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
        self.running.fetch_sub(1, Ordering::SeqCst);

        match fail_on {
            Some(FailOn::ExitCode(name, code)) if name == verb => Ok(code),
            Some(FailOn::Timeout(name)) if name == verb => Err(ScmError::Timeout {
                command: verb.to_string(),
                timeout: delay.unwrap_or_default(),
            }),
            _ => Ok(0),
        }
    }
}

impl Engine for MockEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Git
    }

    fn root(&self) -> &Path {
        &self.root
    }

    fn exec(&self, command: &str) -> Result<i32, ScmError> {
        self.enter(
            "exec",
            MockOperation::Exec {
                command: command.to_string(),
            },
        )
    }

    fn exec_response(&self, command: &str) -> Result<String, ScmError> {
        self.enter(
            "exec_response",
            MockOperation::ExecResponse {
                command: command.to_string(),
            },
        )?;
        Ok(String::new())
    }

    fn file_add(&self, path: &str) -> Result<i32, ScmError> {
        self.enter(
            "file_add",
            MockOperation::FileAdd {
                path: path.to_string(),
            },
        )
    }

    fn file_del(&self, path: &str) -> Result<i32, ScmError> {
        self.enter(
            "file_del",
            MockOperation::FileDel {
                path: path.to_string(),
            },
        )
    }

    fn file_move(&self, source: &str, dest: &str) -> Result<i32, ScmError> {
        self.enter(
            "file_move",
            MockOperation::FileMove {
                source: source.to_string(),
                dest: dest.to_string(),
            },
        )
    }

    fn status(&self) -> Result<i32, ScmError> {
        self.enter("status", MockOperation::Status)
    }

    fn status_get(&self) -> Result<Vec<Status>, ScmError> {
        self.enter("status_get", MockOperation::StatusGet)?;
        Ok(lock(&self.inner).statuses.clone())
    }

    fn file_status(&self, path: &str) -> Result<ChangeKind, ScmError> {
        self.enter(
            "file_status",
            MockOperation::FileStatus {
                path: path.to_string(),
            },
        )?;
        Ok(lock(&self.inner)
            .statuses
            .iter()
            .find(|status| status.path() == path)
            .map(Status::change)
            .unwrap_or(ChangeKind::None))
    }

    fn diff(&self) -> Result<String, ScmError> {
        self.enter("diff", MockOperation::Diff)?;
        Ok(lock(&self.inner).diff.clone())
    }

    fn commit(&self, message: &str) -> Result<i32, ScmError> {
        self.enter(
            "commit",
            MockOperation::Commit {
                message: message.to_string(),
            },
        )
    }

    fn push(&self) -> Result<i32, ScmError> {
        self.enter("push", MockOperation::Push)
    }

    fn pull(&self) -> Result<i32, ScmError> {
        self.enter("pull", MockOperation::Pull)
    }

    fn stash(&self) -> Result<i32, ScmError> {
        self.enter("stash", MockOperation::Stash)
    }

    fn remote_add(&self, url: &str) -> Result<i32, ScmError> {
        let code = self.enter(
            "remote_add",
            MockOperation::RemoteAdd {
                url: url.to_string(),
            },
        )?;
        if code == 0 {
            lock(&self.inner).remote_url = url.to_string();
        }
        Ok(code)
    }

    fn credentials_set(&self, name: &str, email: &str) -> Result<i32, ScmError> {
        self.enter(
            "credentials_set",
            MockOperation::CredentialsSet {
                name: name.to_string(),
                email: email.to_string(),
            },
        )
    }

    fn remote_name_get(&self) -> Result<String, ScmError> {
        self.enter("remote_name_get", MockOperation::RemoteNameGet)?;
        Ok(lock(&self.inner).user_name.clone())
    }

    fn remote_email_get(&self) -> Result<String, ScmError> {
        self.enter("remote_email_get", MockOperation::RemoteEmailGet)?;
        Ok(lock(&self.inner).user_email.clone())
    }

    fn remote_url_get(&self) -> Result<String, ScmError> {
        self.enter("remote_url_get", MockOperation::RemoteUrlGet)?;
        Ok(lock(&self.inner).remote_url.clone())
    }
}
