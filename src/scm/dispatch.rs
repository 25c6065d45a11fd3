//! scm::dispatch
//!
//! Background execution of slow engine operations.
//!
//! # Design
//!
//! One [`AsyncDispatcher`] exists per session. It owns a single worker
//! task reading jobs from an unbounded queue; each job runs on Tokio's
//! blocking pool and is awaited before the next one starts. Operations
//! against one engine therefore never overlap and complete in submission
//! order, while the submitting thread returns immediately.
//!
//! Every job reports back through its own [`ScmTask`], which can be
//! awaited or waited on from a plain thread.
//!
//! Dropping the dispatcher closes the queue. Jobs already queued still
//! run; submissions after that resolve to [`ScmError::DispatcherClosed`].
//!
//! # Example
//!
//! ```no_run
//! use scmkit::scm::AsyncDispatcher;
//!
//! # async fn demo() {
//! let dispatcher = AsyncDispatcher::spawn(&tokio::runtime::Handle::current());
//! let task = dispatcher.submit("answer", || Ok(42));
//! assert_eq!(task.await.unwrap(), 42);
//! # }
//! ```

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info_span, warn};
use uuid::Uuid;

use super::traits::ScmError;

type Job = Box<dyn FnOnce() + Send + 'static>;

struct Queued {
    id: Uuid,
    op: &'static str,
    job: Job,
}

/// Serial background executor for engine operations.
#[derive(Debug)]
pub struct AsyncDispatcher {
    sender: mpsc::UnboundedSender<Queued>,
}

impl AsyncDispatcher {
    /// Start the worker on `handle`.
    pub fn spawn(handle: &Handle) -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<Queued>();

        handle.spawn(async move {
            while let Some(Queued { id, op, job }) = receiver.recv().await {
                let span = info_span!("scm_op", op, %id);
                let result = tokio::task::spawn_blocking(move || {
                    let _entered = span.enter();
                    debug!("background operation started");
                    job();
                })
                .await;

                if let Err(err) = result {
                    warn!(op, %id, error = %err, "background operation panicked");
                }
            }
            debug!("dispatcher queue closed");
        });

        Self { sender }
    }

    /// Queue `f` to run after every previously submitted operation.
    ///
    /// `op` names the operation in logs.
    pub fn submit<T, F>(&self, op: &'static str, f: F) -> ScmTask<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, ScmError> + Send + 'static,
    {
        let (tx, receiver) = oneshot::channel();
        let id = Uuid::new_v4();
        let job: Job = Box::new(move || {
            // The caller may have dropped its task; nobody is left to tell.
            let _ = tx.send(f());
        });

        // A closed queue drops the job and with it `tx`, so the task
        // resolves to DispatcherClosed.
        if self.sender.send(Queued { id, op, job }).is_err() {
            debug!(op, %id, "dispatcher closed, operation not queued");
        }

        ScmTask { id, op, receiver }
    }

    /// Whether the worker is still accepting operations.
    pub fn is_open(&self) -> bool {
        !self.sender.is_closed()
    }
}

/// Handle to the result of a background operation.
///
/// Dropping the handle does not cancel the operation.
#[derive(Debug)]
pub struct ScmTask<T> {
    id: Uuid,
    op: &'static str,
    receiver: oneshot::Receiver<Result<T, ScmError>>,
}

impl<T> ScmTask<T> {
    /// Unique id of this operation (also recorded in logs).
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Operation name.
    pub fn op(&self) -> &'static str {
        self.op
    }

    /// Block the current thread until the operation finishes.
    ///
    /// Must not be called from inside an async context; `.await` the task
    /// there instead.
    pub fn blocking_wait(self) -> Result<T, ScmError> {
        self.receiver
            .blocking_recv()
            .unwrap_or(Err(ScmError::DispatcherClosed))
    }
}

impl<T> Future for ScmTask<T> {
    type Output = Result<T, ScmError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|result| result.unwrap_or(Err(ScmError::DispatcherClosed)))
    }
}
