//! The presentation context: a single named thread that owns every
//! observable cache.
//!
//! Background work never touches a cache directly. It hands a closure to
//! [`PresentationContext::invoke`], which queues it on the thread and
//! resolves once the closure has run there. Jobs run one at a time in
//! submission order.

use crate::error::{StoreError, StoreResult};
use parking_lot::Mutex;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::thread::{self, JoinHandle, ThreadId};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info};

type Job = Box<dyn FnOnce() + Send + 'static>;

pub struct PresentationContext {
    name: String,
    thread_id: ThreadId,
    jobs: Mutex<Option<mpsc::UnboundedSender<Job>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl PresentationContext {
    /// Starts the context thread.
    pub fn spawn(name: impl Into<String>) -> StoreResult<Self> {
        let name = name.into();
        let (jobs_tx, jobs_rx) = mpsc::unbounded_channel();

        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || run_jobs(jobs_rx))
            .map_err(StoreError::ContextStart)?;

        info!(context = %name, "Presentation context started");
        Ok(Self {
            name,
            thread_id: handle.thread().id(),
            jobs: Mutex::new(Some(jobs_tx)),
            handle: Mutex::new(Some(handle)),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Queues `job` without waiting for it.
    pub fn run_later<F>(&self, job: F) -> StoreResult<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let jobs = self.jobs.lock();
        let sender = jobs.as_ref().ok_or(StoreError::ContextClosed)?;
        sender
            .send(Box::new(job))
            .map_err(|_| StoreError::ContextClosed)
    }

    /// Runs `f` on the context thread and returns its result.
    ///
    /// Must not be awaited from the context thread itself.
    pub async fn invoke<F, R>(&self, f: F) -> StoreResult<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let (result_tx, result_rx) = oneshot::channel();
        self.run_later(move || {
            let _ = result_tx.send(f());
        })?;
        result_rx
            .await
            .map_err(|_| StoreError::TaskFailed("presentation job panicked".to_string()))
    }

    /// True when called from the context thread.
    pub fn is_current(&self) -> bool {
        thread::current().id() == self.thread_id
    }

    pub fn ensure_current(&self) -> StoreResult<()> {
        if self.is_current() {
            Ok(())
        } else {
            Err(StoreError::WrongContext)
        }
    }

    /// Stops accepting jobs, lets queued jobs finish and joins the thread.
    /// Idempotent.
    pub fn shutdown(&self) {
        let sender = self.jobs.lock().take();
        if sender.is_none() {
            return;
        }
        drop(sender);

        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            if self.is_current() {
                // Joining ourselves would deadlock; the loop ends once the
                // queue drains.
                return;
            }
            if handle.join().is_err() {
                error!(context = %self.name, "Presentation thread panicked");
            }
        }
        info!(context = %self.name, "Presentation context stopped");
    }
}

impl Drop for PresentationContext {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for PresentationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresentationContext")
            .field("name", &self.name)
            .field("thread_id", &self.thread_id)
            .finish()
    }
}

fn run_jobs(mut jobs: mpsc::UnboundedReceiver<Job>) {
    while let Some(job) = jobs.blocking_recv() {
        if catch_unwind(AssertUnwindSafe(job)).is_err() {
            error!("Presentation job panicked");
        }
    }
    debug!("Presentation job queue closed");
}
