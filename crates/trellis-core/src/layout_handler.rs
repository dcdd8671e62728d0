//! Executors for background layout work.
//!
//! Engines schedule asynchronous layout through a [`LayoutHandler`] taken from
//! the item's execution policy. Holders never run layout work on a handler
//! themselves; they only carry it to the tree they build.

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};

/// Unit of work posted to a [`LayoutHandler`].
pub type LayoutTask = Box<dyn FnOnce() + Send + 'static>;

/// Runs layout tasks on behalf of an engine.
///
/// Implementations must be safe to use from multiple threads.
pub trait LayoutHandler: Send + Sync {
    /// Queues `task` for execution.
    fn post(&self, task: LayoutTask);

    /// Returns true if the caller is running on this handler's thread.
    fn is_current_thread(&self) -> bool {
        false
    }
}

/// Runs each task immediately on the posting thread.
#[derive(Clone, Copy, Debug, Default)]
pub struct InlineLayoutHandler;

impl LayoutHandler for InlineLayoutHandler {
    fn post(&self, task: LayoutTask) {
        task();
    }

    fn is_current_thread(&self) -> bool {
        true
    }
}

/// Runs tasks in order on one dedicated, named worker thread.
///
/// Dropping the handler closes the queue, lets queued tasks finish and joins
/// the worker.
pub struct ThreadLayoutHandler {
    name: String,
    sender: Option<mpsc::Sender<LayoutTask>>,
    worker: Option<JoinHandle<()>>,
}

impl ThreadLayoutHandler {
    pub fn new(name: impl Into<String>) -> std::io::Result<Self> {
        let name = name.into();
        let (sender, receiver) = mpsc::channel::<LayoutTask>();
        let thread_name = name.clone();
        let worker = thread::Builder::new().name(name.clone()).spawn(move || {
            for task in receiver {
                if panic::catch_unwind(AssertUnwindSafe(task)).is_err() {
                    log::error!("layout task panicked on {thread_name}");
                }
            }
            log::trace!("layout thread {thread_name} exiting");
        })?;
        Ok(Self {
            name,
            sender: Some(sender),
            worker: Some(worker),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl LayoutHandler for ThreadLayoutHandler {
    fn post(&self, task: LayoutTask) {
        let Some(sender) = &self.sender else {
            return;
        };
        if sender.send(task).is_err() {
            log::warn!("layout thread {} is gone, dropping task", self.name);
        }
    }

    fn is_current_thread(&self) -> bool {
        self.worker
            .as_ref()
            .is_some_and(|worker| worker.thread().id() == thread::current().id())
    }
}

impl Drop for ThreadLayoutHandler {
    fn drop(&mut self) {
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            // A task may drop the last handle from the worker itself.
            if worker.thread().id() == thread::current().id() {
                return;
            }
            if worker.join().is_err() {
                log::error!("layout thread {} panicked", self.name);
            }
        }
    }
}

impl std::fmt::Debug for ThreadLayoutHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadLayoutHandler")
            .field("name", &self.name)
            .finish()
    }
}
