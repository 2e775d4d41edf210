use super::builder::ThreadPoolBuilder;
use super::job::Job;
use super::worker::Worker;
use super::WorkItem;
use crate::error::{Error, ErrorHook, Outcome};
use crate::runtime::scheduler::TaskScheduler;
use crate::sync::completion::Completion;

use crossbeam::channel::{self, Sender, TrySendError};
use parking_lot::Mutex;

use std::fmt;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// A fixed set of worker threads for blocking or CPU-heavy work.
///
/// The `ThreadPool` is responsible for:
/// - spawning worker threads, each with its own cooperative scheduler,
/// - queueing submitted work in FIFO order,
/// - handing back a [`Job`] that the submitting side can await,
/// - orderly shutdown and thread joining.
///
/// Work never runs on the submitting thread. A failing or panicking item
/// fails its job and leaves the worker running.
///
/// # Examples
///
/// ```rust,ignore
/// let pool = ThreadPool::new(2, |_| {})?;
/// let job = pool.submit(|| Ok(40 + 2))?;
///
/// let task = Task::new(async move { await_on(job).await });
/// ```
pub struct ThreadPool {
    /// Producer side of the submission queue; `None` once closed.
    sender: Mutex<Option<Sender<WorkItem>>>,

    /// Join handles of the worker threads.
    handles: Mutex<Vec<JoinHandle<()>>>,

    /// Receives job failures nobody observed.
    hook: ErrorHook,

    size: usize,
}

impl ThreadPool {
    /// Starts `size` workers, each running `bootstrap` once with its own
    /// scheduler before servicing the queue.
    ///
    /// # Panics
    ///
    /// Panics if `size` is zero.
    pub fn new<F>(size: usize, bootstrap: F) -> io::Result<Self>
    where
        F: Fn(&TaskScheduler) + Send + Sync + 'static,
    {
        ThreadPoolBuilder::new()
            .size(size)
            .bootstrap(bootstrap)
            .build()
    }

    /// Returns a builder to configure a pool.
    pub fn builder() -> ThreadPoolBuilder {
        ThreadPoolBuilder::new()
    }

    pub(crate) fn spawn(builder: ThreadPoolBuilder) -> io::Result<Self> {
        let (sender, receiver) = match builder.capacity {
            Some(capacity) => channel::bounded(capacity),
            None => channel::unbounded(),
        };

        let pool = Self {
            sender: Mutex::new(Some(sender)),
            handles: Mutex::new(Vec::with_capacity(builder.size)),
            hook: builder.hook.clone(),
            size: builder.size,
        };

        for id in 0..builder.size {
            let worker = Worker::new(
                id,
                receiver.clone(),
                builder.bootstrap.clone(),
                builder.hook.clone(),
            );

            // On error, dropping `pool` closes and joins what was started.
            let handle = thread::Builder::new()
                .name(format!("{}-{id}", builder.name))
                .spawn(move || worker.run())?;

            pool.handles.lock().push(handle);
        }

        tracing::debug!(size = builder.size, "thread pool started");
        Ok(pool)
    }

    /// Queues `work` and returns a job observing its result.
    ///
    /// Returns immediately; the work runs later on some worker thread.
    /// A panic inside `work` fails the job with [`Error::Panicked`].
    ///
    /// # Errors
    ///
    /// - [`Error::PoolClosed`] if the pool has been closed,
    /// - [`Error::QueueFull`] if the queue is bounded and full.
    pub fn submit<F, T>(&self, work: F) -> Result<Job<T>, Error>
    where
        F: FnOnce() -> Outcome<T> + Send + 'static,
        T: Clone + Send + 'static,
    {
        let completion = Arc::new(Completion::new(self.hook.clone()));
        let job = Job {
            completion: completion.clone(),
        };

        let item: WorkItem = Box::new(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(work))
                .unwrap_or_else(|payload| Err(Error::from_panic(payload)));

            match &outcome {
                Ok(_) => tracing::trace!("job completed"),
                Err(error) => tracing::debug!(%error, "job failed"),
            }

            completion.complete(outcome);
        });

        let sender = self.sender.lock();
        let Some(sender) = sender.as_ref() else {
            return Err(Error::PoolClosed);
        };

        match sender.try_send(item) {
            Ok(()) => Ok(job),
            Err(TrySendError::Full(_)) => Err(Error::QueueFull),
            Err(TrySendError::Disconnected(_)) => Err(Error::PoolClosed),
        }
    }

    /// Stops accepting work and waits for the workers to finish.
    ///
    /// Items already queued still run. Calling `close` again is a no-op.
    /// When called from one of the pool's own workers, that worker is not
    /// joined.
    pub fn close(&self) {
        let sender = self.sender.lock().take();

        if sender.is_none() {
            return;
        }

        drop(sender);

        let handles: Vec<_> = self.handles.lock().drain(..).collect();
        let current = thread::current().id();

        for handle in handles {
            if handle.thread().id() == current {
                continue;
            }

            if handle.join().is_err() {
                tracing::error!("worker thread panicked");
            }
        }

        tracing::debug!("thread pool closed");
    }

    /// Returns `true` once [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.sender.lock().is_none()
    }

    /// Number of worker threads.
    pub fn size(&self) -> usize {
        self.size
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for ThreadPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadPool")
            .field("size", &self.size)
            .field("closed", &self.is_closed())
            .finish()
    }
}
