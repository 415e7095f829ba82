//! Elastic thread pool.
//!
//! The pool keeps a floor of persistent workers (the low watermark) and
//! grows on demand up to a ceiling (the high watermark). Workers spawned
//! above the floor are *elastic*: when one of them waits `idle_time` with
//! nothing to do, it exits, shrinking the pool back towards the floor.
//!
//! # Lifecycle
//!
//! ```text
//!            start()            stop()          last worker exits
//!   Init ───────────▶ Run ───────────▶ Stopping ───────────▶ Stopped
//! ```
//!
//! Submission is gated on the `Run` state; dispatch is not. Tasks accepted
//! before `stop()` keep draining during `Stopping`, so an accepted task is
//! never dropped. `stop(true)` returns only after the last worker has
//! exited, which is also the moment the pool reaches `Stopped` — the final
//! transition is always driven by the exiting worker, never by `stop()`
//! racing ahead of it.
//!
//! # Submission
//!
//! [`ThreadPool::execute`] is non-blocking: it returns `false` when the
//! pool is not running or the queue is over its limit, `true` once the
//! task is queued. When every existing worker is busy and the ceiling
//! allows it, the submission also spawns one elastic worker.
//!
//! A task is a plain `FnOnce()`; the pool carries no completion results.
//! A panicking task is caught and logged, and its worker keeps going.
//!
//! # Example
//!
//! ```
//! use bytecache::ThreadPool;
//! use bytecache::config::PoolConfig;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let pool = ThreadPool::new(PoolConfig::new(2, 4, 64, Duration::from_millis(50))).unwrap();
//! pool.start();
//!
//! let counter = Arc::new(AtomicUsize::new(0));
//! for _ in 0..8 {
//!     let counter = Arc::clone(&counter);
//!     assert!(pool.execute(move || {
//!         counter.fetch_add(1, Ordering::SeqCst);
//!     }));
//! }
//!
//! pool.stop(true);
//! assert_eq!(counter.load(Ordering::SeqCst), 8);
//! assert!(!pool.execute(|| {}));
//! ```

use crate::config::{ConfigError, PoolConfig};

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, error, info};

/// A queued unit of work: no inputs, no result.
type Task = Box<dyn FnOnce() + Send + 'static>;

/// Pool lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolState {
    /// Constructed, no workers yet.
    Init,
    /// Accepting and executing tasks.
    Run,
    /// Draining: no new tasks, queued ones still run.
    Stopping,
    /// All workers have exited. Terminal.
    Stopped,
}

/// Everything the workers share, guarded by one mutex.
struct PoolInner {
    state: PoolState,
    queue: VecDeque<Task>,
    /// Workers created and not yet exited.
    existing: usize,
    /// Workers currently running a task (not waiting).
    busy: usize,
}

struct PoolShared {
    inner: Mutex<PoolInner>,
    /// Signalled when a task is queued or the state leaves `Run`.
    task_available: Condvar,
    /// Signalled by the last exiting worker.
    all_exited: Condvar,
    config: PoolConfig,
}

/// An elastic pool of detached worker threads.
///
/// Worker threads are never joined; shutdown correctness rests on the
/// `existing` counter reaching zero and the exiting worker signalling the
/// shutdown condition. See the module docs for the state machine.
pub struct ThreadPool {
    shared: Arc<PoolShared>,
}

impl ThreadPool {
    /// Creates a pool in the `Init` state.
    ///
    /// Fails when the watermarks are invalid (`0 < low <= high`).
    pub fn new(config: PoolConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(ThreadPool {
            shared: Arc::new(PoolShared {
                inner: Mutex::new(PoolInner {
                    state: PoolState::Init,
                    queue: VecDeque::new(),
                    existing: 0,
                    busy: 0,
                }),
                task_available: Condvar::new(),
                all_exited: Condvar::new(),
                config,
            }),
        })
    }

    /// Transitions `Init` → `Run` and spawns the persistent workers.
    ///
    /// Does nothing when the pool has already been started or stopped.
    pub fn start(&self) {
        let mut inner = self.shared.inner.lock();
        if inner.state != PoolState::Init {
            return;
        }
        inner.state = PoolState::Run;
        inner.existing = self.shared.config.low_watermark;
        info!(
            workers = self.shared.config.low_watermark,
            "thread pool starting"
        );
        for _ in 0..self.shared.config.low_watermark {
            spawn_worker(Arc::clone(&self.shared), true);
        }
    }

    /// Queues a task for execution.
    ///
    /// Returns `false` without queueing when the pool is not in `Run` or
    /// the queue is over `max_queue_size`. On acceptance, a submission that
    /// finds every worker busy spawns one elastic worker (up to the high
    /// watermark) and one waiting worker is woken.
    ///
    /// The task runs at most once; `true` means it will run before
    /// `stop(true)` returns.
    pub fn execute<F>(&self, task: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        {
            let mut inner = self.shared.inner.lock();
            if inner.state != PoolState::Run
                || inner.queue.len() > self.shared.config.max_queue_size
            {
                debug!(state = ?inner.state, queued = inner.queue.len(), "submission rejected");
                return false;
            }

            inner.queue.push_back(Box::new(task));

            // Grow only when nobody could pick the task up promptly.
            if inner.busy == inner.existing && inner.existing < self.shared.config.high_watermark {
                inner.existing += 1;
                spawn_worker(Arc::clone(&self.shared), false);
            }
        }
        self.shared.task_available.notify_one();
        true
    }

    /// Stops accepting tasks and lets the queue drain.
    ///
    /// With `wait` set, blocks until every worker has exited; at that point
    /// no task is queued or running. Without it, the transition to
    /// `Stopped` happens asynchronously when the last worker leaves.
    pub fn stop(&self, wait: bool) {
        let mut inner = self.shared.inner.lock();
        if inner.state == PoolState::Stopped {
            return;
        }
        inner.state = PoolState::Stopping;
        info!(queued = inner.queue.len(), "thread pool stopping");

        if inner.existing == 0 {
            inner.state = PoolState::Stopped;
            return;
        }

        self.shared.task_available.notify_all();
        if wait {
            while inner.state != PoolState::Stopped {
                self.shared.all_exited.wait(&mut inner);
            }
        }
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> PoolState {
        self.shared.inner.lock().state
    }

    /// Returns the number of workers that exist right now.
    pub fn workers(&self) -> usize {
        self.shared.inner.lock().existing
    }

    /// Returns the number of workers currently running a task.
    pub fn busy_workers(&self) -> usize {
        self.shared.inner.lock().busy
    }

    /// Returns the number of queued, not-yet-dispatched tasks.
    pub fn queued_tasks(&self) -> usize {
        self.shared.inner.lock().queue.len()
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.stop(true);
    }
}

impl std::fmt::Debug for ThreadPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.shared.inner.lock();
        f.debug_struct("ThreadPool")
            .field("state", &inner.state)
            .field("existing", &inner.existing)
            .field("busy", &inner.busy)
            .field("queued", &inner.queue.len())
            .finish()
    }
}

/// Spawns a detached worker. The caller has already counted it in
/// `existing`.
fn spawn_worker(shared: Arc<PoolShared>, persistent: bool) {
    thread::spawn(move || {
        debug!(persistent, "worker started");
        run_worker(&shared, persistent);
        debug!(persistent, "worker exiting");
    });
}

/// The worker loop. Holds the pool mutex except while running a task.
fn run_worker(shared: &PoolShared, persistent: bool) {
    let mut inner = shared.inner.lock();

    'work: loop {
        // Wait for work while the pool runs and the queue is empty.
        while inner.state == PoolState::Run && inner.queue.is_empty() {
            let deadline = Instant::now() + shared.config.idle_time;
            let timed_out = shared
                .task_available
                .wait_until(&mut inner, deadline)
                .timed_out();
            if timed_out && inner.queue.is_empty() && inner.state == PoolState::Run {
                if persistent {
                    // Persistent workers ride out any number of idle
                    // periods.
                    continue;
                }
                break 'work;
            }
        }

        // Not running and nothing left: drain is complete.
        let Some(task) = inner.queue.pop_front() else {
            break 'work;
        };

        inner.busy += 1;
        drop(inner);

        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(task)) {
            error!(panic = panic_message(&payload), "task panicked; worker continues");
        }

        inner = shared.inner.lock();
        inner.busy -= 1;
    }

    inner.existing -= 1;
    let last_out = inner.existing == 0 && inner.state == PoolState::Stopping;
    if last_out {
        inner.state = PoolState::Stopped;
    }
    drop(inner);
    if last_out {
        shared.all_exited.notify_all();
    }
}

/// Best-effort extraction of a panic payload message.
fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}
