use std::{
  any::Any,
  fmt,
  panic::{catch_unwind, AssertUnwindSafe},
  sync::{
    atomic::{fence, AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex, PoisonError,
  },
  thread::{self, JoinHandle},
  time::Duration,
};

use crossbeam::channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use tracing::{debug, error, info, trace};

use crate::{
  config::SchedulerConfig,
  error::{RxError, UnhandledError},
  scheduler::{Scheduler, TaskHandle},
};

/// Shape of one [`WorkerPool`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolConfig {
  /// Used for thread names and logs.
  pub name: String,
  /// Workers that never retire once started.
  pub core_threads: usize,
  /// Upper bound on live workers.
  pub max_threads: usize,
  /// Idle time after which a worker above `core_threads` exits.
  pub keep_alive: Duration,
}

impl PoolConfig {
  /// A pool that never runs more than `threads` workers and keeps them.
  pub fn fixed(name: impl Into<String>, threads: usize) -> Self {
    let threads = threads.max(1);
    PoolConfig {
      name: name.into(),
      core_threads: threads,
      max_threads: threads,
      keep_alive: Duration::from_secs(60),
    }
  }

  /// A pool that starts empty, grows to `max_threads` on demand and shrinks
  /// back to zero when idle.
  pub fn elastic(name: impl Into<String>, max_threads: usize, keep_alive: Duration) -> Self {
    PoolConfig {
      name: name.into(),
      core_threads: 0,
      max_threads: max_threads.max(1),
      keep_alive,
    }
  }

  pub(crate) fn computation(cfg: &SchedulerConfig) -> Self {
    Self::fixed(format!("{}-computation", cfg.thread_name_prefix), cfg.computation_threads)
  }

  pub(crate) fn io(cfg: &SchedulerConfig) -> Self {
    Self::elastic(format!("{}-io", cfg.thread_name_prefix), cfg.io_max_threads, cfg.io_keep_alive)
  }
}

type Job = Box<dyn FnOnce() + Send + 'static>;

enum Message {
  Run(Job),
  Stop,
}

/// State shared between the pool handle and its workers.
struct Shared {
  config: PoolConfig,
  receiver: Receiver<Message>,
  live: AtomicUsize,
  idle: AtomicUsize,
  shutdown: AtomicBool,
  next_id: AtomicUsize,
  workers: Mutex<Vec<JoinHandle<()>>>,
}

struct PoolInner {
  shared: Arc<Shared>,
  // Workers only hold the receiver: dropping the last pool handle disconnects
  // the channel and lets every worker exit.
  sender: Sender<Message>,
}

/// A FIFO thread pool that spawns workers on demand.
///
/// Submission is a channel send plus a few atomic loads. A new worker is
/// started only when queued work outnumbers idle workers and the pool is below
/// `max_threads`; otherwise work waits in the queue.
#[derive(Clone)]
pub struct WorkerPool(Arc<PoolInner>);

impl WorkerPool {
  pub fn new(config: PoolConfig) -> Self {
    debug!(pool = %config.name, max_threads = config.max_threads, "creating worker pool");
    let (sender, receiver) = unbounded();
    WorkerPool(Arc::new(PoolInner {
      shared: Arc::new(Shared {
        config,
        receiver,
        live: AtomicUsize::new(0),
        idle: AtomicUsize::new(0),
        shutdown: AtomicBool::new(false),
        next_id: AtomicUsize::new(0),
        workers: Mutex::new(Vec::new()),
      }),
      sender,
    }))
  }

  pub fn name(&self) -> &str { &self.0.shared.config.name }

  pub fn config(&self) -> &PoolConfig { &self.0.shared.config }

  /// Workers currently alive.
  pub fn live_threads(&self) -> usize { self.0.shared.live.load(Ordering::Acquire) }

  /// Workers currently waiting for work.
  pub fn idle_threads(&self) -> usize { self.0.shared.idle.load(Ordering::Acquire) }

  /// Tasks submitted but not yet picked up.
  pub fn queued(&self) -> usize { self.0.shared.receiver.len() }

  pub fn is_shutdown(&self) -> bool { self.0.shared.shutdown.load(Ordering::Acquire) }

  /// Submit `task`, failing once the pool is shut down.
  pub fn try_schedule<F>(&self, task: F) -> Result<TaskHandle, RxError>
  where
    F: FnOnce() + Send + 'static,
  {
    if self.is_shutdown() {
      return Err(self.shutdown_error());
    }
    let handle = TaskHandle::new();
    let c_handle = handle.clone();
    let job: Job = Box::new(move || c_handle.run(task));
    self
      .0
      .sender
      .send(Message::Run(job))
      .map_err(|_| self.shutdown_error())?;
    // A shutdown that started meanwhile may have queued its Stops ahead of
    // this task, so no worker is left to run it.
    if self.is_shutdown() && handle.cancel_pending() {
      return Err(self.shutdown_error());
    }
    trace!(pool = %self.name(), queued = self.queued(), "task queued");
    grow_if_needed(&self.0.shared);
    Ok(handle)
  }

  /// Stop accepting work, let the queued tasks run, then join every worker.
  ///
  /// Safe to call from a worker of this pool; that worker is not joined.
  pub fn shutdown(&self) {
    let shared = &self.0.shared;
    if shared.shutdown.swap(true, Ordering::AcqRel) {
      return;
    }
    let workers = std::mem::take(&mut *shared.workers.lock().unwrap_or_else(PoisonError::into_inner));
    // Stops queue up behind every pending task.
    for _ in 0..workers.len() {
      let _ = self.0.sender.send(Message::Stop);
    }
    let current = thread::current().id();
    for worker in workers {
      if worker.thread().id() != current {
        let _ = worker.join();
      }
    }
    info!(pool = %self.name(), "worker pool shut down");
  }

  fn shutdown_error(&self) -> RxError { RxError::SchedulerShutdown { name: self.name().to_string() } }
}

impl fmt::Debug for WorkerPool {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("WorkerPool")
      .field("name", &self.name())
      .field("live", &self.live_threads())
      .field("idle", &self.idle_threads())
      .field("queued", &self.queued())
      .finish()
  }
}

fn grow_if_needed(shared: &Arc<Shared>) {
  // Pairs with the fence in `try_retire`: either the retiring worker sees the
  // new task, or this sees the worker gone from `idle`.
  fence(Ordering::SeqCst);
  if shared.shutdown.load(Ordering::Acquire)
    || shared.idle.load(Ordering::Acquire) >= shared.receiver.len()
  {
    return;
  }
  let max = shared.config.max_threads;
  let reserved = shared
    .live
    .fetch_update(Ordering::AcqRel, Ordering::Acquire, |live| (live < max).then_some(live + 1));
  if reserved.is_ok() {
    spawn_worker(shared);
  }
}

// Caller already counted the worker in `live`.
fn spawn_worker(shared: &Arc<Shared>) {
  shared.idle.fetch_add(1, Ordering::AcqRel);
  let id = shared.next_id.fetch_add(1, Ordering::Relaxed);
  let name = format!("{}-{}", shared.config.name, id);
  let c_shared = shared.clone();
  match thread::Builder::new()
    .name(name.clone())
    .spawn(move || worker_loop(c_shared))
  {
    Ok(worker) => {
      debug!(thread = %name, live = shared.live.load(Ordering::Relaxed), "worker started");
      let mut workers = shared.workers.lock().unwrap_or_else(PoisonError::into_inner);
      workers.retain(|w| !w.is_finished());
      workers.push(worker);
    }
    Err(err) => {
      shared.idle.fetch_sub(1, Ordering::AcqRel);
      shared.live.fetch_sub(1, Ordering::AcqRel);
      error!(pool = %shared.config.name, error = %err, "failed to spawn worker");
    }
  }
}

fn worker_loop(shared: Arc<Shared>) {
  loop {
    match shared.receiver.recv_timeout(shared.config.keep_alive) {
      Ok(Message::Run(job)) => {
        shared.idle.fetch_sub(1, Ordering::AcqRel);
        // A submitter may have seen this worker as idle a moment ago.
        grow_if_needed(&shared);
        run_job(&shared.config.name, job);
        shared.idle.fetch_add(1, Ordering::AcqRel);
      }
      Ok(Message::Stop) | Err(RecvTimeoutError::Disconnected) => break,
      Err(RecvTimeoutError::Timeout) => {
        // A worker spawned while `shutdown` ran never gets its own Stop.
        if shared.shutdown.load(Ordering::Acquire) && shared.receiver.is_empty() {
          break;
        }
        if try_retire(&shared) {
          debug!(pool = %shared.config.name, "idle worker retired");
          return;
        }
      }
    }
  }
  shared.idle.fetch_sub(1, Ordering::AcqRel);
  shared.live.fetch_sub(1, Ordering::AcqRel);
}

/// Leave the pool if it is above its core size and has nothing queued.
///
/// The worker first drops out of `live` and `idle`, then looks at the queue
/// again: a task sent before that drop was counted against this worker and
/// spawned nobody, so the worker stays for it.
fn try_retire(shared: &Shared) -> bool {
  if !shared.receiver.is_empty() {
    return false;
  }
  let core = shared.config.core_threads;
  let max = shared.config.max_threads;
  let left = shared
    .live
    .fetch_update(Ordering::AcqRel, Ordering::Acquire, |live| (live > core).then(|| live - 1))
    .is_ok();
  if !left {
    return false;
  }
  shared.idle.fetch_sub(1, Ordering::AcqRel);
  fence(Ordering::SeqCst);
  if shared.receiver.is_empty() {
    return true;
  }
  // A replacement may already hold the slot; then it runs the task.
  let stays = shared
    .live
    .fetch_update(Ordering::AcqRel, Ordering::Acquire, |live| (live < max).then_some(live + 1))
    .is_ok();
  if stays {
    shared.idle.fetch_add(1, Ordering::AcqRel);
  }
  !stays
}

fn run_job(pool: &str, job: Job) {
  if let Err(payload) = catch_unwind(AssertUnwindSafe(job)) {
    error!(pool, panic = %panic_message(&*payload), "task panicked, worker kept alive");
  }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
  if let Some(err) = payload.downcast_ref::<UnhandledError>() {
    err.to_string()
  } else if let Some(s) = payload.downcast_ref::<&str>() {
    (*s).to_string()
  } else if let Some(s) = payload.downcast_ref::<String>() {
    s.clone()
  } else {
    "<non-string panic payload>".to_string()
  }
}

// ============================================================================
// PoolScheduler
// ============================================================================

/// [`Scheduler`] view of a [`WorkerPool`].
#[derive(Clone, Debug)]
pub struct PoolScheduler(WorkerPool);

impl PoolScheduler {
  pub fn new(pool: WorkerPool) -> Self { PoolScheduler(pool) }

  pub fn pool(&self) -> &WorkerPool { &self.0 }
}

impl Scheduler for PoolScheduler {
  /// A task submitted after shutdown is dropped; its handle comes back
  /// already cancelled.
  fn schedule<F>(&self, task: F) -> TaskHandle
  where
    F: FnOnce() + Send + 'static,
  {
    self.0.try_schedule(task).unwrap_or_else(|err| {
      error!(error = %err, "task rejected");
      TaskHandle::cancelled()
    })
  }
}
