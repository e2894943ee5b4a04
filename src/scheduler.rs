//! Execution contexts.
//!
//! A [`Scheduler`] decides which thread runs a unit of work. Sources never
//! spawn threads themselves; `subscribe_on` hands the subscription work to a
//! scheduler instead.
//!
//! | function | context |
//! |---|---|
//! | [`immediate`] | inline, on the calling thread |
//! | [`new_thread`] | one dedicated OS thread per task |
//! | [`io`] | elastic pool for blocking work, idle workers retire |
//! | [`computation`] | fixed pool sized to the CPU count |
//!
//! The two pools are process-wide and start lazily. Call [`init`] before first
//! use to size them, and [`shutdown`] to drain and join them.

use std::{
  fmt,
  str::FromStr,
  sync::{
    atomic::{AtomicU8, Ordering},
    Arc,
  },
};

use once_cell::sync::OnceCell;
use tracing::info;

use crate::{config::SchedulerConfig, error::RxError, subscription::Subscription};

mod thread_pool_scheduler;
mod thread_scheduler;
#[cfg(feature = "tokio-scheduler")]
mod tokio_scheduler;

pub use thread_pool_scheduler::{PoolConfig, PoolScheduler, WorkerPool};
pub use thread_scheduler::NewThreadScheduler;

/// A Scheduler is an object to order task and schedule their execution.
pub trait Scheduler: Clone + Send + Sync + 'static {
  /// Submit `task`. The returned handle cancels it if it has not started yet.
  fn schedule<F>(&self, task: F) -> TaskHandle
  where
    F: FnOnce() + Send + 'static;
}

// ============================================================================
// TaskHandle
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TaskState {
  Pending = 0,
  Running = 1,
  Finished = 2,
  Cancelled = 3,
}

/// Cancellable handle of one scheduled task.
///
/// Cancelling a pending task keeps it from ever running. Cancelling a running
/// task only marks it; the work itself is not interrupted.
#[derive(Clone, Debug)]
pub struct TaskHandle(Arc<AtomicU8>);

impl Default for TaskHandle {
  fn default() -> Self { Self::new() }
}

impl TaskHandle {
  pub fn new() -> Self { Self::with_state(TaskState::Pending) }

  /// A handle for work that will never run.
  pub fn cancelled() -> Self { Self::with_state(TaskState::Cancelled) }

  fn with_state(state: TaskState) -> Self { TaskHandle(Arc::new(AtomicU8::new(state as u8))) }

  pub fn state(&self) -> TaskState {
    match self.0.load(Ordering::Acquire) {
      0 => TaskState::Pending,
      1 => TaskState::Running,
      2 => TaskState::Finished,
      _ => TaskState::Cancelled,
    }
  }

  /// Run `task` unless the handle was cancelled first.
  pub fn run<F: FnOnce()>(&self, task: F) {
    if self.swap_state(TaskState::Pending, TaskState::Running) {
      let _finish = FinishOnDrop(self);
      task();
    }
  }

  /// Cancel the task only if no worker picked it up yet.
  pub(crate) fn cancel_pending(&self) -> bool {
    self.swap_state(TaskState::Pending, TaskState::Cancelled)
  }

  fn swap_state(&self, from: TaskState, to: TaskState) -> bool {
    self
      .0
      .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
      .is_ok()
  }
}

// Also marks a task finished when it unwinds.
struct FinishOnDrop<'a>(&'a TaskHandle);

impl Drop for FinishOnDrop<'_> {
  fn drop(&mut self) { self.0.swap_state(TaskState::Running, TaskState::Finished); }
}

impl Subscription for TaskHandle {
  fn unsubscribe(self) {
    if !self.cancel_pending() {
      self.swap_state(TaskState::Running, TaskState::Cancelled);
    }
  }

  fn is_closed(&self) -> bool {
    matches!(self.state(), TaskState::Finished | TaskState::Cancelled)
  }
}

// ============================================================================
// ImmediateScheduler
// ============================================================================

/// Runs every task inline, before `schedule` returns.
#[derive(Clone, Copy, Debug, Default)]
pub struct ImmediateScheduler;

impl Scheduler for ImmediateScheduler {
  fn schedule<F>(&self, task: F) -> TaskHandle
  where
    F: FnOnce() + Send + 'static,
  {
    let handle = TaskHandle::new();
    handle.run(task);
    handle
  }
}

// ============================================================================
// Selection by name
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchedulerKind {
  Immediate,
  NewThread,
  Io,
  Computation,
}

impl SchedulerKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      SchedulerKind::Immediate => "immediate",
      SchedulerKind::NewThread => "newThread",
      SchedulerKind::Io => "io",
      SchedulerKind::Computation => "computation",
    }
  }
}

impl fmt::Display for SchedulerKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for SchedulerKind {
  type Err = RxError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "immediate" => Ok(SchedulerKind::Immediate),
      "newThread" | "new_thread" | "new-thread" => Ok(SchedulerKind::NewThread),
      "io" => Ok(SchedulerKind::Io),
      "computation" => Ok(SchedulerKind::Computation),
      other => Err(RxError::UnknownScheduler(other.to_string())),
    }
  }
}

/// One of the built-in schedulers, chosen at runtime.
#[derive(Clone, Debug)]
pub enum AnyScheduler {
  Immediate(ImmediateScheduler),
  NewThread(NewThreadScheduler),
  Pool(PoolScheduler),
}

impl Scheduler for AnyScheduler {
  fn schedule<F>(&self, task: F) -> TaskHandle
  where
    F: FnOnce() + Send + 'static,
  {
    match self {
      AnyScheduler::Immediate(s) => s.schedule(task),
      AnyScheduler::NewThread(s) => s.schedule(task),
      AnyScheduler::Pool(s) => s.schedule(task),
    }
  }
}

pub fn by_kind(kind: SchedulerKind) -> AnyScheduler {
  match kind {
    SchedulerKind::Immediate => AnyScheduler::Immediate(immediate()),
    SchedulerKind::NewThread => AnyScheduler::NewThread(new_thread()),
    SchedulerKind::Io => AnyScheduler::Pool(io()),
    SchedulerKind::Computation => AnyScheduler::Pool(computation()),
  }
}

// ============================================================================
// Process-wide schedulers
// ============================================================================

static CONFIG: OnceCell<SchedulerConfig> = OnceCell::new();
static COMPUTATION: OnceCell<WorkerPool> = OnceCell::new();
static IO: OnceCell<WorkerPool> = OnceCell::new();

/// Configure the process-wide schedulers.
///
/// Must run before any scheduler is used; afterwards the configuration is
/// fixed and this returns [`RxError::AlreadyInitialized`].
pub fn init(config: SchedulerConfig) -> Result<(), RxError> {
  CONFIG.set(config).map_err(|_| RxError::AlreadyInitialized)?;
  let config = self::config();
  info!(
    computation_threads = config.computation_threads,
    io_max_threads = config.io_max_threads,
    io_keep_alive_ms = config.io_keep_alive.as_millis() as u64,
    "initializing schedulers"
  );
  Ok(())
}

/// The active configuration, reading the environment if [`init`] was never
/// called.
pub fn config() -> &'static SchedulerConfig { CONFIG.get_or_init(SchedulerConfig::from_env) }

/// Returns a Scheduler that runs each task on the calling thread.
pub fn immediate() -> ImmediateScheduler { ImmediateScheduler }

/// Returns a Scheduler instance that creates a new thread for each unit of
/// work.
pub fn new_thread() -> NewThreadScheduler { NewThreadScheduler::new(&config().thread_name_prefix) }

/// Scheduler for blocking work.
pub fn io() -> PoolScheduler {
  let pool = IO.get_or_init(|| WorkerPool::new(PoolConfig::io(config())));
  PoolScheduler::new(pool.clone())
}

/// Scheduler for CPU-bound work.
pub fn computation() -> PoolScheduler {
  let pool = COMPUTATION.get_or_init(|| WorkerPool::new(PoolConfig::computation(config())));
  PoolScheduler::new(pool.clone())
}

/// Drain the process-wide pools and join their workers.
///
/// Work already queued still runs; anything scheduled afterwards is rejected.
/// The pools cannot be restarted in the same process.
pub fn shutdown() {
  for pool in [COMPUTATION.get(), IO.get()].into_iter().flatten() {
    pool.shutdown();
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{
    atomic::{AtomicUsize, Ordering},
    mpsc,
  };

  use super::*;

  #[rxflow_macro::test]
  fn immediate_runs_inline() {
    let caller = std::thread::current().id();
    let (tx, rx) = mpsc::channel();
    let handle = immediate().schedule(move || tx.send(std::thread::current().id()).unwrap());
    assert_eq!(rx.try_recv().unwrap(), caller);
    assert_eq!(handle.state(), TaskState::Finished);
    assert!(handle.is_closed());
  }

  #[rxflow_macro::test]
  fn cancelled_task_never_runs() {
    let hits = Arc::new(AtomicUsize::new(0));
    let handle = TaskHandle::new();
    handle.clone().unsubscribe();
    let c_hits = hits.clone();
    handle.run(move || {
      c_hits.fetch_add(1, Ordering::SeqCst);
    });
    assert_eq!(hits.load(Ordering::SeqCst), 0);
    assert_eq!(handle.state(), TaskState::Cancelled);
  }

  #[rxflow_macro::test]
  fn cancel_while_running_is_advisory() {
    let handle = TaskHandle::new();
    let c_handle = handle.clone();
    let mut ran = false;
    handle.run(|| {
      c_handle.clone().unsubscribe();
      ran = true;
    });
    assert!(ran);
    assert_eq!(handle.state(), TaskState::Cancelled);
  }

  #[rxflow_macro::test]
  fn kind_parses_known_names() {
    assert_eq!("newThread".parse::<SchedulerKind>().unwrap(), SchedulerKind::NewThread);
    assert_eq!("new_thread".parse::<SchedulerKind>().unwrap(), SchedulerKind::NewThread);
    assert_eq!("io".parse::<SchedulerKind>().unwrap(), SchedulerKind::Io);
    assert_eq!(SchedulerKind::Computation.to_string(), "computation");

    let err = "trampoline".parse::<SchedulerKind>().unwrap_err();
    assert_eq!(err.as_label(), "unknown_scheduler");
  }

  #[rxflow_macro::test]
  fn by_kind_runs_on_pool_threads() {
    let (tx, rx) = mpsc::channel();
    by_kind(SchedulerKind::Computation).schedule(move || {
      tx.send(std::thread::current().name().map(str::to_owned)).unwrap();
    });
    let name = rx.recv().unwrap().unwrap();
    assert!(name.contains("computation"), "{name}");
  }
}
