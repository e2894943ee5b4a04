use std::{
  sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
  },
  thread,
};

use tracing::{debug, error};

use crate::{
  scheduler::{Scheduler, TaskHandle},
  subscription::Subscription,
};

static THREAD_ID: AtomicUsize = AtomicUsize::new(0);

/// Spawns a dedicated, detached OS thread for each task.
#[derive(Clone, Debug)]
pub struct NewThreadScheduler {
  prefix: Arc<str>,
}

impl NewThreadScheduler {
  pub fn new(prefix: &str) -> Self { NewThreadScheduler { prefix: Arc::from(prefix) } }
}

impl Scheduler for NewThreadScheduler {
  fn schedule<F>(&self, task: F) -> TaskHandle
  where
    F: FnOnce() + Send + 'static,
  {
    let handle = TaskHandle::new();
    let c_handle = handle.clone();
    let name = format!("{}-new-thread-{}", self.prefix, THREAD_ID.fetch_add(1, Ordering::Relaxed));
    debug!(thread = %name, "spawning thread");
    let spawned = thread::Builder::new()
      .name(name)
      .spawn(move || c_handle.run(task));
    if let Err(err) = spawned {
      error!(error = %err, "failed to spawn thread, task dropped");
      handle.clone().unsubscribe();
    }
    handle
  }
}
