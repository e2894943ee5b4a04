use crate::scheduler::{Scheduler, TaskHandle};

/// Runs tasks on the blocking pool of a tokio runtime, so producers that
/// block do not stall its async workers.
impl Scheduler for tokio::runtime::Handle {
  fn schedule<F>(&self, task: F) -> TaskHandle
  where
    F: FnOnce() + Send + 'static,
  {
    let handle = TaskHandle::new();
    let c_handle = handle.clone();
    self.spawn_blocking(move || c_handle.run(task));
    handle
  }
}

#[cfg(test)]
mod tests {
  use std::sync::mpsc;

  use super::*;

  #[rxflow_macro::test]
  fn runs_on_runtime_blocking_pool() {
    let rt = tokio::runtime::Builder::new_multi_thread()
      .worker_threads(1)
      .thread_name("tokio-test")
      .build()
      .unwrap();
    let (tx, rx) = mpsc::channel();
    let handle = rt.handle().schedule(move || {
      tx.send(std::thread::current().name().map(str::to_owned)).unwrap();
    });
    assert_eq!(rx.recv().unwrap().as_deref(), Some("tokio-test"));
    drop(handle);
  }
}
