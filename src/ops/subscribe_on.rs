use crate::{
  observable::{Observable, ObservableExt},
  observer::Observer,
  scheduler::Scheduler,
  subscription::MultiSubscription,
};

/// Subscribes to the source on a scheduler.
///
/// Unsubscribing before the scheduler ran the task cancels it; unsubscribing
/// while it runs releases the source as soon as its subscription exists.
#[derive(Clone)]
pub struct SubscribeOnOp<S, SD> {
  source: S,
  scheduler: SD,
}

impl<S, SD> SubscribeOnOp<S, SD> {
  pub(crate) fn new(source: S, scheduler: SD) -> Self { SubscribeOnOp { source, scheduler } }
}

impl<Item, Err, O, S, SD> Observable<Item, Err, O> for SubscribeOnOp<S, SD>
where
  O: Observer<Item, Err> + Send + 'static,
  S: Observable<Item, Err, O> + Send + 'static,
  S::Unsub: Send + 'static,
  SD: Scheduler,
{
  type Unsub = MultiSubscription;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    let source = self.source;
    let subscription = MultiSubscription::new();
    let c_subscription = subscription.clone();
    let handle = self
      .scheduler
      .schedule(move || c_subscription.add(source.actual_subscribe(observer)));
    subscription.add(handle);
    subscription
  }
}

impl<Item, Err, S, SD> ObservableExt<Item, Err> for SubscribeOnOp<S, SD> where
  S: ObservableExt<Item, Err>
{
}

#[cfg(test)]
mod tests {
  use std::{
    sync::{mpsc, Arc, Barrier, Mutex},
    thread,
  };

  use crate::{
    prelude::*,
    scheduler::{NewThreadScheduler, PoolConfig, PoolScheduler, WorkerPool},
  };

  #[rxflow_macro::test]
  fn producer_runs_on_scheduler_thread() {
    let caller = thread::current().id();
    let (tx, rx) = mpsc::channel();
    let (source, status) = observable::range(1, 4)
      .subscribe_on(scheduler::new_thread())
      .complete_status();
    source.subscribe(move |v| tx.send((v, thread::current().id())).unwrap());
    CompleteStatus::wait_for_end(status);

    let got: Vec<_> = rx.try_iter().collect();
    assert_eq!(got.iter().map(|(v, _)| *v).collect::<Vec<_>>(), vec![1, 2, 3, 4]);
    assert!(got.iter().all(|(_, id)| *id != caller));
  }

  #[rxflow_macro::test]
  fn immediate_stays_on_caller() {
    let caller = thread::current().id();
    let seen = Arc::new(Mutex::new(vec![]));
    let c_seen = seen.clone();
    observable::just(1)
      .subscribe_on(scheduler::immediate())
      .subscribe(move |_| c_seen.lock().unwrap().push(thread::current().id()));
    assert_eq!(*seen.lock().unwrap(), vec![caller]);
  }

  #[rxflow_macro::test]
  fn unsubscribe_before_run_cancels() {
    // One worker kept busy, so the subscription task stays queued.
    let pool = WorkerPool::new(PoolConfig::fixed("subscribe-on-cancel", 1));
    let gate = Arc::new(Barrier::new(2));
    let c_gate = gate.clone();
    pool
      .try_schedule(move || {
        c_gate.wait();
      })
      .unwrap();

    let (tx, rx) = mpsc::channel::<i64>();
    let handle = observable::range(0, 3)
      .subscribe_on(PoolScheduler::new(pool.clone()))
      .subscribe(move |v| tx.send(v).unwrap());
    handle.unsubscribe();
    gate.wait();
    pool.shutdown();
    assert_eq!(rx.try_iter().count(), 0);
  }

  #[rxflow_macro::test]
  fn runs_on_named_thread() {
    let (tx, rx) = mpsc::channel();
    observable::just(())
      .subscribe_on(NewThreadScheduler::new("worker"))
      .subscribe(move |_| tx.send(thread::current().name().map(str::to_owned)).unwrap());
    let name = rx.recv().unwrap().unwrap();
    assert!(name.starts_with("worker-new-thread-"));
  }
}
