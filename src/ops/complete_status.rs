use std::{
  future::Future,
  pin::Pin,
  sync::{
    atomic::{AtomicI8, Ordering},
    Arc,
  },
  task::{Context, Poll},
};

use futures::{executor::block_on, task::AtomicWaker};

use crate::{
  observable::{Observable, ObservableExt},
  observer::Observer,
};

/// Termination flag of one subscription, shared with the thread that waits
/// for it.
#[derive(Default, Debug)]
pub struct CompleteStatus {
  flag: AtomicI8,
  waker: AtomicWaker,
}

pub struct StatusOp<S> {
  source: S,
  status: Arc<CompleteStatus>,
}

impl<S> StatusOp<S> {
  pub(crate) fn new(source: S) -> (Self, Arc<CompleteStatus>) {
    let status = Arc::new(CompleteStatus::default());
    (StatusOp { source, status: status.clone() }, status)
  }
}

impl<S, Item, Err, O> Observable<Item, Err, O> for StatusOp<S>
where
  O: Observer<Item, Err>,
  S: Observable<Item, Err, StatusObserver<O>>,
{
  type Unsub = S::Unsub;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    let Self { source, status } = self;
    source.actual_subscribe(StatusObserver { observer, status })
  }
}

impl<S, Item, Err> ObservableExt<Item, Err> for StatusOp<S> where S: ObservableExt<Item, Err> {}

pub struct StatusObserver<O> {
  observer: O,
  status: Arc<CompleteStatus>,
}

impl<Item, Err, O> Observer<Item, Err> for StatusObserver<O>
where
  O: Observer<Item, Err>,
{
  #[inline]
  fn next(&mut self, value: Item) { self.observer.next(value) }

  // The flag is published before delivery, so a panicking downstream cannot
  // leave `wait_for_end` blocked.
  fn error(self, err: Err) {
    self.status.close(-1);
    self.observer.error(err);
  }

  fn complete(self) {
    self.status.close(1);
    self.observer.complete();
  }

  #[inline]
  fn is_finished(&self) -> bool { self.observer.is_finished() }
}

impl CompleteStatus {
  fn close(&self, flag: i8) {
    self.flag.store(flag, Ordering::Release);
    self.waker.wake();
  }

  /// return true if the observable completed or emit an error.
  pub fn is_closed(&self) -> bool { self.flag.load(Ordering::Acquire) != 0 }

  /// return true if the observable completed.
  pub fn is_completed(&self) -> bool { self.flag.load(Ordering::Acquire) > 0 }

  /// return true if the observable emit an error.
  pub fn error_occur(&self) -> bool { self.flag.load(Ordering::Acquire) < 0 }

  /// Block the current thread until the observable complete or an error
  /// occur.
  ///
  /// Never returns for a stream that is unsubscribed or never terminates.
  pub fn wait_for_end(this: Arc<Self>) { block_on(StatusFuture(this)); }
}

struct StatusFuture(Arc<CompleteStatus>);

impl Future for StatusFuture {
  type Output = ();

  fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
    if self.0.is_closed() {
      return Poll::Ready(());
    }
    self.0.waker.register(cx.waker());
    // The flag may have been set between the check and the registration.
    if self.0.is_closed() {
      Poll::Ready(())
    } else {
      Poll::Pending
    }
  }
}
