//! The boundary between a stream and the code that subscribed to it.
//!
//! Every `subscribe*` call wraps the user's observer in a [`Subscriber`] and
//! returns a [`SubscriptionHandle`]. Both share one [`Lifecycle`], the
//! per-subscription state machine that is checked before each delivery and
//! that owns the upstream teardown.

use std::{
  fmt::Debug,
  sync::{
    atomic::{AtomicU8, Ordering},
    Arc,
  },
};

use crate::{
  error_policy,
  observable::Observable,
  observer::Observer,
  subscription::{MultiSubscription, Subscription, SubscriptionGuard},
};

/// Where a subscription stands. Everything but `Active` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SubscriptionState {
  Active = 0,
  Completed = 1,
  Errored = 2,
  Unsubscribed = 3,
}

impl SubscriptionState {
  fn from_u8(v: u8) -> Self {
    match v {
      0 => SubscriptionState::Active,
      1 => SubscriptionState::Completed,
      2 => SubscriptionState::Errored,
      _ => SubscriptionState::Unsubscribed,
    }
  }

  #[inline]
  pub fn is_terminal(self) -> bool { self != SubscriptionState::Active }
}

/// Shared lifecycle of one subscription: a lock-free state flag plus the
/// upstream teardown.
///
/// The only legal transitions leave `Active`; the first one wins and every
/// later attempt fails. Whichever terminal state is reached, the upstream is
/// released exactly once.
#[derive(Clone, Default, Debug)]
pub struct Lifecycle {
  state: Arc<AtomicU8>,
  upstream: MultiSubscription,
}

impl Lifecycle {
  pub fn new() -> Self { Self::default() }

  #[inline]
  pub fn state(&self) -> SubscriptionState {
    SubscriptionState::from_u8(self.state.load(Ordering::Acquire))
  }

  #[inline]
  pub fn is_active(&self) -> bool { self.state() == SubscriptionState::Active }

  /// Moves from `Active` to `to`. Returns false if a terminal state was
  /// already reached.
  pub fn transition(&self, to: SubscriptionState) -> bool {
    debug_assert!(to.is_terminal());
    self
      .state
      .compare_exchange(
        SubscriptionState::Active as u8,
        to as u8,
        Ordering::AcqRel,
        Ordering::Acquire,
      )
      .is_ok()
  }

  /// [`transition`](Self::transition), releasing the upstream on success.
  pub fn terminate(&self, to: SubscriptionState) -> bool {
    let won = self.transition(to);
    if won {
      self.upstream.clone().unsubscribe();
    }
    won
  }

  /// Hands the upstream teardown to this lifecycle. If the subscription
  /// already ended, the teardown runs right away.
  pub fn hold<U: Subscription + Send + 'static>(&self, upstream: U) { self.upstream.add(upstream) }
}

// ============================================================================
// Subscriber
// ============================================================================

/// Wraps the user's observer and drops every signal that arrives after the
/// subscription left `Active`. A terminal signal releases the upstream before
/// it reaches the observer.
pub struct Subscriber<O> {
  observer: O,
  lifecycle: Lifecycle,
}

impl<O> Subscriber<O> {
  pub fn new(observer: O, lifecycle: Lifecycle) -> Self {
    Subscriber { observer, lifecycle }
  }
}

impl<Item, Err, O> Observer<Item, Err> for Subscriber<O>
where
  O: Observer<Item, Err>,
{
  fn next(&mut self, value: Item) {
    if self.lifecycle.is_active() {
      self.observer.next(value)
    }
  }

  fn error(self, err: Err) {
    if self.lifecycle.terminate(SubscriptionState::Errored) {
      self.observer.error(err)
    }
  }

  fn complete(self) {
    if self.lifecycle.terminate(SubscriptionState::Completed) {
      self.observer.complete()
    }
  }

  #[inline]
  fn is_finished(&self) -> bool {
    !self.lifecycle.is_active() || self.observer.is_finished()
  }
}

// ============================================================================
// SubscriptionHandle
// ============================================================================

/// Returned by every `subscribe*` call.
pub struct SubscriptionHandle {
  lifecycle: Lifecycle,
}

impl SubscriptionHandle {
  pub fn new(lifecycle: Lifecycle) -> Self { SubscriptionHandle { lifecycle } }

  /// Current state of the subscription.
  pub fn state(&self) -> SubscriptionState { self.lifecycle.state() }

  /// Activates "RAII" behavior for this subscription. That means
  /// `unsubscribe()` will be called automatically as soon as the returned
  /// value goes out of scope.
  ///
  /// **Attention:** If you don't assign the return value to a variable,
  /// `unsubscribe()` is called immediately, which is probably not what you
  /// want!
  pub fn unsubscribe_when_dropped(self) -> SubscriptionGuard<Self> {
    SubscriptionGuard::new(self)
  }
}

impl Subscription for SubscriptionHandle {
  fn unsubscribe(self) {
    if self.lifecycle.terminate(SubscriptionState::Unsubscribed) {
      tracing::trace!("subscription unsubscribed");
    }
  }

  #[inline]
  fn is_closed(&self) -> bool { !self.lifecycle.is_active() }
}

/// Subscribes `observer` to `source` behind a fresh lifecycle.
pub(crate) fn subscribe_observer<S, Item, Err, O>(source: S, observer: O) -> SubscriptionHandle
where
  S: Observable<Item, Err, Subscriber<O>>,
  S::Unsub: Send + 'static,
  O: Observer<Item, Err>,
{
  let lifecycle = Lifecycle::new();
  let upstream = source.actual_subscribe(Subscriber::new(observer, lifecycle.clone()));
  // A synchronous terminal already ran `terminate`; `hold` then releases
  // this upstream on the spot.
  lifecycle.hold(upstream);
  SubscriptionHandle::new(lifecycle)
}

// ============================================================================
// Closure observers
// ============================================================================

/// Observer built from a `next` closure alone. An error reaching it is
/// unhandled and escalated through [`error_policy`].
#[derive(Clone)]
pub struct NextObserver<N>(pub N);

impl<Item, Err, N> Observer<Item, Err> for NextObserver<N>
where
  N: FnMut(Item),
  Err: Debug,
{
  #[inline]
  fn next(&mut self, value: Item) { (self.0)(value) }

  fn error(self, err: Err) { error_policy::on_unhandled_error(&err) }

  #[inline]
  fn complete(self) {}

  #[inline]
  fn is_finished(&self) -> bool { false }
}

/// Observer built from `next` and `error` closures.
#[derive(Clone)]
pub struct ErrObserver<N, E> {
  next: N,
  error: E,
}

impl<N, E> ErrObserver<N, E> {
  pub fn new(next: N, error: E) -> Self { ErrObserver { next, error } }
}

impl<Item, Err, N, E> Observer<Item, Err> for ErrObserver<N, E>
where
  N: FnMut(Item),
  E: FnOnce(Err),
{
  #[inline]
  fn next(&mut self, value: Item) { (self.next)(value) }

  fn error(self, err: Err) { (self.error)(err) }

  #[inline]
  fn complete(self) {}

  #[inline]
  fn is_finished(&self) -> bool { false }
}

/// Observer built from `next`, `error` and `complete` closures.
#[derive(Clone)]
pub struct AllObserver<N, E, C> {
  next: N,
  error: E,
  complete: C,
}

impl<N, E, C> AllObserver<N, E, C> {
  pub fn new(next: N, error: E, complete: C) -> Self {
    AllObserver { next, error, complete }
  }
}

impl<Item, Err, N, E, C> Observer<Item, Err> for AllObserver<N, E, C>
where
  N: FnMut(Item),
  E: FnOnce(Err),
  C: FnOnce(),
{
  #[inline]
  fn next(&mut self, value: Item) { (self.next)(value) }

  fn error(self, err: Err) { (self.error)(err) }

  fn complete(self) { (self.complete)() }

  #[inline]
  fn is_finished(&self) -> bool { false }
}

#[cfg(test)]
mod tests {
  use std::sync::{atomic::AtomicUsize, mpsc};

  use super::*;
  use crate::{observer::tests::Recorder, prelude::*};

  fn counted_teardown() -> (Arc<AtomicUsize>, impl Subscription + Send + 'static) {
    let hits = Arc::new(AtomicUsize::new(0));
    let c_hits = hits.clone();
    (
      hits,
      ClosureSubscription::new(move || {
        c_hits.fetch_add(1, Ordering::SeqCst);
      }),
    )
  }

  #[rxflow_macro::test]
  fn only_one_terminal_state() {
    let lifecycle = Lifecycle::new();
    assert!(lifecycle.is_active());
    assert!(lifecycle.transition(SubscriptionState::Completed));
    assert!(!lifecycle.transition(SubscriptionState::Errored));
    assert!(!lifecycle.transition(SubscriptionState::Unsubscribed));
    assert_eq!(lifecycle.state(), SubscriptionState::Completed);
  }

  #[rxflow_macro::test]
  fn subscriber_drops_signals_after_terminal() {
    let record = Recorder::<i32, &str>::default();
    let lifecycle = Lifecycle::new();
    let mut subscriber = Subscriber::new(record.clone(), lifecycle.clone());

    subscriber.next(1);
    lifecycle.transition(SubscriptionState::Unsubscribed);
    subscriber.next(2);
    assert!(subscriber.is_finished());
    subscriber.error("late");

    let r = record.0.rc_deref_mut();
    assert_eq!(r.values, vec![1]);
    assert!(r.errors.is_empty());
    assert_eq!(lifecycle.state(), SubscriptionState::Unsubscribed);
  }

  #[rxflow_macro::test]
  fn handle_reports_state() {
    let lifecycle = Lifecycle::new();
    let handle = SubscriptionHandle::new(lifecycle.clone());
    assert!(!handle.is_closed());
    assert_eq!(handle.state(), SubscriptionState::Active);

    lifecycle.transition(SubscriptionState::Errored);
    assert!(handle.is_closed());
    assert_eq!(handle.state(), SubscriptionState::Errored);

    // Unsubscribing a finished subscription keeps its outcome.
    handle.unsubscribe();
    assert_eq!(lifecycle.state(), SubscriptionState::Errored);
  }

  #[rxflow_macro::test]
  fn sync_error_releases_upstream() {
    let (teardowns, teardown) = counted_teardown();
    let errors = Arc::new(AtomicUsize::new(0));
    let c_errors = errors.clone();
    let handle = observable::create(move |mut e: Emitter<i32, RxError>| {
      e.next(1);
      e.next(2);
      teardown
    })
    .try_map(|v| if v == 1 { Err(RxError::user("one")) } else { Ok(v) })
    .subscribe_err(
      |_| {},
      move |_| {
        c_errors.fetch_add(1, Ordering::SeqCst);
      },
    );

    assert_eq!(handle.state(), SubscriptionState::Errored);
    assert_eq!(errors.load(Ordering::SeqCst), 1);
    assert_eq!(teardowns.load(Ordering::SeqCst), 1);

    // Nothing left to release.
    handle.unsubscribe();
    assert_eq!(teardowns.load(Ordering::SeqCst), 1);
  }

  #[rxflow_macro::test]
  fn later_complete_releases_upstream() {
    let (teardowns, teardown) = counted_teardown();
    let (tx, rx) = mpsc::channel();
    let record = Recorder::<i32, RxError>::default();
    let handle = observable::create(move |e: Emitter<i32, RxError>| {
      tx.send(e).unwrap();
      teardown
    })
    .subscribe_with(record.clone());

    let mut emitter = rx.recv().unwrap();
    emitter.next(7);
    assert_eq!(teardowns.load(Ordering::SeqCst), 0);
    emitter.complete();

    assert_eq!(handle.state(), SubscriptionState::Completed);
    assert_eq!(teardowns.load(Ordering::SeqCst), 1);
    assert_eq!(record.0.rc_deref_mut().values, vec![7]);
  }
}
