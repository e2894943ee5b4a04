//! Cold, re-executable stream sources and the operator surface.
//!
//! An [`Observable`] is only a description: nothing runs until a subscribe
//! call hands it an observer. Each subscription consumes one copy of the
//! description, so subscribing twice means cloning it first, and the two
//! subscriptions share no state.

use std::{fmt::Debug, sync::Arc};

use crate::{
  observer::{BoxObserver, Observer},
  ops::{
    complete_status::{CompleteStatus, StatusOp},
    map::{MapOp, TryMapOp},
    merge::MergeOp,
    subscribe_on::SubscribeOnOp,
    zip::ZipOp,
  },
  scheduler::Scheduler,
  subscriber::{subscribe_observer, AllObserver, ErrObserver, NextObserver, Subscriber, SubscriptionHandle},
  subscription::Subscription,
};

mod boxed;
mod create;
mod of;
mod range;

pub use boxed::*;
pub use create::*;
pub use of::*;
pub use range::*;

pub use crate::ops::{merge::merge, zip::zip};

/// A source that can push values into an observer of type `O`.
pub trait Observable<Item, Err, O>
where
  O: Observer<Item, Err>,
{
  type Unsub: Subscription;

  /// Start producing into `observer`. Runs the producer on the calling thread;
  /// later signals come from whatever thread the producer uses.
  fn actual_subscribe(self, observer: O) -> Self::Unsub;
}

/// Operators and subscribe methods, available on every source.
pub trait ObservableExt<Item, Err>: Sized {
  /// Transform every value with `f`, on the thread that delivered it.
  #[inline]
  fn map<B, F>(self, f: F) -> MapOp<Self, F, Item>
  where
    F: FnMut(Item) -> B,
  {
    MapOp::new(self, f)
  }

  /// Like `map`, but `f` may fail. The first failure terminates the stream
  /// with that error, and later values from the source are dropped.
  #[inline]
  fn try_map<B, F>(self, f: F) -> TryMapOp<Self, F, Item>
  where
    F: FnMut(Item) -> Result<B, Err>,
  {
    TryMapOp::new(self, f)
  }

  /// Interleave the values of `self` and `other` in arrival order.
  ///
  /// Completes after both sources complete; the first error from either
  /// terminates the merged stream and unsubscribes the other source.
  #[inline]
  fn merge<S>(self, other: S) -> MergeOp<Self, S>
  where
    S: ObservableExt<Item, Err>,
  {
    MergeOp::new(self, other)
  }

  /// Pair the i-th value of `self` with the i-th value of `other`.
  #[inline]
  fn zip<S, B>(self, other: S) -> ZipOp<Self, S, fn(Item, B) -> (Item, B), (Item, B)>
  where
    S: ObservableExt<B, Err>,
  {
    ZipOp::new(self, other, pair as fn(Item, B) -> (Item, B))
  }

  /// Combine the i-th values of `self` and `other` with `combiner`.
  #[inline]
  fn zip_with<S, B, F, Out>(self, other: S, combiner: F) -> ZipOp<Self, S, F, (Item, B)>
  where
    S: ObservableExt<B, Err>,
    F: FnMut(Item, B) -> Out,
  {
    ZipOp::new(self, other, combiner)
  }

  /// Run the subscription itself on `scheduler`.
  ///
  /// Only the initial invocation of the producer moves; which thread later
  /// signals arrive on is up to the producer.
  #[inline]
  fn subscribe_on<SD: Scheduler>(self, scheduler: SD) -> SubscribeOnOp<Self, SD> {
    SubscribeOnOp::new(self, scheduler)
  }

  /// Erase the concrete type, so different sources can share a collection.
  fn box_it(self) -> BoxOp<Item, Err>
  where
    Self: Observable<Item, Err, BoxObserver<Item, Err>> + Send + 'static,
    <Self as Observable<Item, Err, BoxObserver<Item, Err>>>::Unsub: Send + 'static,
  {
    BoxOp::new(self)
  }

  /// Track when the stream terminates; see [`CompleteStatus::wait_for_end`].
  fn complete_status(self) -> (StatusOp<Self>, Arc<CompleteStatus>) { StatusOp::new(self) }

  /// Subscribe with a `next` handler only.
  ///
  /// No error handler is registered, so an error reaching this subscription
  /// is escalated as fatal through [`error_policy`](crate::error_policy).
  fn subscribe<N>(self, next: N) -> SubscriptionHandle
  where
    N: FnMut(Item),
    Err: Debug,
    Self: Observable<Item, Err, Subscriber<NextObserver<N>>>,
    <Self as Observable<Item, Err, Subscriber<NextObserver<N>>>>::Unsub: Send + 'static,
  {
    subscribe_observer(self, NextObserver(next))
  }

  fn subscribe_err<N, E>(self, next: N, error: E) -> SubscriptionHandle
  where
    N: FnMut(Item),
    E: FnOnce(Err),
    Self: Observable<Item, Err, Subscriber<ErrObserver<N, E>>>,
    <Self as Observable<Item, Err, Subscriber<ErrObserver<N, E>>>>::Unsub: Send + 'static,
  {
    subscribe_observer(self, ErrObserver::new(next, error))
  }

  fn subscribe_all<N, E, C>(self, next: N, error: E, complete: C) -> SubscriptionHandle
  where
    N: FnMut(Item),
    E: FnOnce(Err),
    C: FnOnce(),
    Self: Observable<Item, Err, Subscriber<AllObserver<N, E, C>>>,
    <Self as Observable<Item, Err, Subscriber<AllObserver<N, E, C>>>>::Unsub: Send + 'static,
  {
    subscribe_observer(self, AllObserver::new(next, error, complete))
  }

  /// Subscribe a hand-written observer.
  fn subscribe_with<O>(self, observer: O) -> SubscriptionHandle
  where
    O: Observer<Item, Err>,
    Self: Observable<Item, Err, Subscriber<O>>,
    <Self as Observable<Item, Err, Subscriber<O>>>::Unsub: Send + 'static,
  {
    subscribe_observer(self, observer)
  }
}

fn pair<A, B>(a: A, b: B) -> (A, B) { (a, b) }
