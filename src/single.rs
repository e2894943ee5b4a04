//! Streams of exactly one value or one error.
//!
//! A [`Single`] is an ordinary observable whose producer is limited to one
//! outcome: `success(v)`, delivered downstream as `next(v)` followed by
//! `complete`, or `error(e)`. Because it is still an observable it can be
//! subscribed and composed like one.

use tracing::error;

use crate::{
  error::RxError,
  observable::{Observable, ObservableExt, Of},
  observer::{BoxObserver, Observer},
  ops::{merge::MergeOp, subscribe_on::SubscribeOnOp},
  scheduler::Scheduler,
  subscription::Subscription,
  type_hint::TypeHint,
};

#[derive(Clone)]
pub struct Single<S>(S);

impl<Item> Single<Of<Item>> {
  /// A single that succeeds with `v` as soon as it is subscribed.
  pub fn just(v: Item) -> Self { Single(crate::observable::just(v)) }
}

impl<F, Item> Single<SingleCreate<F, Item>> {
  /// Creates a single from a producer function.
  ///
  /// The producer runs once per subscription and receives a
  /// [`SingleEmitter`], which it may resolve synchronously or move to another
  /// thread. Like [`create`](crate::observable::create) it returns the
  /// teardown to run on unsubscribe.
  ///
  /// ```
  /// use rxflow::prelude::*;
  ///
  /// Single::create(|mut emitter: SingleEmitter<u32>| {
  ///   emitter.success(42).ok();
  /// })
  /// .subscribe(|v| assert_eq!(v, 42));
  /// ```
  pub fn create<U>(producer: F) -> Self
  where
    F: FnOnce(SingleEmitter<Item>) -> U,
    U: Subscription,
  {
    Single(SingleCreate { producer, _hint: TypeHint::new() })
  }
}

impl<S> Single<S> {
  /// Run the subscription on `scheduler`; the result is still a `Single`.
  pub fn subscribe_on<SD: Scheduler>(self, scheduler: SD) -> Single<SubscribeOnOp<S, SD>> {
    Single(SubscribeOnOp::new(self.0, scheduler))
  }

  /// Merge two singles into a stream of exactly two values.
  ///
  /// The values arrive in the order the two singles resolve, which is not
  /// deterministic when they resolve on different threads. An error from
  /// either side terminates the merged stream.
  pub fn merge_with<S2>(self, other: Single<S2>) -> MergeOp<S, S2> { MergeOp::new(self.0, other.0) }
}

impl<Item, Err, O, S> Observable<Item, Err, O> for Single<S>
where
  O: Observer<Item, Err>,
  S: Observable<Item, Err, O>,
{
  type Unsub = S::Unsub;

  #[inline]
  fn actual_subscribe(self, observer: O) -> Self::Unsub { self.0.actual_subscribe(observer) }
}

impl<Item, Err, S> ObservableExt<Item, Err> for Single<S> where S: ObservableExt<Item, Err> {}

pub struct SingleCreate<F, Item> {
  producer: F,
  _hint: TypeHint<Item>,
}

impl<F: Clone, Item> Clone for SingleCreate<F, Item> {
  fn clone(&self) -> Self {
    SingleCreate { producer: self.producer.clone(), _hint: TypeHint::new() }
  }
}

impl<F, Item, O, U> Observable<Item, RxError, O> for SingleCreate<F, Item>
where
  O: Observer<Item, RxError> + Send + 'static,
  F: FnOnce(SingleEmitter<Item>) -> U,
  U: Subscription,
{
  type Unsub = U;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    (self.producer)(SingleEmitter { observer: Some(Box::new(observer)) })
  }
}

impl<F, Item, U> ObservableExt<Item, RxError> for SingleCreate<F, Item> where
  F: FnOnce(SingleEmitter<Item>) -> U
{
}

/// The producer's side of a [`Single::create`] subscription.
///
/// The first `success` or `error` resolves it. A later call is a producer
/// bug, and it is reported as an error on that call itself: the call returns
/// `Err(`[`RxError::SingleAlreadyResolved`]`)` and logs the rejection at error
/// level. The downstream already received its one terminal signal, so it
/// never sees the second call.
///
/// ```
/// use rxflow::prelude::*;
///
/// Single::create(|mut emitter: SingleEmitter<u32>| {
///   assert!(emitter.success(1).is_ok());
///   let second = emitter.success(2);
///   assert!(matches!(second, Err(RxError::SingleAlreadyResolved { .. })));
/// })
/// .subscribe(|v| assert_eq!(v, 1));
/// ```
pub struct SingleEmitter<Item> {
  observer: Option<BoxObserver<Item, RxError>>,
}

impl<Item> SingleEmitter<Item> {
  pub fn success(&mut self, value: Item) -> Result<(), RxError> {
    let Some(mut observer) = self.observer.take() else {
      return Err(already_resolved("success"));
    };
    observer.next(value);
    observer.complete();
    Ok(())
  }

  pub fn error(&mut self, err: RxError) -> Result<(), RxError> {
    match self.observer.take() {
      Some(observer) => {
        observer.error(err);
        Ok(())
      }
      None => Err(already_resolved("error")),
    }
  }

  /// True once the single was resolved or the downstream unsubscribed.
  pub fn is_disposed(&self) -> bool { self.observer.as_ref().map_or(true, |o| o.is_finished()) }
}

fn already_resolved(signal: &'static str) -> RxError {
  let err = RxError::SingleAlreadyResolved { signal };
  error!(signal, "{err}");
  err
}
