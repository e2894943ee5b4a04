use crate::{
  error::RxError,
  observable::{Observable, ObservableExt},
  observer::{BoxObserver, Observer},
  subscription::Subscription,
  type_hint::TypeHint,
};

/// Creates an observable from a producer function.
///
/// The producer runs once per subscription and receives an owned [`Emitter`].
/// It may emit synchronously or move the emitter to another thread. It returns
/// the teardown to run once the subscription ends, by unsubscribe or by a
/// terminal signal; `()` when there is none.
///
/// # Examples
///
/// ```
/// use rxflow::prelude::*;
///
/// observable::create(|mut emitter: Emitter<&'static str, RxError>| {
///   emitter.next("one");
///   emitter.next("two");
///   emitter.complete();
/// })
/// .subscribe(|v| println!("{v}"));
/// ```
pub fn create<F, Item, U>(producer: F) -> Create<F, Item, RxError>
where
  F: FnOnce(Emitter<Item, RxError>) -> U,
  U: Subscription,
{
  Create::new(producer)
}

pub struct Create<F, Item, Err> {
  producer: F,
  _hint: TypeHint<(Item, Err)>,
}

impl<F: Clone, Item, Err> Clone for Create<F, Item, Err> {
  fn clone(&self) -> Self { Create { producer: self.producer.clone(), _hint: TypeHint::new() } }
}

impl<F, Item, Err> Create<F, Item, Err> {
  /// Same as [`create`], for any error type.
  pub fn new(producer: F) -> Self { Create { producer, _hint: TypeHint::new() } }
}

impl<F, Item, Err, O, U> Observable<Item, Err, O> for Create<F, Item, Err>
where
  O: Observer<Item, Err> + Send + 'static,
  F: FnOnce(Emitter<Item, Err>) -> U,
  U: Subscription,
{
  type Unsub = U;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    (self.producer)(Emitter(Some(Box::new(observer))))
  }
}

impl<F, Item, Err, U> ObservableExt<Item, Err> for Create<F, Item, Err> where
  F: FnOnce(Emitter<Item, Err>) -> U
{
}

/// The producer's side of a [`create`] subscription.
///
/// After `error` or `complete` every further call is a no-op.
pub struct Emitter<Item, Err>(Option<BoxObserver<Item, Err>>);

impl<Item, Err> Emitter<Item, Err> {
  pub fn next(&mut self, value: Item) {
    if let Some(observer) = &mut self.0 {
      observer.next(value);
    }
  }

  pub fn error(&mut self, err: Err) {
    if let Some(observer) = self.0.take() {
      observer.error(err);
    }
  }

  pub fn complete(&mut self) {
    if let Some(observer) = self.0.take() {
      observer.complete();
    }
  }

  /// True once the stream terminated or the downstream stopped listening.
  /// Long-running producers should poll this and stop.
  pub fn is_closed(&self) -> bool { self.0.as_ref().map_or(true, |o| o.is_finished()) }
}
