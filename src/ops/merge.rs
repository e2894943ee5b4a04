use crate::{
  observable::{Observable, ObservableExt},
  observer::Observer,
  rc::MutArc,
  subscription::{MultiSubscription, Subscription},
};

/// Combine two Observables into one by merging their emissions.
///
/// Values are forwarded one at a time in arrival order, whatever thread they
/// arrive on. Across the two sources that order is not deterministic; within
/// one source it is preserved.
///
/// # Example
///
/// ```
/// use rxflow::prelude::*;
///
/// let evens = observable::just(0).merge(observable::just(2));
/// let odds = observable::just(1);
/// evens.merge(odds).subscribe(|v| println!("{v}"));
/// ```
#[derive(Clone)]
pub struct MergeOp<S1, S2> {
  source1: S1,
  source2: S2,
}

impl<S1, S2> MergeOp<S1, S2> {
  pub(crate) fn new(source1: S1, source2: S2) -> Self { MergeOp { source1, source2 } }
}

impl<Item, Err, O, S1, S2> Observable<Item, Err, O> for MergeOp<S1, S2>
where
  O: Observer<Item, Err>,
  S1: Observable<Item, Err, MergeObserver<O>>,
  S2: Observable<Item, Err, MergeObserver<O>>,
  S1::Unsub: Send + 'static,
  S2::Unsub: Send + 'static,
{
  type Unsub = MultiSubscription;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    let (subscription, make_observer) = MergeObserver::shared(observer, 2);
    subscription.add(self.source1.actual_subscribe(make_observer()));
    // The first source may already have failed synchronously.
    if !subscription.is_closed() {
      subscription.add(self.source2.actual_subscribe(make_observer()));
    }
    subscription
  }
}

impl<Item, Err, S1, S2> ObservableExt<Item, Err> for MergeOp<S1, S2>
where
  S1: ObservableExt<Item, Err>,
  S2: ObservableExt<Item, Err>,
{
}

/// Merges any number of sources of the same type, see [`merge`].
#[derive(Clone)]
pub struct MergeIterOp<S> {
  sources: Vec<S>,
}

/// Combine any number of Observables into one by merging their emissions.
///
/// An empty input completes immediately. Use
/// [`box_it`](ObservableExt::box_it) to merge sources of different types.
pub fn merge<I>(sources: I) -> MergeIterOp<I::Item>
where
  I: IntoIterator,
{
  MergeIterOp { sources: sources.into_iter().collect() }
}

impl<Item, Err, O, S> Observable<Item, Err, O> for MergeIterOp<S>
where
  O: Observer<Item, Err>,
  S: Observable<Item, Err, MergeObserver<O>>,
  S::Unsub: Send + 'static,
{
  type Unsub = MultiSubscription;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    if self.sources.is_empty() {
      observer.complete();
      let subscription = MultiSubscription::new();
      subscription.clone().unsubscribe();
      return subscription;
    }
    let (subscription, make_observer) = MergeObserver::shared(observer, self.sources.len());
    for source in self.sources {
      if subscription.is_closed() {
        break;
      }
      subscription.add(source.actual_subscribe(make_observer()));
    }
    subscription
  }
}

impl<Item, Err, S> ObservableExt<Item, Err> for MergeIterOp<S> where S: ObservableExt<Item, Err> {}

struct MergeState<O> {
  observer: Option<O>,
  active: usize,
}

/// One per merged source; all of them share the downstream observer.
pub struct MergeObserver<O> {
  state: MutArc<MergeState<O>>,
  subscription: MultiSubscription,
}

impl<O> MergeObserver<O> {
  fn shared(observer: O, active: usize) -> (MultiSubscription, impl Fn() -> Self) {
    let subscription = MultiSubscription::new();
    let state = MutArc::own(MergeState { observer: Some(observer), active });
    let c_subscription = subscription.clone();
    let make = move || MergeObserver { state: state.clone(), subscription: c_subscription.clone() };
    (subscription, make)
  }
}

impl<Item, Err, O> Observer<Item, Err> for MergeObserver<O>
where
  O: Observer<Item, Err>,
{
  fn next(&mut self, value: Item) {
    if self.subscription.is_closed() {
      return;
    }
    // Holding the lock while delivering serializes concurrent sources.
    self.state.rc_deref_mut().observer.next(value);
  }

  fn error(self, err: Err) {
    let observer = self.state.rc_deref_mut().observer.take();
    if let Some(observer) = observer {
      // Release the other sources first: delivery may unwind.
      self.subscription.unsubscribe();
      observer.error(err);
    }
  }

  fn complete(self) {
    let observer = {
      let mut state = self.state.rc_deref_mut();
      state.active = state.active.saturating_sub(1);
      if state.active == 0 {
        state.observer.take()
      } else {
        None
      }
    };
    if let Some(observer) = observer {
      self.subscription.unsubscribe();
      observer.complete();
    }
  }

  fn is_finished(&self) -> bool {
    self.subscription.is_closed() || self.state.rc_deref_mut().observer.is_finished()
  }
}
