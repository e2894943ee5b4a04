use std::collections::VecDeque;

use crate::{
  observable::{Observable, ObservableExt},
  observer::Observer,
  rc::MutArc,
  subscription::{MultiSubscription, Subscription},
  type_hint::TypeHint,
};

/// Combine the i-th values of two sources with `combiner`.
///
/// Factory form of [`ObservableExt::zip_with`].
pub fn zip<A, B, F, ItemA, ItemB, Out, Err>(a: A, b: B, combiner: F) -> ZipOp<A, B, F, (ItemA, ItemB)>
where
  A: ObservableExt<ItemA, Err>,
  B: ObservableExt<ItemB, Err>,
  F: FnMut(ItemA, ItemB) -> Out,
{
  ZipOp::new(a, b, combiner)
}

/// Pairs values from two sources by arrival index.
///
/// Values wait in a per-source buffer until the other source produced the
/// value with the same index. The zipped stream completes as soon as a
/// completed source has nothing left to pair, and fails on the first error
/// from either side, dropping whatever is still buffered.
pub struct ZipOp<A, B, F, Items> {
  a: A,
  b: B,
  combiner: F,
  _hint: TypeHint<Items>,
}

impl<A, B, F, Items> ZipOp<A, B, F, Items> {
  pub(crate) fn new(a: A, b: B, combiner: F) -> Self {
    ZipOp { a, b, combiner, _hint: TypeHint::new() }
  }
}

impl<A: Clone, B: Clone, F: Clone, Items> Clone for ZipOp<A, B, F, Items> {
  fn clone(&self) -> Self { ZipOp::new(self.a.clone(), self.b.clone(), self.combiner.clone()) }
}

impl<A, B, F, ItemA, ItemB, Out, Err, O> Observable<Out, Err, O> for ZipOp<A, B, F, (ItemA, ItemB)>
where
  O: Observer<Out, Err>,
  F: FnMut(ItemA, ItemB) -> Out,
  A: Observable<ItemA, Err, ZipAObserver<O, F, ItemA, ItemB>>,
  B: Observable<ItemB, Err, ZipBObserver<O, F, ItemA, ItemB>>,
  A::Unsub: Send + 'static,
  B::Unsub: Send + 'static,
{
  type Unsub = MultiSubscription;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    let subscription = MultiSubscription::new();
    let state = MutArc::own(ZipState {
      observer: Some(observer),
      combiner: self.combiner,
      buffer_a: VecDeque::new(),
      buffer_b: VecDeque::new(),
      completed_a: false,
      completed_b: false,
    });
    let a_observer = ZipAObserver { state: state.clone(), subscription: subscription.clone() };
    subscription.add(self.a.actual_subscribe(a_observer));
    if !subscription.is_closed() {
      let b_observer = ZipBObserver { state, subscription: subscription.clone() };
      subscription.add(self.b.actual_subscribe(b_observer));
    }
    subscription
  }
}

impl<A, B, F, ItemA, ItemB, Out, Err> ObservableExt<Out, Err> for ZipOp<A, B, F, (ItemA, ItemB)>
where
  A: ObservableExt<ItemA, Err>,
  B: ObservableExt<ItemB, Err>,
  F: FnMut(ItemA, ItemB) -> Out,
{
}

struct ZipState<O, F, ItemA, ItemB> {
  observer: Option<O>,
  combiner: F,
  buffer_a: VecDeque<ItemA>,
  buffer_b: VecDeque<ItemB>,
  completed_a: bool,
  completed_b: bool,
}

impl<O, F, ItemA, ItemB> ZipState<O, F, ItemA, ItemB> {
  /// Once one side completed with an empty buffer nothing can be paired
  /// anymore; hands back the observer to complete.
  fn take_if_done(&mut self) -> Option<O> {
    let done = (self.completed_a && self.buffer_a.is_empty())
      || (self.completed_b && self.buffer_b.is_empty());
    if done {
      self.buffer_a.clear();
      self.buffer_b.clear();
      self.observer.take()
    } else {
      None
    }
  }

  fn take_for_error(&mut self) -> Option<O> {
    self.buffer_a.clear();
    self.buffer_b.clear();
    self.observer.take()
  }
}

// Both helpers release the sources before delivering, so a panicking
// downstream cannot leave one of them subscribed.
fn finish<Out, Err, O>(observer: Option<O>, subscription: MultiSubscription)
where
  O: Observer<Out, Err>,
{
  if let Some(observer) = observer {
    subscription.unsubscribe();
    observer.complete();
  }
}

fn fail<Out, Err, O>(observer: Option<O>, err: Err, subscription: MultiSubscription)
where
  O: Observer<Out, Err>,
{
  if let Some(observer) = observer {
    subscription.unsubscribe();
    observer.error(err);
  }
}

pub struct ZipAObserver<O, F, ItemA, ItemB> {
  state: MutArc<ZipState<O, F, ItemA, ItemB>>,
  subscription: MultiSubscription,
}

pub struct ZipBObserver<O, F, ItemA, ItemB> {
  state: MutArc<ZipState<O, F, ItemA, ItemB>>,
  subscription: MultiSubscription,
}

impl<O, F, ItemA, ItemB, Out, Err> Observer<ItemA, Err> for ZipAObserver<O, F, ItemA, ItemB>
where
  O: Observer<Out, Err>,
  F: FnMut(ItemA, ItemB) -> Out,
{
  fn next(&mut self, value: ItemA) {
    if self.subscription.is_closed() {
      return;
    }
    let done = {
      let mut state = self.state.rc_deref_mut();
      let state = &mut *state;
      if state.observer.is_none() {
        return;
      }
      match state.buffer_b.pop_front() {
        Some(b) => {
          let out = (state.combiner)(value, b);
          state.observer.next(out);
        }
        None => state.buffer_a.push_back(value),
      }
      state.take_if_done()
    };
    finish::<Out, Err, O>(done, self.subscription.clone());
  }

  fn error(self, err: Err) {
    let observer = self.state.rc_deref_mut().take_for_error();
    fail::<Out, Err, O>(observer, err, self.subscription);
  }

  fn complete(self) {
    let done = {
      let mut state = self.state.rc_deref_mut();
      state.completed_a = true;
      state.take_if_done()
    };
    finish::<Out, Err, O>(done, self.subscription);
  }

  fn is_finished(&self) -> bool {
    self.subscription.is_closed() || self.state.rc_deref_mut().observer.is_finished()
  }
}

impl<O, F, ItemA, ItemB, Out, Err> Observer<ItemB, Err> for ZipBObserver<O, F, ItemA, ItemB>
where
  O: Observer<Out, Err>,
  F: FnMut(ItemA, ItemB) -> Out,
{
  fn next(&mut self, value: ItemB) {
    if self.subscription.is_closed() {
      return;
    }
    let done = {
      let mut state = self.state.rc_deref_mut();
      let state = &mut *state;
      if state.observer.is_none() {
        return;
      }
      match state.buffer_a.pop_front() {
        Some(a) => {
          let out = (state.combiner)(a, value);
          state.observer.next(out);
        }
        None => state.buffer_b.push_back(value),
      }
      state.take_if_done()
    };
    finish::<Out, Err, O>(done, self.subscription.clone());
  }

  fn error(self, err: Err) {
    let observer = self.state.rc_deref_mut().take_for_error();
    fail::<Out, Err, O>(observer, err, self.subscription);
  }

  fn complete(self) {
    let done = {
      let mut state = self.state.rc_deref_mut();
      state.completed_b = true;
      state.take_if_done()
    };
    finish::<Out, Err, O>(done, self.subscription);
  }

  fn is_finished(&self) -> bool {
    self.subscription.is_closed() || self.state.rc_deref_mut().observer.is_finished()
  }
}

#[cfg(test)]
mod tests {
  use std::{
    panic::{catch_unwind, AssertUnwindSafe},
    sync::{
      atomic::{AtomicUsize, Ordering},
      mpsc, Arc,
    },
    thread,
  };

  use crate::{observer::tests::Recorder, prelude::*};

  fn counting_source(
    slot: mpsc::Sender<Emitter<i64, RxError>>,
    torn_down: Arc<AtomicUsize>,
  ) -> Create<impl FnOnce(Emitter<i64, RxError>) -> ClosureSubscription<Box<dyn FnOnce() + Send>>, i64, RxError>
  {
    observable::create(move |e: Emitter<i64, RxError>| {
      slot.send(e).unwrap();
      ClosureSubscription::new(Box::new(move || {
        torn_down.fetch_add(1, Ordering::SeqCst);
      }) as Box<dyn FnOnce() + Send>)
    })
  }

  #[rxflow_macro::test]
  fn smoke() {
    let record = Recorder::default();
    observable::range(0, 5)
      .zip(observable::range(10, 3))
      .subscribe_with(record.clone());

    let r = record.0.rc_deref_mut();
    assert_eq!(r.values, vec![(0, 10), (1, 11), (2, 12)]);
    assert_eq!(r.completed, 1);
  }

  #[rxflow_macro::test]
  fn combiner_is_applied_per_index() {
    let record = Recorder::default();
    observable::zip(observable::range(1, 3), observable::range(1, 3), |a, b| a * b)
      .subscribe_with(record.clone());
    assert_eq!(record.0.rc_deref_mut().values, vec![1, 4, 9]);
  }

  #[rxflow_macro::test]
  fn completes_when_shorter_side_is_drained() {
    let record = Recorder::<(i64, i64), RxError>::default();
    let (tx, rx) = mpsc::channel();
    let tx_b = tx.clone();
    let a = observable::create(move |e: Emitter<i64, RxError>| tx.send(e).unwrap());
    let b = observable::create(move |e: Emitter<i64, RxError>| tx_b.send(e).unwrap());
    let handle = a.zip(b).subscribe_with(record.clone());
    let mut emitters: Vec<_> = rx.try_iter().collect();
    let mut b = emitters.pop().unwrap();
    let mut a = emitters.pop().unwrap();

    a.next(1);
    a.next(2);
    a.complete();
    // `a` still has buffered values, so the zip keeps going.
    assert_eq!(record.0.rc_deref_mut().completed, 0);
    b.next(10);
    assert_eq!(record.0.rc_deref_mut().completed, 0);
    b.next(20);

    let r = record.0.rc_deref_mut();
    assert_eq!(r.values, vec![(1, 10), (2, 20)]);
    assert_eq!(r.completed, 1);
    assert!(b.is_closed());
    assert_eq!(handle.state(), SubscriptionState::Completed);
  }

  #[rxflow_macro::test]
  fn error_discards_buffer_and_stops() {
    let record = Recorder::<(i64, i64), RxError>::default();
    let (tx, rx) = mpsc::channel();
    let a = observable::create(move |e: Emitter<i64, RxError>| tx.send(e).unwrap());
    let b = observable::create(|mut e: Emitter<i64, RxError>| {
      e.next(10);
      e.error(RxError::user("b failed"));
    });
    a.zip(b).subscribe_with(record.clone());
    let mut a = rx.recv().unwrap();
    assert!(a.is_closed());
    a.next(1);

    let r = record.0.rc_deref_mut();
    assert!(r.values.is_empty());
    assert_eq!(r.errors.len(), 1);
    assert_eq!(r.completed, 0);
  }

  #[rxflow_macro::test]
  fn threaded_sources_pair_by_index() {
    let words = |first: &'static str, second: &'static str| {
      observable::create(move |mut e: Emitter<&'static str, RxError>| {
        thread::spawn(move || {
          e.next(first);
          e.next(second);
          e.complete();
        });
      })
    };
    let (zipped, status) = words("one", "two")
      .zip_with(words("three", "four"), |a, b| format!("{a} {b}"))
      .complete_status();
    let record = Recorder::default();
    zipped.subscribe_with(record.clone());
    CompleteStatus::wait_for_end(status);

    let r = record.0.rc_deref_mut();
    assert_eq!(r.values, vec!["one three".to_string(), "two four".to_string()]);
    assert_eq!(r.completed, 1);
  }

  #[rxflow_macro::test]
  fn unsubscribe_reaches_both_sides() {
    let torn_down = Arc::new(AtomicUsize::new(0));
    let (tx, rx) = mpsc::channel();
    let record = Recorder::<(i64, i64), RxError>::default();
    let handle = counting_source(tx.clone(), torn_down.clone())
      .zip(counting_source(tx, torn_down.clone()))
      .subscribe_with(record.clone());
    let mut emitters: Vec<_> = rx.try_iter().collect();
    assert_eq!(emitters.len(), 2);

    emitters[0].next(1);
    emitters[1].next(10);
    emitters[0].next(2);
    handle.unsubscribe();
    assert_eq!(torn_down.load(Ordering::SeqCst), 2);

    // The buffered 2 never finds a partner.
    for e in emitters.iter_mut() {
      assert!(e.is_closed());
      e.next(20);
    }
    let r = record.0.rc_deref_mut();
    assert_eq!(r.values, vec![(1, 10)]);
    assert_eq!(r.completed, 0);
  }

  #[rxflow_macro::test]
  fn closed_zip_drops_late_values() {
    let torn_down = Arc::new(AtomicUsize::new(0));
    let (tx, rx) = mpsc::channel();
    let record = Recorder::<(i64, i64), RxError>::default();
    let subscription = counting_source(tx.clone(), torn_down.clone())
      .zip(counting_source(tx, torn_down.clone()))
      .actual_subscribe(record.clone());
    let mut emitters: Vec<_> = rx.try_iter().collect();
    emitters[0].next(1);

    subscription.unsubscribe();
    assert_eq!(torn_down.load(Ordering::SeqCst), 2);
    emitters[1].next(10);
    assert!(record.0.rc_deref_mut().values.is_empty());
  }

  #[rxflow_macro::test]
  fn panicking_downstream_still_releases_other_side() {
    let torn_down = Arc::new(AtomicUsize::new(0));
    let (tx, rx) = mpsc::channel();
    let failing = observable::create(|mut e: Emitter<i64, RxError>| e.error(RxError::user("fail")));
    let result = catch_unwind(AssertUnwindSafe(|| {
      counting_source(tx, torn_down.clone()).zip(failing).subscribe(|_| {});
    }));

    assert!(result.is_err());
    assert_eq!(torn_down.load(Ordering::SeqCst), 1);
    assert!(rx.recv().unwrap().is_closed());
  }
}
