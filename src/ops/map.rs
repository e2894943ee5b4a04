use crate::{
  observable::{Observable, ObservableExt},
  observer::Observer,
  type_hint::TypeHint,
};

pub struct MapOp<S, M, Item> {
  source: S,
  func: M,
  _hint: TypeHint<Item>,
}

impl<S, M, Item> MapOp<S, M, Item> {
  pub(crate) fn new(source: S, func: M) -> Self { MapOp { source, func, _hint: TypeHint::new() } }
}

impl<S: Clone, M: Clone, Item> Clone for MapOp<S, M, Item> {
  fn clone(&self) -> Self { MapOp::new(self.source.clone(), self.func.clone()) }
}

impl<Item, B, Err, O, S, M> Observable<B, Err, O> for MapOp<S, M, Item>
where
  O: Observer<B, Err>,
  S: Observable<Item, Err, MapObserver<O, M>>,
  M: FnMut(Item) -> B,
{
  type Unsub = S::Unsub;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    let map = self.func;
    self.source.actual_subscribe(MapObserver { observer, map })
  }
}

impl<Item, B, Err, S, M> ObservableExt<B, Err> for MapOp<S, M, Item>
where
  S: ObservableExt<Item, Err>,
  M: FnMut(Item) -> B,
{
}

pub struct MapObserver<O, M> {
  observer: O,
  map: M,
}

impl<Item, Err, O, M, B> Observer<Item, Err> for MapObserver<O, M>
where
  O: Observer<B, Err>,
  M: FnMut(Item) -> B,
{
  #[inline]
  fn next(&mut self, value: Item) { self.observer.next((self.map)(value)) }

  #[inline]
  fn error(self, err: Err) { self.observer.error(err) }

  #[inline]
  fn complete(self) { self.observer.complete() }

  #[inline]
  fn is_finished(&self) -> bool { self.observer.is_finished() }
}

// ============================================================================
// try_map
// ============================================================================

pub struct TryMapOp<S, M, Item> {
  source: S,
  func: M,
  _hint: TypeHint<Item>,
}

impl<S, M, Item> TryMapOp<S, M, Item> {
  pub(crate) fn new(source: S, func: M) -> Self {
    TryMapOp { source, func, _hint: TypeHint::new() }
  }
}

impl<S: Clone, M: Clone, Item> Clone for TryMapOp<S, M, Item> {
  fn clone(&self) -> Self { TryMapOp::new(self.source.clone(), self.func.clone()) }
}

impl<Item, B, Err, O, S, M> Observable<B, Err, O> for TryMapOp<S, M, Item>
where
  O: Observer<B, Err>,
  S: Observable<Item, Err, TryMapObserver<O, M>>,
  M: FnMut(Item) -> Result<B, Err>,
{
  type Unsub = S::Unsub;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    let map = self.func;
    self
      .source
      .actual_subscribe(TryMapObserver { observer: Some(observer), map })
  }
}

impl<Item, B, Err, S, M> ObservableExt<B, Err> for TryMapOp<S, M, Item>
where
  S: ObservableExt<Item, Err>,
  M: FnMut(Item) -> Result<B, Err>,
{
}

/// Gives up its downstream on the first failed mapping, which makes every
/// later signal from the source a no-op and reports `is_finished`.
pub struct TryMapObserver<O, M> {
  observer: Option<O>,
  map: M,
}

impl<Item, Err, O, M, B> Observer<Item, Err> for TryMapObserver<O, M>
where
  O: Observer<B, Err>,
  M: FnMut(Item) -> Result<B, Err>,
{
  fn next(&mut self, value: Item) {
    let Some(observer) = self.observer.as_mut() else {
      return;
    };
    match (self.map)(value) {
      Ok(v) => observer.next(v),
      Err(err) => {
        if let Some(observer) = self.observer.take() {
          observer.error(err)
        }
      }
    }
  }

  #[inline]
  fn error(self, err: Err) { self.observer.error(err) }

  #[inline]
  fn complete(self) { self.observer.complete() }

  #[inline]
  fn is_finished(&self) -> bool { self.observer.is_finished() }
}

#[cfg(test)]
mod tests {
  use bencher::benchmark_group;

  use crate::{observer::tests::Recorder, prelude::*};

  #[rxflow_macro::test]
  fn primitive_type() {
    let mut count = 0;
    let mut sum = 0;
    observable::range(1, 100).map(|e| e * 2).subscribe(|v| {
      count += 1;
      sum += v;
    });
    assert_eq!(count, 100);
    assert_eq!(sum, 10100);
  }

  #[rxflow_macro::test]
  fn reference_lifetime_should_work() {
    let mut sum = 0;
    observable::just(100).map(|v| v).subscribe(|v| sum += v);
    assert_eq!(sum, 100);
  }

  #[rxflow_macro::test]
  fn map_types_mixed() {
    let mut i = 0;
    observable::range(0, 3).map(|v| format!("#{v}")).subscribe(|_: String| i += 1);
    assert_eq!(i, 3);
  }

  #[rxflow_macro::test]
  fn try_map_fails_once_and_stops() {
    let record = Recorder::default();
    observable::range(1, 10)
      .try_map(|v| if v == 4 { Err(RxError::user("bad element")) } else { Ok(v * 10) })
      .subscribe_with(record.clone());

    let r = record.0.rc_deref_mut();
    assert_eq!(r.values, vec![10, 20, 30]);
    assert_eq!(r.errors.len(), 1);
    assert_eq!(r.errors[0].to_string(), "bad element");
    assert_eq!(r.completed, 0);
  }

  #[rxflow_macro::test]
  fn try_map_stops_source_early() {
    let mut seen = 0;
    observable::range(1, 1_000_000)
      .map(|v| {
        seen += 1;
        v
      })
      .try_map(|v| if v == 2 { Err(RxError::user("stop")) } else { Ok(v) })
      .subscribe_err(|_| {}, |_| {});
    assert_eq!(seen, 2);
  }

  #[rxflow_macro::test]
  fn clone_resubscribes() {
    let source = observable::range(1, 3).map(|v| v + 1);
    let mut sum = 0;
    source.clone().subscribe(|v| sum += v);
    source.subscribe(|v| sum += v);
    assert_eq!(sum, 18);
  }

  #[test]
  fn bench() { do_bench(); }

  benchmark_group!(do_bench, bench_map);

  fn bench_map(b: &mut bencher::Bencher) { b.iter(primitive_type); }
}
