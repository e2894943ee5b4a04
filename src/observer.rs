//! Observer trait and implementations
//!
//! The Observer trait defines the consumer of a stream. It receives values
//! through `next`, and at most one terminal signal through `error` or
//! `complete`.

// ============================================================================
// Observer Trait
// ============================================================================

/// The consumer of a stream.
///
/// `error` and `complete` take the observer by value: once a terminal signal
/// is delivered there is no observer left to deliver anything else to.
pub trait Observer<Item, Err> {
  fn next(&mut self, value: Item);

  /// Terminate the stream with an error.
  fn error(self, err: Err);

  /// Terminate the stream normally.
  fn complete(self);

  /// Returns `true` when further signals would be discarded.
  ///
  /// Producers that loop (like `range`) or run in the background check this
  /// to stop early after an unsubscribe or a downstream failure.
  fn is_finished(&self) -> bool;
}

// ============================================================================
// DynObserver Trait - Object-safe Observer
// ============================================================================

/// Object-safe mirror of [`Observer`], so observers can be boxed.
pub trait DynObserver<Item, Err> {
  fn box_next(&mut self, value: Item);
  fn box_error(self: Box<Self>, err: Err);
  fn box_complete(self: Box<Self>);
  fn box_is_finished(&self) -> bool;
}

impl<T, Item, Err> DynObserver<Item, Err> for T
where
  T: Observer<Item, Err>,
{
  fn box_next(&mut self, value: Item) { self.next(value); }
  fn box_error(self: Box<Self>, err: Err) { self.error(err); }
  fn box_complete(self: Box<Self>) { self.complete(); }
  fn box_is_finished(&self) -> bool { self.is_finished() }
}

/// A type-erased observer that can cross threads.
pub type BoxObserver<Item, Err> = Box<dyn DynObserver<Item, Err> + Send>;

impl<Item, Err> Observer<Item, Err> for Box<dyn DynObserver<Item, Err> + Send> {
  #[inline]
  fn next(&mut self, value: Item) { (**self).box_next(value) }

  #[inline]
  fn error(self, err: Err) { self.box_error(err) }

  #[inline]
  fn complete(self) { self.box_complete() }

  #[inline]
  fn is_finished(&self) -> bool { (**self).box_is_finished() }
}

// ============================================================================
// Observer implementation for Option
// ============================================================================

/// None ignores all events, Some delegates to inner
impl<O, Item, Err> Observer<Item, Err> for Option<O>
where
  O: Observer<Item, Err>,
{
  fn next(&mut self, value: Item) {
    if let Some(inner) = self {
      inner.next(value);
    }
  }

  fn error(self, err: Err) {
    if let Some(inner) = self {
      inner.error(err);
    }
  }

  fn complete(self) {
    if let Some(inner) = self {
      inner.complete();
    }
  }

  fn is_finished(&self) -> bool { self.as_ref().map_or(true, O::is_finished) }
}

#[cfg(test)]
pub(crate) mod tests {
  use super::*;
  use crate::rc::MutArc;

  /// Records every signal it receives.
  pub(crate) struct Recorder<Item, Err>(pub(crate) MutArc<Record<Item, Err>>);

  impl<Item, Err> Clone for Recorder<Item, Err> {
    fn clone(&self) -> Self { Recorder(self.0.clone()) }
  }

  impl<Item, Err> Default for Recorder<Item, Err> {
    fn default() -> Self { Recorder(MutArc::own(Record::default())) }
  }

  pub(crate) struct Record<Item, Err> {
    pub(crate) values: Vec<Item>,
    pub(crate) errors: Vec<Err>,
    pub(crate) completed: usize,
  }

  impl<Item, Err> Default for Record<Item, Err> {
    fn default() -> Self { Record { values: vec![], errors: vec![], completed: 0 } }
  }

  impl<Item, Err> Observer<Item, Err> for Recorder<Item, Err> {
    fn next(&mut self, value: Item) { self.0.rc_deref_mut().values.push(value); }
    fn error(self, err: Err) { self.0.rc_deref_mut().errors.push(err); }
    fn complete(self) { self.0.rc_deref_mut().completed += 1; }
    fn is_finished(&self) -> bool { false }
  }

  #[rxflow_macro::test]
  fn boxed_observer_delegates() {
    let record = Recorder::<i32, ()>::default();
    let mut boxed: BoxObserver<i32, ()> = Box::new(record.clone());
    boxed.next(1);
    boxed.next(2);
    assert!(!boxed.is_finished());
    boxed.complete();

    let r = record.0.rc_deref_mut();
    assert_eq!(r.values, vec![1, 2]);
    assert_eq!(r.completed, 1);
  }
}
