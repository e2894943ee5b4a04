use crate::{
  error::RxError,
  observable::{Observable, ObservableExt},
  observer::Observer,
};

/// Emits `count` sequential integers starting at `start`, then completes.
///
/// All values are pushed eagerly on the subscribing thread. Emission stops
/// early once the downstream is finished (unsubscribed or failed).
///
/// A negative `count` is a misuse and terminates the stream with
/// [`RxError::NegativeCount`] rather than completing empty. A range whose
/// last value would not fit in `i64` fails with [`RxError::RangeOverflow`].
pub fn range(start: i64, count: i64) -> Range { Range { start, count } }

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Range {
  start: i64,
  count: i64,
}

impl Range {
  fn check(&self) -> Result<(), RxError> {
    if self.count < 0 {
      return Err(RxError::NegativeCount { count: self.count });
    }
    if self.count > 0 && self.start.checked_add(self.count - 1).is_none() {
      return Err(RxError::RangeOverflow { start: self.start, count: self.count });
    }
    Ok(())
  }
}

impl<O> Observable<i64, RxError, O> for Range
where
  O: Observer<i64, RxError>,
{
  type Unsub = ();

  fn actual_subscribe(self, mut observer: O) -> Self::Unsub {
    if let Err(err) = self.check() {
      observer.error(err);
      return;
    }
    for offset in 0..self.count {
      if observer.is_finished() {
        return;
      }
      observer.next(self.start + offset);
    }
    observer.complete();
  }
}

impl ObservableExt<i64, RxError> for Range {}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::observer::tests::Recorder;

  #[rxflow_macro::test]
  fn emits_count_values_in_order() {
    for (start, count) in [(1, 100), (-5, 3), (0, 0), (i64::MAX, 1)] {
      let record = Recorder::default();
      range(start, count).subscribe_with(record.clone());

      let r = record.0.rc_deref_mut();
      let expected: Vec<i64> = (0..count).map(|i| start + i).collect();
      assert_eq!(r.values, expected);
      assert_eq!(r.completed, 1);
      assert!(r.errors.is_empty());
    }
  }

  #[rxflow_macro::test]
  fn negative_count_is_an_error() {
    let record = Recorder::default();
    range(1, -1).subscribe_with(record.clone());

    let r = record.0.rc_deref_mut();
    assert!(r.values.is_empty());
    assert_eq!(r.completed, 0);
    assert!(matches!(r.errors[..], [RxError::NegativeCount { count: -1 }]));
  }

  #[rxflow_macro::test]
  fn overflow_is_an_error() {
    let record = Recorder::default();
    range(i64::MAX, 2).subscribe_with(record.clone());

    let r = record.0.rc_deref_mut();
    assert!(r.values.is_empty());
    assert!(matches!(r.errors[..], [RxError::RangeOverflow { .. }]));
  }
}
