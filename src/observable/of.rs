use crate::{
  error::RxError,
  observable::{Observable, ObservableExt},
  observer::Observer,
};

/// Creates an observable producing a single value.
///
/// Emits `v` and completes, synchronously on the subscribing thread. Never
/// emits an error.
///
/// # Examples
///
/// ```
/// use rxflow::prelude::*;
///
/// observable::just(123).subscribe(|v| println!("{v}"));
/// ```
pub fn just<Item>(v: Item) -> Of<Item> { Of(v) }

#[derive(Clone, Debug)]
pub struct Of<Item>(pub(crate) Item);

impl<Item, O> Observable<Item, RxError, O> for Of<Item>
where
  O: Observer<Item, RxError>,
{
  type Unsub = ();

  fn actual_subscribe(self, mut observer: O) -> Self::Unsub {
    observer.next(self.0);
    observer.complete();
  }
}

impl<Item> ObservableExt<Item, RxError> for Of<Item> {}
