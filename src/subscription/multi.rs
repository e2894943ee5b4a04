use std::{
  fmt::{Debug, Formatter},
  sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use smallvec::SmallVec;

use super::{BoxSubscription, Subscription};

/// A cloneable bag of teardowns shared by every part of one subscription.
///
/// Multi-source operators register each upstream subscription here; the first
/// terminal event unsubscribes the whole bag. Once closed, anything added is
/// unsubscribed immediately, so a source subscribed late (for example on a
/// scheduler thread) is still released.
#[derive(Clone, Default)]
pub struct MultiSubscription(Arc<Mutex<Inner>>);

#[derive(Default)]
struct Inner {
  closed: bool,
  teardown: SmallVec<[BoxSubscription; 2]>,
}

impl MultiSubscription {
  pub fn new() -> Self { Self::default() }

  pub fn add<S: Subscription + Send + 'static>(&self, subscription: S) {
    if subscription.is_closed() {
      return;
    }
    let mut inner = self.lock();
    if inner.closed {
      drop(inner);
      subscription.unsubscribe();
    } else {
      inner.teardown.retain(|v| !v.is_closed());
      inner.teardown.push(BoxSubscription::new(subscription));
    }
  }

  /// Number of teardowns still held.
  pub fn teardown_size(&self) -> usize { self.lock().teardown.len() }

  fn lock(&self) -> MutexGuard<'_, Inner> {
    self.0.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

impl Subscription for MultiSubscription {
  fn unsubscribe(self) {
    // Teardowns run outside the lock: an upstream teardown may re-enter this
    // bag through an operator that shares it.
    let teardown = {
      let mut inner = self.lock();
      if inner.closed {
        return;
      }
      inner.closed = true;
      std::mem::take(&mut inner.teardown)
    };
    for t in teardown {
      t.unsubscribe();
    }
  }

  #[inline]
  fn is_closed(&self) -> bool { self.lock().closed }
}

impl Debug for MultiSubscription {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    let inner = self.lock();
    f.debug_struct("MultiSubscription")
      .field("closed", &inner.closed)
      .field("teardown_count", &inner.teardown.len())
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::{AtomicUsize, Ordering};

  use super::*;
  use crate::subscription::ClosureSubscription;

  fn counter() -> (Arc<AtomicUsize>, impl Subscription + Send + 'static) {
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
  fn add_and_unsubscribe() {
    let multi = MultiSubscription::new();
    let (h1, s1) = counter();
    let (h2, s2) = counter();
    multi.add(s1);
    multi.add(s2);
    assert_eq!(multi.teardown_size(), 2);

    multi.clone().unsubscribe();
    assert!(multi.is_closed());
    assert_eq!(h1.load(Ordering::SeqCst), 1);
    assert_eq!(h2.load(Ordering::SeqCst), 1);

    // Idempotent through another clone.
    multi.clone().unsubscribe();
    assert_eq!(h1.load(Ordering::SeqCst), 1);
  }

  #[rxflow_macro::test]
  fn add_after_close_unsubscribes_immediately() {
    let multi = MultiSubscription::new();
    multi.clone().unsubscribe();
    let (hits, s) = counter();
    multi.add(s);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(multi.teardown_size(), 0);
  }

  #[rxflow_macro::test]
  fn closed_entries_are_pruned() {
    let multi = MultiSubscription::new();
    let inner = MultiSubscription::new();
    multi.add(inner.clone());
    inner.clone().unsubscribe();
    let (_hits, s) = counter();
    multi.add(s);
    assert_eq!(multi.teardown_size(), 1);
  }
}
