use std::{
  fmt::{Debug, Formatter},
  sync::{Arc, Mutex, MutexGuard, PoisonError},
};

/// Shared mutable state handed to every observer of one subscription.
///
/// Locking never fails: a user callback may panic while the state is borrowed,
/// and the remaining observers still need to reach a terminal state, so a
/// poisoned lock is recovered.
#[derive(Default)]
pub struct MutArc<T>(Arc<Mutex<T>>);

impl<T> MutArc<T> {
  pub fn own(t: T) -> Self { Self(Arc::new(Mutex::new(t))) }

  #[inline]
  pub fn rc_deref_mut(&self) -> MutexGuard<'_, T> {
    self.0.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Number of live handles to the same state.
  pub fn ref_count(&self) -> usize { Arc::strong_count(&self.0) }
}

impl<T> Clone for MutArc<T> {
  #[inline]
  fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl<T: Debug> Debug for MutArc<T> {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_tuple("MutArc").field(&*self.rc_deref_mut()).finish()
  }
}
