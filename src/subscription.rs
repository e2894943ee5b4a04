//! Cancellation handles.
//!
//! A [`Subscription`] is returned by every subscribe call. Unsubscribing is
//! idempotent and transitively releases everything upstream of it.

mod boxed;
mod multi;

pub use boxed::*;
pub use multi::*;

// ============================================================================
// Subscription Trait
// ============================================================================

pub trait Subscription {
  /// Stop receiving signals and release upstream resources.
  ///
  /// Consumes the handle, so the same handle cannot be unsubscribed twice.
  /// Handles that are shared through cloning treat repeated calls as no-ops.
  fn unsubscribe(self);

  fn is_closed(&self) -> bool;
}

/// The teardown of a producer that holds no resources.
impl Subscription for () {
  #[inline]
  fn unsubscribe(self) {}

  #[inline]
  fn is_closed(&self) -> bool { true }
}

impl<T: Subscription> Subscription for Option<T> {
  #[inline]
  fn unsubscribe(self) {
    if let Some(inner) = self {
      inner.unsubscribe()
    }
  }

  #[inline]
  fn is_closed(&self) -> bool { self.as_ref().map_or(true, T::is_closed) }
}

// ============================================================================
// ClosureSubscription
// ============================================================================

/// Runs a closure once when unsubscribed.
pub struct ClosureSubscription<F>(Option<F>);

impl<F: FnOnce()> ClosureSubscription<F> {
  pub fn new(teardown: F) -> Self { ClosureSubscription(Some(teardown)) }
}

impl<F: FnOnce()> Subscription for ClosureSubscription<F> {
  fn unsubscribe(mut self) {
    if let Some(f) = self.0.take() {
      f()
    }
  }

  #[inline]
  fn is_closed(&self) -> bool { self.0.is_none() }
}

// ============================================================================
// SubscriptionGuard
// ============================================================================

/// An RAII implementation of a "scoped subscribed" of a subscription.
/// When this structure is dropped (falls out of scope), the subscription will
/// be unsubscribed.
///
/// If you want to drop it immediately, wrap it in its own scope.
#[must_use]
pub struct SubscriptionGuard<T: Subscription>(Option<T>);

impl<T: Subscription> SubscriptionGuard<T> {
  /// Wraps an existing subscription with a guard to enable RAII behavior for
  /// it.
  pub fn new(subscription: T) -> SubscriptionGuard<T> {
    SubscriptionGuard(Some(subscription))
  }

  /// Gives the subscription back without unsubscribing it.
  pub fn into_inner(mut self) -> Option<T> { self.0.take() }

  pub fn is_closed(&self) -> bool { self.0.is_closed() }
}

impl<T: Subscription> Drop for SubscriptionGuard<T> {
  #[inline]
  fn drop(&mut self) {
    if let Some(s) = self.0.take() {
      s.unsubscribe()
    }
  }
}
