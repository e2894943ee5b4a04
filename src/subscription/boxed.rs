use super::Subscription;

/// Helper trait for calling unsubscribe on boxed trait objects
///
/// Since `Subscription::unsubscribe(self)` requires `Sized`, we need this
/// workaround trait to enable `Box<dyn Subscription>` to call unsubscribe.
pub trait BoxedSubscriptionInner {
  fn boxed_unsubscribe(self: Box<Self>);
  fn boxed_is_closed(&self) -> bool;
}

impl<T: Subscription> BoxedSubscriptionInner for T {
  #[inline]
  fn boxed_unsubscribe(self: Box<Self>) { (*self).unsubscribe() }

  #[inline]
  fn boxed_is_closed(&self) -> bool { self.is_closed() }
}

/// A type-erased, thread-safe subscription.
///
/// Used wherever subscriptions of different concrete types are stored side
/// by side, as in [`MultiSubscription`](super::MultiSubscription) or a boxed
/// observable.
pub struct BoxSubscription(Box<dyn BoxedSubscriptionInner + Send>);

impl BoxSubscription {
  pub fn new<S: Subscription + Send + 'static>(subscription: S) -> Self {
    BoxSubscription(Box::new(subscription))
  }
}

impl Subscription for BoxSubscription {
  #[inline]
  fn unsubscribe(self) { self.0.boxed_unsubscribe() }

  #[inline]
  fn is_closed(&self) -> bool { self.0.boxed_is_closed() }
}

impl std::fmt::Debug for BoxSubscription {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("BoxSubscription")
      .field("is_closed", &self.is_closed())
      .finish()
  }
}
