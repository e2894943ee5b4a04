//! Prelude module for convenient imports
//!
//! This module re-exports commonly used types and traits for easy access.

// Factories live behind the module name: `observable::just(..)`.
pub use crate::observable::{self, BoxOp, Create, Emitter, Observable, ObservableExt, Of, Range};
// Observer
pub use crate::observer::{BoxObserver, Observer};
// Subscription
pub use crate::subscription::{
  BoxSubscription, ClosureSubscription, MultiSubscription, Subscription, SubscriptionGuard,
};
pub use crate::{
  config::SchedulerConfig,
  error::{RxError, UnhandledError},
  error_policy,
  ops::complete_status::CompleteStatus,
  scheduler::{self, Scheduler, SchedulerKind, TaskHandle, TaskState},
  single::{Single, SingleEmitter},
  subscriber::{SubscriptionHandle, SubscriptionState},
};
