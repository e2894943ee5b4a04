//! # rxflow: push-based reactive streams
//!
//! Cold observables, composable operators and thread-hopping schedulers.
//!
//! ## Quick Start
//!
//! ```rust
//! use rxflow::prelude::*;
//!
//! observable::range(1, 10)
//!   .map(|v| v * 2)
//!   .subscribe(|v| println!("Value: {}", v));
//! ```
//!
//! ## Key Concepts
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Observable`] | A cold description of a producer, run once per subscription |
//! | [`Observer`] | Consumes `next`, `error`, and `complete` events |
//! | [`Subscription`] | Handle to cancel an active subscription |
//! | [`Scheduler`] | Execution context that `subscribe_on` hands work to |
//! | [`Single`] | An observable of exactly one value or one error |
//!
//! ## Errors without a handler
//!
//! A stream subscribed with [`subscribe`](ObservableExt::subscribe) alone has
//! nowhere to deliver an error. Such an error is escalated through
//! [`error_policy`]: it is logged and, unless a hook is installed, raised as a
//! panic carrying an [`UnhandledError`].
//!
//! ## Feature Flags
//!
//! - **`tokio-scheduler`**: implements [`Scheduler`] for a tokio runtime
//!   handle
//!
//! [`Observable`]: observable::Observable
//! [`Observer`]: observer::Observer
//! [`Subscription`]: subscription::Subscription
//! [`Scheduler`]: scheduler::Scheduler
//! [`Single`]: single::Single
//! [`UnhandledError`]: error::UnhandledError

pub mod config;
pub mod error;
pub mod error_policy;
pub mod observable;
pub mod observer;
pub mod ops;
pub mod prelude;
pub mod rc;
pub mod scheduler;
pub mod single;
pub mod subscriber;
pub mod subscription;
pub mod type_hint;

// Re-export the prelude module
pub use prelude::*;

// Run the README snippets as doctests.
#[cfg(doctest)]
mod __markdown_doctests {
  mod readme {
    #![doc = include_str!("../README.md")]
  }
}
