//! What happens to an error that reaches a subscriber without an error
//! handler.
//!
//! Such an error is never swallowed. It is logged, wrapped in an
//! [`UnhandledError`] and handed to the process-wide hook. With no hook
//! installed the engine panics with the `UnhandledError` as payload, on the
//! thread that delivered the error.
//!
//! ```rust,no_run
//! rxflow::error_policy::set_unhandled_error_hook(|err| {
//!   eprintln!("fatal: {err}");
//!   std::process::abort();
//! });
//! ```

use std::{
  fmt::Debug,
  sync::{Arc, PoisonError, RwLock},
};

use once_cell::sync::Lazy;

use crate::error::UnhandledError;

type Hook = Arc<dyn Fn(&UnhandledError) + Send + Sync>;

static HOOK: Lazy<RwLock<Option<Hook>>> = Lazy::new(|| RwLock::new(None));

/// Install the process-wide handler for unhandled stream errors, replacing
/// the previous one.
///
/// The hook runs on whichever thread delivered the error.
pub fn set_unhandled_error_hook<F>(hook: F)
where
  F: Fn(&UnhandledError) + Send + Sync + 'static,
{
  *HOOK.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(hook));
}

/// Restore the default behavior of panicking on unhandled errors.
pub fn reset_unhandled_error_hook() {
  *HOOK.write().unwrap_or_else(PoisonError::into_inner) = None;
}

/// Escalate `err`. Called by subscribers that registered no error handler.
pub fn on_unhandled_error<E: Debug>(err: &E) {
  let unhandled = UnhandledError::new(err);
  tracing::error!(
    error = %unhandled.message(),
    thread = unhandled.thread().unwrap_or("<unnamed>"),
    "unhandled stream error"
  );

  let hook = HOOK.read().unwrap_or_else(PoisonError::into_inner).clone();
  match hook {
    Some(hook) => hook(&unhandled),
    None => std::panic::panic_any(unhandled),
  }
}

#[cfg(test)]
mod tests {
  use std::panic::{catch_unwind, AssertUnwindSafe};

  use super::*;
  use crate::error::RxError;

  #[rxflow_macro::test]
  fn panics_with_unhandled_error_payload() {
    // Runs without a hook: the only test touching the hook lives in its own
    // integration test binary.
    let payload = catch_unwind(AssertUnwindSafe(|| {
      on_unhandled_error(&RxError::user("boom"))
    }))
    .expect_err("unhandled error must panic");

    let err = payload
      .downcast_ref::<UnhandledError>()
      .expect("payload is an UnhandledError");
    assert_eq!(err.message(), "User(\"boom\")");
  }
}
