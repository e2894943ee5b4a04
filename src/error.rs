//! Error types shared by every stream in the crate.
//!
//! [`RxError`] is the error type of the built-in factories (`just`, `range`,
//! `create`) and of the scheduler control functions. [`UnhandledError`] is the
//! payload carried by the fatal escalation of an error that reached a
//! subscription without an error handler.

use std::fmt;

use thiserror::Error;

/// Errors produced by the stream engine itself or raised by user code through
/// an emitter.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RxError {
  /// `range` was asked for a negative number of elements.
  #[error("range count must be non-negative, got {count}")]
  NegativeCount { count: i64 },

  /// The last element of a `range` does not fit in an `i64`.
  #[error("range starting at {start} with {count} elements overflows i64")]
  RangeOverflow { start: i64, count: i64 },

  /// A single-value sink was resolved a second time.
  #[error("single already resolved, rejected {signal}")]
  SingleAlreadyResolved { signal: &'static str },

  /// Work submitted to a scheduler that has been shut down.
  #[error("scheduler `{name}` is shut down")]
  SchedulerShutdown { name: String },

  /// `scheduler::init` called after the schedulers were configured.
  #[error("schedulers already initialized")]
  AlreadyInitialized,

  /// A scheduler name that does not match any known execution context.
  #[error("unknown scheduler `{0}`")]
  UnknownScheduler(String),

  /// A failure reported by user code as a plain message.
  #[error("{0}")]
  User(String),

  /// A failure reported by user code as an arbitrary error value.
  #[error(transparent)]
  Custom(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl RxError {
  pub fn user(msg: impl Into<String>) -> Self { RxError::User(msg.into()) }

  pub fn custom<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    RxError::Custom(Box::new(err))
  }

  /// Short, stable label for logs and metrics keys.
  pub fn as_label(&self) -> &'static str {
    match self {
      RxError::NegativeCount { .. } => "negative_count",
      RxError::RangeOverflow { .. } => "range_overflow",
      RxError::SingleAlreadyResolved { .. } => "single_already_resolved",
      RxError::SchedulerShutdown { .. } => "scheduler_shutdown",
      RxError::AlreadyInitialized => "already_initialized",
      RxError::UnknownScheduler(_) => "unknown_scheduler",
      RxError::User(_) => "user",
      RxError::Custom(_) => "custom",
    }
  }

  /// True for errors that signal misuse of the engine API rather than a
  /// failure inside user code.
  pub fn is_contract_violation(&self) -> bool {
    matches!(
      self,
      RxError::NegativeCount { .. }
        | RxError::RangeOverflow { .. }
        | RxError::SingleAlreadyResolved { .. }
    )
  }
}

impl From<&str> for RxError {
  fn from(msg: &str) -> Self { RxError::User(msg.to_owned()) }
}

impl From<String> for RxError {
  fn from(msg: String) -> Self { RxError::User(msg) }
}

/// An error that terminated a stream whose subscriber registered no error
/// handler.
///
/// This is the panic payload raised when no unhandled-error hook is
/// installed, so tests can recover it with `downcast_ref::<UnhandledError>()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnhandledError {
  message: String,
  thread: Option<String>,
}

impl UnhandledError {
  pub fn new<E: fmt::Debug>(err: &E) -> Self {
    UnhandledError {
      message: format!("{err:?}"),
      thread: std::thread::current().name().map(str::to_owned),
    }
  }

  /// The `Debug` rendering of the original error.
  pub fn message(&self) -> &str { &self.message }

  /// Name of the thread the error was delivered on, if it had one.
  pub fn thread(&self) -> Option<&str> { self.thread.as_deref() }
}

impl fmt::Display for UnhandledError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "stream terminated with an error but no error handler was registered: {}",
      self.message
    )?;
    if let Some(thread) = &self.thread {
      write!(f, " (on thread `{thread}`)")?;
    }
    Ok(())
  }
}

impl std::error::Error for UnhandledError {}
