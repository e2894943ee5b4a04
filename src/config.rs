//! Scheduler configuration.
//!
//! The shared `io` and `computation` pools read a [`SchedulerConfig`] the
//! first time one of them is used: the value passed to
//! [`scheduler::init`](crate::scheduler::init), or [`SchedulerConfig::from_env`]
//! when `init` was never called.
//!
//! | variable | field |
//! |---|---|
//! | `RXFLOW_COMPUTATION_THREADS` | `computation_threads` |
//! | `RXFLOW_IO_MAX_THREADS` | `io_max_threads` |
//! | `RXFLOW_IO_KEEP_ALIVE_MS` | `io_keep_alive` |
//! | `RXFLOW_THREAD_PREFIX` | `thread_name_prefix` |

use std::{env, str::FromStr, time::Duration};

use tracing::warn;

pub const ENV_COMPUTATION_THREADS: &str = "RXFLOW_COMPUTATION_THREADS";
pub const ENV_IO_MAX_THREADS: &str = "RXFLOW_IO_MAX_THREADS";
pub const ENV_IO_KEEP_ALIVE_MS: &str = "RXFLOW_IO_KEEP_ALIVE_MS";
pub const ENV_THREAD_PREFIX: &str = "RXFLOW_THREAD_PREFIX";

/// Sizing of the process-wide scheduler pools.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchedulerConfig {
  /// Fixed number of workers of the computation pool.
  pub computation_threads: usize,
  /// Upper bound of the io pool. The pool starts empty and grows on demand.
  pub io_max_threads: usize,
  /// How long an idle io worker waits for work before it exits.
  pub io_keep_alive: Duration,
  /// Prefix of every worker thread name, e.g. `rxflow-io-3`.
  pub thread_name_prefix: String,
}

impl Default for SchedulerConfig {
  fn default() -> Self {
    SchedulerConfig {
      computation_threads: available_cpus(),
      io_max_threads: 256,
      io_keep_alive: Duration::from_secs(60),
      thread_name_prefix: "rxflow".to_string(),
    }
  }
}

impl SchedulerConfig {
  /// Defaults overridden by the `RXFLOW_*` environment variables.
  ///
  /// A variable that does not parse (or a zero thread count) is ignored with
  /// a warning.
  pub fn from_env() -> Self {
    let mut cfg = SchedulerConfig::default();
    if let Some(n) = read_thread_count(ENV_COMPUTATION_THREADS) {
      cfg.computation_threads = n;
    }
    if let Some(n) = read_thread_count(ENV_IO_MAX_THREADS) {
      cfg.io_max_threads = n;
    }
    if let Some(ms) = read_env::<u64>(ENV_IO_KEEP_ALIVE_MS) {
      cfg.io_keep_alive = Duration::from_millis(ms);
    }
    if let Ok(prefix) = env::var(ENV_THREAD_PREFIX) {
      if !prefix.is_empty() {
        cfg.thread_name_prefix = prefix;
      }
    }
    cfg
  }

  pub fn with_computation_threads(mut self, n: usize) -> Self {
    self.computation_threads = n.max(1);
    self
  }

  pub fn with_io_max_threads(mut self, n: usize) -> Self {
    self.io_max_threads = n.max(1);
    self
  }

  pub fn with_io_keep_alive(mut self, keep_alive: Duration) -> Self {
    self.io_keep_alive = keep_alive;
    self
  }

  pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
    self.thread_name_prefix = prefix.into();
    self
  }
}

fn available_cpus() -> usize {
  std::thread::available_parallelism().map_or(1, usize::from)
}

fn read_env<T: FromStr>(key: &str) -> Option<T> {
  let raw = env::var(key).ok()?;
  match raw.trim().parse::<T>() {
    Ok(v) => Some(v),
    Err(_) => {
      warn!(key, value = %raw, "ignoring unparsable scheduler setting");
      None
    }
  }
}

fn read_thread_count(key: &str) -> Option<usize> {
  let n = read_env::<usize>(key)?;
  if n == 0 {
    warn!(key, "ignoring zero thread count");
    return None;
  }
  Some(n)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[rxflow_macro::test]
  fn defaults_are_sane() {
    let cfg = SchedulerConfig::default();
    assert!(cfg.computation_threads >= 1);
    assert_eq!(cfg.io_max_threads, 256);
    assert_eq!(cfg.io_keep_alive, Duration::from_secs(60));
    assert_eq!(cfg.thread_name_prefix, "rxflow");
  }

  #[rxflow_macro::test]
  fn builders_clamp_thread_counts() {
    let cfg = SchedulerConfig::default()
      .with_computation_threads(0)
      .with_io_max_threads(0)
      .with_thread_name_prefix("app");
    assert_eq!(cfg.computation_threads, 1);
    assert_eq!(cfg.io_max_threads, 1);
    assert_eq!(cfg.thread_name_prefix, "app");
  }

  #[rxflow_macro::test]
  fn env_overrides_and_ignores_garbage() {
    // The only test in this binary that touches these variables.
    env::set_var(ENV_IO_MAX_THREADS, "8");
    env::set_var(ENV_COMPUTATION_THREADS, "lots");
    env::set_var(ENV_IO_KEEP_ALIVE_MS, "250");
    let cfg = SchedulerConfig::from_env();
    env::remove_var(ENV_IO_MAX_THREADS);
    env::remove_var(ENV_COMPUTATION_THREADS);
    env::remove_var(ENV_IO_KEEP_ALIVE_MS);

    assert_eq!(cfg.io_max_threads, 8);
    assert_eq!(cfg.computation_threads, SchedulerConfig::default().computation_threads);
    assert_eq!(cfg.io_keep_alive, Duration::from_millis(250));
  }
}
