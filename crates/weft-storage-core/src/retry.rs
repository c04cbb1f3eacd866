//! Bounded retry with exponential backoff for remote round-trips.

use std::time::Duration;

use log::warn;

use crate::error::Result;

/// Retry policy applied around every fallible remote operation.
///
/// Only errors classified transient by
/// [`StorageError::is_transient`](crate::error::StorageError::is_transient)
/// are retried; everything else, and the last error once attempts are
/// exhausted, propagates to the caller.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(2000),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
            multiplier: 2.0,
        }
    }

    /// Run `op`, sleeping between transient failures. `what` names the
    /// operation in retry logs.
    pub fn run<T, F>(&self, what: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Result<T>,
    {
        let mut delay = self.initial_delay;
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match op() {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < self.max_attempts => {
                    warn!(
                        "{} failed (attempt {}/{}): {}; retrying in {:?}",
                        what, attempt, self.max_attempts, err, delay
                    );
                    std::thread::sleep(delay);
                    delay = Duration::from_secs_f64(delay.as_secs_f64() * self.multiplier);
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;
    use std::cell::Cell;

    fn fast_policy(attempts: u32) -> RetryPolicy {
        RetryPolicy::new(attempts, Duration::from_millis(1))
    }

    #[test]
    fn test_transient_failures_are_retried() {
        let calls = Cell::new(0u32);
        let result = fast_policy(3).run("exists", || {
            calls.set(calls.get() + 1);
            if calls.get() < 3 {
                Err(StorageError::Connection("reset".into()))
            } else {
                Ok(true)
            }
        });
        assert!(result.unwrap());
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn test_exhaustion_propagates_last_error() {
        let calls = Cell::new(0u32);
        let result: Result<bool> = fast_policy(3).run("exists", || {
            calls.set(calls.get() + 1);
            Err(StorageError::Timeout(format!("attempt {}", calls.get())))
        });
        assert_eq!(calls.get(), 3);
        match result {
            Err(StorageError::Timeout(msg)) => assert_eq!(msg, "attempt 3"),
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[test]
    fn test_fatal_errors_are_not_retried() {
        let calls = Cell::new(0u32);
        let result: Result<u64> = fast_policy(5).run("size", || {
            calls.set(calls.get() + 1);
            Err(StorageError::NotFound("/missing".into()))
        });
        assert_eq!(calls.get(), 1);
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[test]
    fn test_zero_attempts_still_runs_once() {
        let calls = Cell::new(0u32);
        let result = fast_policy(0).run("mtime", || {
            calls.set(calls.get() + 1);
            Ok(42.0)
        });
        assert_eq!(result.unwrap(), 42.0);
        assert_eq!(calls.get(), 1);
    }
}
