//! Linear backoff retry policy shared by the token cache and the search fetcher.
//!
//! After a retryable failure on attempt `n` the caller sleeps `n * backoff_unit`
//! before attempt `n + 1`. A retryable failure on the last attempt ends the loop.

use std::{thread, time::Duration};

use tracing::{debug, warn};

/// Blocking sleep used between attempts.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// What a single attempt reports back to the policy.
#[derive(Debug)]
pub enum Attempt<T> {
    Done(T),
    Retry(String),
    Fail(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryError {
    pub attempts: u32,
    pub cause: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff_unit: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::new(3, Duration::from_secs(1))
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff_unit: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff_unit,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn backoff_unit(&self) -> Duration {
        self.backoff_unit
    }

    /// Saturates at `Duration::MAX`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.backoff_unit
            .checked_mul(attempt)
            .unwrap_or(Duration::MAX)
    }

    /// Run `op` until it succeeds, fails fatally, or attempts run out.
    ///
    /// `op` receives the 1-based attempt number.
    pub fn run<T, F>(&self, sleeper: &dyn Sleeper, label: &str, mut op: F) -> Result<T, RetryError>
    where
        F: FnMut(u32) -> Attempt<T>,
    {
        let mut attempt = 1;
        loop {
            debug!("{} attempt {}/{}", label, attempt, self.max_attempts);
            match op(attempt) {
                Attempt::Done(value) => return Ok(value),
                Attempt::Fail(cause) => return Err(RetryError { attempts: attempt, cause }),
                Attempt::Retry(cause) => {
                    if attempt >= self.max_attempts {
                        warn!("{} giving up after {} attempt(s): {}", label, attempt, cause);
                        return Err(RetryError { attempts: attempt, cause });
                    }
                    let wait = self.delay_after(attempt);
                    warn!(
                        "{} attempt {}/{} failed: {}; retrying in {:?}",
                        label, attempt, self.max_attempts, cause, wait
                    );
                    sleeper.sleep(wait);
                    attempt += 1;
                }
            }
        }
    }
}

/// 429 or any 5xx.
pub fn is_retryable_status(status: u16) -> bool {
    status == 429 || (500..=599).contains(&status)
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingSleeper;
    use super::*;

    #[test]
    fn delay_is_linear_in_attempt() {
        let policy = RetryPolicy::new(5, Duration::from_millis(200));
        assert_eq!(policy.delay_after(1), Duration::from_millis(200));
        assert_eq!(policy.delay_after(2), Duration::from_millis(400));
        assert_eq!(policy.delay_after(4), Duration::from_millis(800));
    }

    #[test]
    fn delay_saturates_instead_of_overflowing() {
        let policy = RetryPolicy::new(3, Duration::from_secs(u64::MAX / 2));
        assert_eq!(policy.delay_after(1), Duration::from_secs(u64::MAX / 2));
        assert_eq!(policy.delay_after(3), Duration::MAX);
    }

    #[test]
    fn zero_attempts_is_clamped_to_one() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts(), 1);
    }

    #[test]
    fn succeeds_after_transient_failures_with_summed_backoff() {
        let policy = RetryPolicy::new(4, Duration::from_secs(1));
        let sleeper = RecordingSleeper::default();

        let result = policy.run(&sleeper, "test", |attempt| {
            if attempt < 3 {
                Attempt::Retry(format!("boom {attempt}"))
            } else {
                Attempt::Done(attempt)
            }
        });

        assert_eq!(result, Ok(3));
        assert_eq!(sleeper.count(), 2);
        assert_eq!(sleeper.total(), Duration::from_secs(1 + 2));
    }

    #[test]
    fn fatal_failure_is_not_retried() {
        let policy = RetryPolicy::new(3, Duration::from_secs(1));
        let sleeper = RecordingSleeper::default();

        let result: Result<(), _> = policy.run(&sleeper, "test", |_| Attempt::Fail("404".into()));

        assert_eq!(
            result,
            Err(RetryError {
                attempts: 1,
                cause: "404".into()
            })
        );
        assert_eq!(sleeper.count(), 0);
    }

    #[test]
    fn exhaustion_reports_attempts_and_last_cause() {
        let policy = RetryPolicy::new(3, Duration::from_secs(2));
        let sleeper = RecordingSleeper::default();

        let result: Result<(), _> =
            policy.run(&sleeper, "test", |attempt| Attempt::Retry(format!("503 #{attempt}")));

        assert_eq!(
            result,
            Err(RetryError {
                attempts: 3,
                cause: "503 #3".into()
            })
        );
        // no sleep after the final attempt
        assert_eq!(sleeper.total(), Duration::from_secs(2 + 4));
    }

    #[test]
    fn retryable_statuses() {
        assert!(is_retryable_status(429));
        assert!(is_retryable_status(500));
        assert!(is_retryable_status(503));
        assert!(is_retryable_status(599));
        assert!(!is_retryable_status(400));
        assert!(!is_retryable_status(401));
        assert!(!is_retryable_status(404));
        assert!(!is_retryable_status(600));
    }
}
