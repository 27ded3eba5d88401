//! Retry loop: run a closure until success or policy says stop.

use std::time::{Duration, Instant};

use super::classify::Classify;
use super::policy::{RetryDecision, RetryPolicy};
use crate::control::CancelToken;

const SLEEP_SLICE: Duration = Duration::from_millis(25);

/// Runs `f` until it succeeds, the policy says stop, or `cancel` fires.
///
/// `f` receives the 1-based attempt number. Returns the last result together
/// with the number of attempts made.
pub fn run_with_retry<T, E, F>(policy: &RetryPolicy, cancel: &CancelToken, mut f: F) -> (Result<T, E>, u32)
where
    E: Classify,
    F: FnMut(u32) -> Result<T, E>,
{
    let mut attempt = 1u32;
    loop {
        match f(attempt) {
            Ok(v) => return (Ok(v), attempt),
            Err(e) => match policy.decide(attempt, e.kind()) {
                RetryDecision::NoRetry => return (Err(e), attempt),
                RetryDecision::RetryAfter(d) => {
                    tracing::debug!(attempt, delay_ms = d.as_millis() as u64, "retrying after error");
                    if !sleep_unless_cancelled(d, cancel) {
                        return (Err(e), attempt);
                    }
                    attempt += 1;
                }
            },
        }
    }
}

/// Returns false if cancelled while sleeping.
fn sleep_unless_cancelled(total: Duration, cancel: &CancelToken) -> bool {
    let deadline = Instant::now() + total;
    loop {
        if cancel.is_cancelled() {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        std::thread::sleep(SLEEP_SLICE.min(deadline - now));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::ErrorKind;

    #[derive(Debug)]
    struct Flaky(ErrorKind);

    impl Classify for Flaky {
        fn kind(&self) -> ErrorKind {
            self.0
        }
    }

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        }
    }

    #[test]
    fn succeeds_after_transient_failures() {
        let (res, attempts) = run_with_retry(&fast_policy(3), &CancelToken::new(), |attempt| {
            if attempt < 3 {
                Err(Flaky(ErrorKind::ChecksumMismatch))
            } else {
                Ok(attempt)
            }
        });
        assert_eq!(res.unwrap(), 3);
        assert_eq!(attempts, 3);
    }

    #[test]
    fn gives_up_after_max_attempts() {
        let mut calls = 0;
        let (res, attempts) = run_with_retry(&fast_policy(3), &CancelToken::new(), |_| {
            calls += 1;
            Err::<(), _>(Flaky(ErrorKind::Timeout))
        });
        assert!(res.is_err());
        assert_eq!(attempts, 3);
        assert_eq!(calls, 3);
    }

    #[test]
    fn permanent_errors_are_not_retried() {
        let (res, attempts) = run_with_retry(&fast_policy(3), &CancelToken::new(), |_| {
            Err::<(), _>(Flaky(ErrorKind::Other))
        });
        assert!(res.is_err());
        assert_eq!(attempts, 1);
    }

    #[test]
    fn cancellation_stops_backoff() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let (res, attempts) = run_with_retry(&fast_policy(5), &cancel, |_| {
            Err::<(), _>(Flaky(ErrorKind::Timeout))
        });
        assert!(res.is_err());
        assert_eq!(attempts, 1);
    }
}
