//! Retry policy for failed jobs.

use std::time::Duration;

/// What to do with a job whose latest attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureAction {
    /// Put the job back in `waiting`, claimable after `delay`.
    Retry { delay: Duration },
    /// Move the job to the terminal `failed` state.
    Fail,
}

/// Exponential backoff: `base * 2^(attempt - 1)` for the 1-based attempt
/// that just failed. Saturates instead of overflowing.
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(31);
    base.saturating_mul(1_u32 << exponent)
}

/// Decide the next state after attempt number `attempts_made` failed.
pub fn on_failure(
    attempts_made: u32,
    max_attempts: u32,
    base: Duration,
    retryable: bool,
) -> FailureAction {
    if retryable && attempts_made < max_attempts {
        FailureAction::Retry {
            delay: backoff_delay(base, attempts_made),
        }
    } else {
        FailureAction::Fail
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_from_base() {
        let base = Duration::from_millis(2000);
        assert_eq!(backoff_delay(base, 1), Duration::from_millis(2000));
        assert_eq!(backoff_delay(base, 2), Duration::from_millis(4000));
        assert_eq!(backoff_delay(base, 3), Duration::from_millis(8000));
    }

    #[test]
    fn backoff_saturates() {
        assert_eq!(
            backoff_delay(Duration::MAX, 10),
            Duration::MAX
        );
    }

    #[test]
    fn retries_until_attempts_are_exhausted() {
        let base = Duration::from_millis(2000);
        assert_eq!(
            on_failure(1, 3, base, true),
            FailureAction::Retry {
                delay: Duration::from_millis(2000)
            }
        );
        assert_eq!(
            on_failure(2, 3, base, true),
            FailureAction::Retry {
                delay: Duration::from_millis(4000)
            }
        );
        assert_eq!(on_failure(3, 3, base, true), FailureAction::Fail);
    }

    #[test]
    fn non_retryable_fails_immediately() {
        assert_eq!(
            on_failure(1, 3, Duration::from_millis(2000), false),
            FailureAction::Fail
        );
    }
}
