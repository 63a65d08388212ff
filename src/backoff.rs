//! Exponential backoff with jitter for the auth and hash retry policies.
//!
//! `GetSleepDuration(n) = 2^n seconds + Uniform[10, 1000) ms`, attempt index starting at 1
//! (SPEC_FULL.md §4.2, invariant §8.4).

use std::time::Duration;

use rand::Rng;

const JITTER_MIN_MS: u64 = 10;
const JITTER_MAX_MS: u64 = 1000;

/// Computes the sleep duration before retry attempt `n` (1-based).
pub fn sleep_duration(attempt: u32) -> Duration {
    let base = Duration::from_secs(1u64.checked_shl(attempt).unwrap_or(u64::MAX));
    let jitter_ms = rand::thread_rng().gen_range(JITTER_MIN_MS..JITTER_MAX_MS);
    base + Duration::from_millis(jitter_ms)
}

/// Sleeps for [`sleep_duration`], honoring cancellation per SPEC_FULL.md §5.
pub async fn sleep(attempt: u32, cancel: &tokio_util::sync::CancellationToken) -> Result<(), crate::B2Error> {
    tokio::select! {
        _ = tokio::time::sleep(sleep_duration(attempt)) => Ok(()),
        _ = cancel.cancelled() => Err(crate::B2Error::Cancelled),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_hold_for_several_attempts() {
        for attempt in 1..8 {
            for _ in 0..200 {
                let d = sleep_duration(attempt);
                let lower = Duration::from_secs(1 << attempt) + Duration::from_millis(JITTER_MIN_MS);
                let upper = Duration::from_secs(1 << attempt) + Duration::from_millis(JITTER_MAX_MS);
                assert!(d >= lower, "attempt {attempt}: {d:?} < {lower:?}");
                assert!(d < upper, "attempt {attempt}: {d:?} >= {upper:?}");
            }
        }
    }

    #[test]
    fn jitter_is_not_constant() {
        let samples: std::collections::HashSet<_> = (0..50).map(|_| sleep_duration(1)).collect();
        assert!(samples.len() > 1, "jitter should vary across samples");
    }
}
