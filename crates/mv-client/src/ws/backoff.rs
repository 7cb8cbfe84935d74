//! Reconnect backoff policy.
//!
//! Pure calculation, kept apart from the timer that applies it so the
//! schedule can be tested without sleeping.

use std::time::Duration;

use rand::Rng;

/// First-attempt delay.
pub const BASE_DELAY_MS: u64 = 1_000;
/// Ceiling on the exponential schedule.
pub const MAX_DELAY_MS: u64 = 30_000;
/// Upper bound (exclusive) on the random jitter added per attempt.
pub const JITTER_MS: u64 = 1_000;
/// Attempts beyond this settle the connection to `Disconnected` for good.
pub const MAX_RECONNECT_ATTEMPTS: u32 = 10;

/// Deterministic part of the schedule for the nth attempt (1-based):
/// `min(1000 * 2^(n-1), 30000)` milliseconds.
pub fn base_delay(attempt: u32) -> Duration {
    let exp = attempt.saturating_sub(1).min(63);
    let ms = BASE_DELAY_MS.saturating_mul(1u64 << exp.min(31)).min(MAX_DELAY_MS);
    Duration::from_millis(ms)
}

/// Full delay before the nth attempt: capped exponential plus up to 1 s of
/// jitter so simultaneous clients don't stampede the server.
pub fn reconnect_delay(attempt: u32) -> Duration {
    let jitter = rand::thread_rng().gen_range(0..JITTER_MS);
    base_delay(attempt) + Duration::from_millis(jitter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_delay_doubles_then_caps() {
        let expected_ms = [
            1_000, 2_000, 4_000, 8_000, 16_000, 30_000, 30_000, 30_000, 30_000, 30_000,
        ];
        for (i, expected) in expected_ms.iter().enumerate() {
            let attempt = (i + 1) as u32;
            assert_eq!(
                base_delay(attempt),
                Duration::from_millis(*expected),
                "attempt {attempt}"
            );
        }
    }

    #[test]
    fn jitter_stays_within_bound() {
        for attempt in 1..=MAX_RECONNECT_ATTEMPTS {
            let base = base_delay(attempt);
            for _ in 0..50 {
                let full = reconnect_delay(attempt);
                assert!(full >= base);
                assert!(full < base + Duration::from_millis(JITTER_MS));
            }
        }
    }

    #[test]
    fn huge_attempt_numbers_do_not_overflow() {
        assert_eq!(base_delay(u32::MAX), Duration::from_millis(MAX_DELAY_MS));
    }
}
