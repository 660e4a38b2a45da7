//! Delay between retry attempts.

use rand::Rng;
use std::time::Duration;

use crate::config::BackoffStrategy;

/// Delay to wait after `attempt` (1-based) has failed.
pub fn delay_after(strategy: BackoffStrategy, attempt: u32, base: Duration, max: Duration) -> Duration {
    match strategy {
        BackoffStrategy::Fixed => base,
        BackoffStrategy::Exponential => exponential(attempt, base, max),
    }
}

/// `base * 2^(attempt-1)`, capped at `max`, plus up to 10% jitter.
fn exponential(attempt: u32, base: Duration, max: Duration) -> Duration {
    let base_ms = base.as_millis() as u64;
    let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
    let capped = base_ms.saturating_mul(factor).min(max.as_millis() as u64);

    let jitter_range = capped / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };
    Duration::from_millis(capped + jitter)
}
