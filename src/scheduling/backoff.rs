//! Exponential retry backoff with jitter

use rand::Rng;
use std::time::Duration;

use crate::config::QueueConfig;

/// `delay(k) = min(base * 2^(k-1) + U(0, jitter * base * 2^(k-1)), max)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub max: Duration,
    /// Fraction of the computed delay added as random jitter
    pub jitter: f64,
}

impl BackoffPolicy {
    pub fn from_config(config: &QueueConfig) -> Self {
        Self {
            base: config.retry_base_delay(),
            max: config.retry_max_delay(),
            jitter: config.retry_jitter.clamp(0.0, 1.0),
        }
    }

    /// Delay before retry number `retry` (1-based), without jitter
    pub fn base_delay(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1);
        2u32.checked_pow(exponent)
            .and_then(|factor| self.base.checked_mul(factor))
            .map_or(self.max, |delay| delay.min(self.max))
    }

    /// Delay before retry number `retry`, with jitter drawn from `rng`
    pub fn delay_for(&self, retry: u32, rng: &mut impl Rng) -> Duration {
        let raw = self.base_delay(retry);
        let fraction = if self.jitter > 0.0 {
            rng.random_range(0.0..=self.jitter)
        } else {
            0.0
        };
        raw.saturating_add(raw.mul_f64(fraction)).min(self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn policy(base_ms: u64, max_ms: u64, jitter: f64) -> BackoffPolicy {
        BackoffPolicy {
            base: Duration::from_millis(base_ms),
            max: Duration::from_millis(max_ms),
            jitter,
        }
    }

    #[test]
    fn test_base_delay_doubles_and_caps() {
        let p = policy(1_000, 30_000, 0.0);
        assert_eq!(p.base_delay(1), Duration::from_millis(1_000));
        assert_eq!(p.base_delay(2), Duration::from_millis(2_000));
        assert_eq!(p.base_delay(3), Duration::from_millis(4_000));
        assert_eq!(p.base_delay(6), Duration::from_millis(30_000));
        assert_eq!(p.base_delay(200), Duration::from_millis(30_000));
    }

    #[test]
    fn test_zero_jitter_is_deterministic() {
        let p = policy(500, 10_000, 0.0);
        let mut rng = rand::rng();
        assert_eq!(p.delay_for(2, &mut rng), Duration::from_millis(1_000));
    }

    proptest! {
        #[test]
        fn prop_delay_within_jitter_window(
            base in 1u64..5_000,
            retry in 1u32..12,
            jitter in 0.0f64..=1.0,
        ) {
            let p = policy(base, 30_000, jitter);
            let raw = p.base_delay(retry);
            let delay = p.delay_for(retry, &mut rand::rng());
            let upper = raw.mul_f64(1.0 + jitter).min(p.max);
            prop_assert!(delay >= raw.min(p.max));
            prop_assert!(delay <= upper + Duration::from_micros(1));
        }
    }
}
