use super::config::CoreOrchestratorConfig;
use backon::BackoffBuilder;
use rand::Rng;
use std::{collections::HashSet, time::Duration};

/// Retry eligibility and delays of a query attempt chain.
#[derive(Debug)]
pub(super) struct BackOffPolicy {
    max_attempts: u32,
    min_delay: Duration,
    max_delay: Duration,
    factor: f32,
    jitter: f64,
    retryable_status_codes: HashSet<u16>,
}

impl BackOffPolicy {
    pub fn new(config: &CoreOrchestratorConfig) -> Self {
        let min_delay = Duration::from_millis(config.min_duration_ms as u64);
        Self {
            max_attempts: config.max_attempts,
            min_delay,
            max_delay: Duration::from_millis(config.max_duration_ms as u64)
                .max(min_delay),
            factor: config.backoff_factor as f32,
            jitter: config.backoff_jitter.clamp(0.0, 1.0),
            retryable_status_codes: config
                .retryable_status_codes
                .iter()
                .copied()
                .collect(),
        }
    }

    pub fn is_retryable(&self, status: u16) -> bool {
        self.retryable_status_codes.contains(&status)
    }

    /// Whether another attempt follows after `attempts` attempts ended
    /// with `status`.
    pub fn should_retry(&self, status: u16, attempts: u32) -> bool {
        self.is_retryable(status) && attempts < self.max_attempts
    }

    /// The delay after attempt number `attempt` (1-based). Recomputed from
    /// scratch every time, the first retry waits the minimum delay.
    pub fn next_delay(&self, attempt: u32) -> Duration {
        let base = backon::ExponentialBuilder::default()
            .with_factor(self.factor)
            .with_min_delay(self.min_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(attempt.max(1) as usize)
            .build()
            .last()
            .unwrap_or(self.min_delay);
        // backon scales in f32 seconds
        let base =
            Duration::from_millis((base.as_secs_f64() * 1000.0).round() as u64)
                .clamp(self.min_delay, self.max_delay);

        if self.jitter == 0.0 {
            return base;
        }

        let mut rng = rand::thread_rng();
        let deviation = base.mul_f64(rng.gen::<f64>() * self.jitter);
        let delay = if rng.gen_bool(0.5) {
            base.saturating_add(deviation)
        } else {
            base.saturating_sub(deviation)
        };
        delay.clamp(self.min_delay, self.max_delay)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn policy() -> BackOffPolicy {
        BackOffPolicy::new(&CoreOrchestratorConfig::default())
    }

    #[test]
    fn default_retryable_statuses() {
        let p = policy();
        for status in [0, 408, 429, 503, 504] {
            assert!(p.is_retryable(status), "{status}");
        }
        for status in [200, 400, 404, 500, 502] {
            assert!(!p.is_retryable(status), "{status}");
        }
    }

    #[test]
    fn attempts_are_capped() {
        let p = policy();
        assert!(p.should_retry(503, 1));
        assert!(p.should_retry(503, 4));
        assert!(!p.should_retry(503, 5));
        assert!(!p.should_retry(500, 1));
    }

    #[test]
    fn delays_grow_exponentially_up_to_max() {
        let p = policy();
        assert_eq!(Duration::from_millis(300), p.next_delay(1));
        assert_eq!(Duration::from_millis(600), p.next_delay(2));
        assert_eq!(Duration::from_millis(1200), p.next_delay(3));
        assert_eq!(Duration::from_millis(2400), p.next_delay(4));
        assert_eq!(Duration::from_millis(4800), p.next_delay(5));
        assert_eq!(Duration::from_millis(5000), p.next_delay(6));
        assert_eq!(Duration::from_millis(5000), p.next_delay(20));
    }

    #[test]
    fn delays_do_not_accumulate() {
        let p = policy();
        let first = p.next_delay(3);
        let _ = p.next_delay(4);
        assert_eq!(first, p.next_delay(3));
    }

    #[test]
    fn jitter_stays_in_bounds() {
        let p = BackOffPolicy::new(&CoreOrchestratorConfig {
            backoff_jitter: 0.5,
            ..Default::default()
        });
        for attempt in 1..10 {
            for _ in 0..20 {
                let delay = p.next_delay(attempt);
                assert!(delay >= Duration::from_millis(300));
                assert!(delay <= Duration::from_millis(5000));
            }
        }
    }

    #[test]
    fn configured_statuses_and_attempts() {
        let p = BackOffPolicy::new(&CoreOrchestratorConfig {
            max_attempts: 2,
            retryable_status_codes: vec![500],
            ..Default::default()
        });
        assert!(p.should_retry(500, 1));
        assert!(!p.should_retry(500, 2));
        assert!(!p.should_retry(503, 1));
    }
}
