//! Retry policy: decides which failures are retried and the backoff between tries.

use rand::Rng;
use std::future::Future;
use std::time::Duration;

use crate::domain::{StatusClass, TransportError, WriteOutcome};
use crate::ports::HttpResponse;

/// Retry policy for transient failures.
///
/// Only transient statuses (429/503/5xx) and transport errors are retried.
/// 409/412/428 are never retried here; 412 goes to the conflict resolver.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first try. `retries = 2` means up to 3 attempts.
    pub retries: u32,

    /// Delay before the first retry.
    pub base_delay: Duration,

    /// Backoff multiplier for exponential backoff.
    pub multiplier: f64,

    /// Upper bound for any single delay.
    pub max_delay: Duration,

    /// Proportional jitter: each delay is shortened by up to this fraction.
    pub jitter: f64,
}

/// Something the policy can look at to decide whether to try again.
pub trait Retryable {
    fn should_retry(&self) -> bool;
}

impl Retryable for WriteOutcome {
    fn should_retry(&self) -> bool {
        self.is_transient()
    }
}

impl Retryable for HttpResponse {
    fn should_retry(&self) -> bool {
        StatusClass::of(self.status).is_retryable()
    }
}

/// Final result of a retried call, with how many attempts it took.
///
/// On exhaustion `result` holds the last attempt's value: the final transient
/// response, or the transport error exactly as the transport raised it.
#[derive(Debug)]
pub struct Attempted<T> {
    pub result: Result<T, TransportError>,
    pub attempts: u32,
}

impl RetryPolicy {
    pub fn default_v1() -> Self {
        Self {
            retries: 2,
            base_delay: Duration::from_millis(500),
            multiplier: 2.0,
            max_delay: Duration::from_secs(8),
            jitter: 0.0,
        }
    }

    /// Policy that never retries.
    pub fn no_retry() -> Self {
        Self {
            retries: 0,
            ..Self::default_v1()
        }
    }

    /// Total attempts including the first try.
    pub fn max_attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }

    /// Delay to wait after attempt number `attempts` (1-indexed) failed.
    ///
    /// `base_delay * multiplier^(attempts - 1)`, capped at `max_delay`.
    /// With base_delay=500ms, multiplier=2.0: 500ms, 1s, 2s, 4s, 8s, 8s, ...
    pub fn next_delay(&self, attempts: u32) -> Duration {
        let base_secs = self.base_delay.as_secs_f64();
        let exponent = attempts.saturating_sub(1).min(i32::MAX as u32) as i32;
        let delay_secs = (base_secs * self.multiplier.powi(exponent))
            .min(self.max_delay.as_secs_f64());

        let delay_secs = if self.jitter > 0.0 {
            let cut = rand::thread_rng().gen_range(0.0..=self.jitter);
            delay_secs * (1.0 - cut)
        } else {
            delay_secs
        };
        Duration::from_secs_f64(delay_secs.max(0.0))
    }

    /// Run `call` until it succeeds, fails terminally, or attempts run out.
    ///
    /// `call` receives the 1-based attempt number.
    pub async fn run<T, F, Fut>(&self, label: &str, mut call: F) -> Attempted<T>
    where
        T: Retryable,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, TransportError>>,
    {
        let max_attempts = self.max_attempts();
        let mut attempt = 1;
        loop {
            let result = call(attempt).await;
            let retryable = match &result {
                Ok(value) => value.should_retry(),
                Err(_) => true,
            };

            if !retryable {
                return Attempted {
                    result,
                    attempts: attempt,
                };
            }
            if attempt >= max_attempts {
                tracing::warn!(label, attempts = attempt, "retries exhausted");
                return Attempted {
                    result,
                    attempts: attempt,
                };
            }

            let delay = self.next_delay(attempt);
            match &result {
                Ok(_) => tracing::warn!(label, attempt, ?delay, "transient status, backing off"),
                Err(error) => {
                    tracing::warn!(label, attempt, ?delay, %error, "transport error, backing off")
                }
            }
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::default_v1()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn default_policy_has_reasonable_values() {
        let policy = RetryPolicy::default_v1();
        assert_eq!(policy.max_attempts(), 3);
        assert_eq!(policy.base_delay, Duration::from_millis(500));
        assert_eq!(policy.multiplier, 2.0);
    }

    #[test]
    fn exponential_backoff_increases_until_cap() {
        let policy = RetryPolicy::default_v1();

        assert_eq!(policy.next_delay(1), Duration::from_millis(500));
        assert_eq!(policy.next_delay(2), Duration::from_secs(1));
        assert_eq!(policy.next_delay(3), Duration::from_secs(2));
        assert_eq!(policy.next_delay(5), Duration::from_secs(8));
        assert_eq!(policy.next_delay(9), Duration::from_secs(8));
    }

    #[test]
    fn jitter_only_shortens() {
        let policy = RetryPolicy {
            jitter: 0.5,
            ..RetryPolicy::default_v1()
        };
        for _ in 0..50 {
            let d = policy.next_delay(2);
            assert!(d <= Duration::from_secs(1));
            assert!(d >= Duration::from_millis(500));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn always_failing_transport_is_tried_retries_plus_one_times() {
        let policy = RetryPolicy::default_v1();
        let calls = AtomicU32::new(0);

        let attempted: Attempted<HttpResponse> = policy
            .run("test", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(TransportError::Connect("refused".into())) }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(attempted.attempts, 3);
        assert_eq!(
            attempted.result.unwrap_err(),
            TransportError::Connect("refused".into())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn transient_then_success_stops_retrying() {
        let policy = RetryPolicy::default_v1();
        let started = tokio::time::Instant::now();

        let attempted = policy
            .run("test", |attempt| async move {
                let status = if attempt == 1 { 503 } else { 201 };
                Ok(HttpResponse::new(status))
            })
            .await;

        assert_eq!(attempted.attempts, 2);
        assert_eq!(attempted.result.unwrap().status, 201);
        assert!(started.elapsed() >= Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn terminal_statuses_are_not_retried() {
        let policy = RetryPolicy::default_v1();
        for status in [409, 412, 428, 400] {
            let calls = AtomicU32::new(0);
            let attempted = policy
                .run("test", |_| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async move { Ok(HttpResponse::new(status)) }
                })
                .await;
            assert_eq!(calls.load(Ordering::SeqCst), 1, "status {status}");
            assert_eq!(attempted.attempts, 1);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_transient_returns_last_response() {
        let policy = RetryPolicy {
            retries: 1,
            ..RetryPolicy::default_v1()
        };
        let attempted = policy
            .run("test", |attempt| async move {
                Ok(HttpResponse::new(503).body(format!("busy #{attempt}")))
            })
            .await;

        assert_eq!(attempted.attempts, 2);
        assert_eq!(attempted.result.unwrap().body, "busy #2");
    }
}
