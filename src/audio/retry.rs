//! Bounded retries for provider calls
//!
//! Both speech synthesis and translation go through [`retry`]: transient
//! failures are retried with exponential backoff until the attempt budget
//! runs out, fatal ones end the loop at once.

use std::time::Duration;

use rand::Rng;

/// Body text some providers send instead of audio once the quota is spent
pub const QUOTA_EXCEEDED_BODY: &str = "Quota Exceeded";

/// Largest share of the backoff added as random jitter
const MAX_JITTER: f64 = 0.25;

/// Failure of a single provider call
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// Another attempt may succeed
    #[error("transient: {0}")]
    Transient(String),
    /// Another attempt would fail the same way
    #[error("fatal: {0}")]
    Fatal(String),
}

impl ProviderError {
    /// Classify a `reqwest` transport error
    ///
    /// Only a request that could not even be built is fatal; anything that
    /// went wrong on the wire is worth another try.
    #[must_use]
    pub fn from_transport(err: &reqwest::Error) -> Self {
        if err.is_builder() {
            Self::Fatal(err.to_string())
        } else {
            Self::Transient(err.to_string())
        }
    }

    /// Classify a non-success HTTP response
    ///
    /// Every non-success status is retried, 4xx included; the attempt
    /// budget bounds the loop.
    #[must_use]
    pub fn from_status(provider: &str, status: u16, body: &str) -> Self {
        Self::Transient(format!("{provider} returned {status}: {}", body.trim()))
    }
}

/// True when a response body is the provider's quota message
#[must_use]
pub fn is_quota_exceeded(body: &[u8]) -> bool {
    body.trim_ascii() == QUOTA_EXCEEDED_BODY.as_bytes()
}

/// How often and how patiently a provider call is repeated
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts including the first; zero is treated as one
    pub max_attempts: u32,
    /// Wait before the first retry, doubled for each further one
    pub base_delay: Duration,
    /// Upper bound on any single wait
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// A policy that retries without waiting
    #[must_use]
    pub const fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Attempts actually made by [`retry`]
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Wait before retry number `retry` (zero-based)
    ///
    /// `base_delay * 2^retry` plus up to a quarter of jitter, never more
    /// than `max_delay`.
    #[must_use]
    pub fn backoff(&self, retry: u32) -> Duration {
        let exponential = self
            .base_delay
            .saturating_mul(1_u32.checked_shl(retry).unwrap_or(u32::MAX))
            .min(self.max_delay);
        let jitter = exponential.mul_f64(rand::thread_rng().gen_range(0.0..=MAX_JITTER));
        (exponential + jitter).min(self.max_delay)
    }
}

/// Why [`retry`] stopped without a result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GiveUp {
    /// A call failed fatally
    Fatal(String),
    /// Every attempt failed transiently
    Exhausted {
        /// Attempts made
        attempts: u32,
        /// Message of the final failure
        last_error: String,
    },
}

/// Run `call` under `policy` until it succeeds or gives up
///
/// # Errors
///
/// Returns [`GiveUp::Fatal`] on the first fatal failure and
/// [`GiveUp::Exhausted`] once every attempt failed transiently.
pub async fn retry<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    mut call: F,
) -> Result<T, GiveUp>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let attempts = policy.attempts();
    let mut last_error = String::new();

    for attempt in 1..=attempts {
        match call().await {
            Ok(value) => return Ok(value),
            Err(ProviderError::Fatal(message)) => return Err(GiveUp::Fatal(message)),
            Err(ProviderError::Transient(message)) => last_error = message,
        }

        if attempt < attempts {
            let delay = policy.backoff(attempt - 1);
            tracing::warn!(
                operation,
                attempt,
                attempts,
                delay_ms = delay.as_millis(),
                error = %last_error,
                "provider call failed, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }

    Err(GiveUp::Exhausted {
        attempts,
        last_error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    // -- classification -------------------------------------------------------

    #[test]
    fn every_error_status_is_transient() {
        for status in [400, 401, 403, 404, 429, 500, 503] {
            assert!(
                matches!(
                    ProviderError::from_status("Azure", status, "nope"),
                    ProviderError::Transient(_)
                ),
                "status {status}"
            );
        }
    }

    #[test]
    fn status_message_names_provider() {
        assert_eq!(
            ProviderError::from_status("Azure", 400, "Bad Request\n"),
            ProviderError::Transient("Azure returned 400: Bad Request".to_string())
        );
    }

    #[test]
    fn quota_body_is_recognized() {
        assert!(is_quota_exceeded(b"Quota Exceeded"));
        assert!(is_quota_exceeded(b" Quota Exceeded\n"));
        assert!(!is_quota_exceeded(b"ID3\x04audio"));
        assert!(!is_quota_exceeded(b""));
    }

    // -- backoff --------------------------------------------------------------

    #[test]
    fn backoff_doubles_until_the_cap() {
        let policy = RetryPolicy {
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(1000),
            ..RetryPolicy::default()
        };

        let waits: Vec<Duration> = (0..6).map(|r| policy.backoff(r)).collect();
        for (retry, floor) in [100, 200, 400, 800].into_iter().enumerate() {
            let wait = waits[retry];
            assert!(wait >= Duration::from_millis(floor), "retry {retry}: {wait:?}");
            assert!(wait <= Duration::from_millis(floor * 5 / 4), "retry {retry}: {wait:?}");
        }
        assert_eq!(waits[4], policy.max_delay);
        assert_eq!(waits[5], policy.max_delay);
    }

    #[test]
    fn huge_retry_numbers_saturate() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(200), policy.max_delay);
    }

    #[test]
    fn immediate_policy_never_waits() {
        let policy = RetryPolicy::immediate(3);
        assert_eq!(policy.backoff(5), Duration::ZERO);
        assert_eq!(RetryPolicy::immediate(0).attempts(), 1);
    }

    // -- retry ----------------------------------------------------------------

    #[tokio::test]
    async fn stops_at_first_success() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let value = retry(&RetryPolicy::immediate(5), "test", move || async move {
            match calls.fetch_add(1, Ordering::SeqCst) {
                0 | 1 => Err(ProviderError::Transient("503".into())),
                _ => Ok("done"),
            }
        })
        .await
        .unwrap();

        assert_eq!(value, "done");
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn fatal_ends_the_loop() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let outcome: Result<(), GiveUp> =
            retry(&RetryPolicy::immediate(5), "test", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ProviderError::Fatal("bad request".into()))
            })
            .await;

        assert_eq!(outcome, Err(GiveUp::Fatal("bad request".to_string())));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhaustion_reports_last_error() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let outcome: Result<(), GiveUp> =
            retry(&RetryPolicy::immediate(3), "test", move || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                Err(ProviderError::Transient(format!("failure {n}")))
            })
            .await;

        assert_eq!(
            outcome,
            Err(GiveUp::Exhausted {
                attempts: 3,
                last_error: "failure 2".to_string(),
            })
        );
    }
}
