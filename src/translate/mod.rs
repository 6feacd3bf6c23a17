//! Machine translation of study material into English

mod deepl;
mod google;

pub use deepl::DeepLTranslator;
pub use google::GoogleTranslator;

use async_trait::async_trait;

use crate::audio::retry::{GiveUp, ProviderError, RetryPolicy, retry};
use crate::{Error, Result};

/// A translation provider (Chinese to English)
#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate `text`
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingTranslation`] when the provider answers with no
    /// translation, or [`Error::Translate`] when it keeps failing.
    async fn translate(&self, text: &str) -> Result<String>;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}

/// Run one translation call under `policy`
///
/// `None` from `call` means the provider returned zero translations.
async fn with_retry<F, Fut>(
    provider: &str,
    policy: &RetryPolicy,
    text: &str,
    call: F,
) -> Result<String>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<Option<String>, ProviderError>>,
{
    match retry(policy, provider, call).await {
        Ok(Some(translated)) => {
            tracing::debug!(provider, text, translated = %translated, "translated");
            Ok(translated)
        }
        Ok(None) => Err(Error::MissingTranslation(text.to_string())),
        Err(GiveUp::Fatal(message)) => Err(Error::Translate(message)),
        Err(GiveUp::Exhausted {
            attempts,
            last_error,
        }) => Err(Error::Translate(format!(
            "{provider} failed after {attempts} attempts: {last_error}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn retries_transient_then_succeeds() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result = with_retry("test", &RetryPolicy::immediate(3), "你好", move || async move {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(ProviderError::Transient("503".into()))
            } else {
                Ok(Some("Hello".to_string()))
            }
        })
        .await
        .unwrap();

        assert_eq!(result, "Hello");
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn zero_translations_is_missing() {
        let err = with_retry("test", &RetryPolicy::immediate(3), "你好", || async {
            Ok(None)
        })
        .await
        .unwrap_err();

        assert!(matches!(err, Error::MissingTranslation(ref t) if t == "你好"));
    }

    #[tokio::test]
    async fn gives_up_after_budget() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let err = with_retry("test", &RetryPolicy::immediate(2), "你好", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ProviderError::Transient("timed out".into()))
        })
        .await
        .unwrap_err();

        assert!(matches!(err, Error::Translate(ref m) if m.contains("timed out")));
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn fatal_is_not_retried() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let err = with_retry("test", &RetryPolicy::immediate(5), "你好", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ProviderError::Fatal("403".into()))
        })
        .await
        .unwrap_err();

        assert!(matches!(err, Error::Translate(_)));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
