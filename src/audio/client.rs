//! Synthesis client: retries, backoff and writing audio to disk

use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::query::SynthesisRequest;
use super::retry::{GiveUp, ProviderError, RetryPolicy, is_quota_exceeded, retry};
use super::synth::SpeechSynthesizer;
use crate::{Error, Result};

/// Wraps a [`SpeechSynthesizer`] with bounded retries
#[derive(Clone)]
pub struct SynthesisClient {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    policy: RetryPolicy,
}

impl std::fmt::Debug for SynthesisClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SynthesisClient")
            .field("synthesizer", &self.synthesizer.name())
            .field("policy", &self.policy)
            .finish()
    }
}

impl SynthesisClient {
    /// Create a client over `synthesizer`
    #[must_use]
    pub fn new(synthesizer: Arc<dyn SpeechSynthesizer>, policy: RetryPolicy) -> Self {
        Self {
            synthesizer,
            policy,
        }
    }

    /// Synthesize `request` and write the audio to `output`
    ///
    /// Returns `Ok(None)` without contacting the provider when every fragment
    /// was dropped as ignorable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RetriesExhausted`] when every attempt failed
    /// transiently, [`Error::Tts`] on a non-retryable provider failure, and
    /// [`Error::Io`] when the audio cannot be written.
    pub async fn synthesize(
        &self,
        request: &SynthesisRequest,
        output: &Path,
    ) -> Result<Option<PathBuf>> {
        if request.is_empty() {
            tracing::debug!(path = %output.display(), "nothing to synthesize");
            return Ok(None);
        }

        let query = request.text();
        let markup = self.synthesizer.render(request);
        let audio = self.fetch(&markup, &query).await?;

        // Readers test for the file without taking the cache lock, so it must
        // appear complete or not at all
        let parent = match output.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        tokio::fs::create_dir_all(parent).await?;
        let temp = tempfile::NamedTempFile::new_in(parent)?;
        tokio::fs::write(temp.path(), &audio).await?;
        temp.persist(output).map_err(|e| Error::Io(e.error))?;

        tracing::info!(
            provider = self.synthesizer.name(),
            path = %output.display(),
            bytes = audio.len(),
            "audio content generated"
        );
        Ok(Some(output.to_path_buf()))
    }

    /// Call the provider until it succeeds or the attempt budget is spent
    ///
    /// Empty audio and a quota message in place of audio count as transient
    /// failures.
    async fn fetch(&self, markup: &str, query: &str) -> Result<Vec<u8>> {
        let synthesizer = &self.synthesizer;
        let outcome = retry(&self.policy, synthesizer.name(), move || async move {
            let audio = synthesizer.synthesize(markup).await?;
            if audio.is_empty() {
                return Err(ProviderError::Transient("provider returned no audio".to_string()));
            }
            if is_quota_exceeded(&audio) {
                return Err(ProviderError::Transient("quota exceeded".to_string()));
            }
            Ok(audio)
        })
        .await;

        outcome.map_err(|give_up| match give_up {
            GiveUp::Fatal(message) => Error::Tts(format!("{message} (query: {query})")),
            GiveUp::Exhausted {
                attempts,
                last_error,
            } => Error::RetriesExhausted {
                query: query.to_string(),
                attempts,
                last_error,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::query::{IgnoreList, QueryBuilder, DEFAULT_RATE};
    use crate::audio::voices::{CyclingVoiceSelector, VoiceCatalog};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tempfile::TempDir;

    /// Replays a scripted list of outcomes, then succeeds
    struct Scripted {
        outcomes: Mutex<Vec<std::result::Result<Vec<u8>, ProviderError>>>,
        calls: AtomicU32,
    }

    impl Scripted {
        fn new(outcomes: Vec<std::result::Result<Vec<u8>, ProviderError>>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes),
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl SpeechSynthesizer for Scripted {
        async fn synthesize(&self, _markup: &str) -> std::result::Result<Vec<u8>, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut outcomes = self.outcomes.lock().unwrap();
            if outcomes.is_empty() {
                Ok(b"audio".to_vec())
            } else {
                outcomes.remove(0)
            }
        }

        fn name(&self) -> &'static str {
            "scripted"
        }
    }

    fn request(text: &str) -> SynthesisRequest {
        QueryBuilder::new(
            VoiceCatalog::default(),
            Arc::new(CyclingVoiceSelector::default()),
            IgnoreList::default(),
            DEFAULT_RATE,
        )
        .request()
        .target(text, 0, false)
        .build()
    }

    #[tokio::test]
    async fn recovers_after_transient_failures() {
        let dir = TempDir::new().unwrap();
        let synth = Arc::new(Scripted::new(vec![
            Err(ProviderError::Transient("503".into())),
            Err(ProviderError::Transient("Quota Exceeded".into())),
        ]));
        let client = SynthesisClient::new(synth.clone(), RetryPolicy::immediate(5));

        let out = dir.path().join("nested").join("你好.mp3");
        let written = client.synthesize(&request("你好"), &out).await.unwrap();

        assert_eq!(written.as_deref(), Some(out.as_path()));
        assert_eq!(std::fs::read(&out).unwrap(), b"audio");
        assert_eq!(synth.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn fatal_errors_are_not_retried() {
        let dir = TempDir::new().unwrap();
        let synth = Arc::new(Scripted::new(vec![Err(ProviderError::Fatal("401".into()))]));
        let client = SynthesisClient::new(synth.clone(), RetryPolicy::immediate(5));

        let err = client
            .synthesize(&request("你好"), &dir.path().join("x.mp3"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Tts(ref m) if m.contains("你好")));
        assert_eq!(synth.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_audio_counts_as_failure() {
        let dir = TempDir::new().unwrap();
        let synth = Arc::new(Scripted::new(vec![Ok(Vec::new())]));
        let client = SynthesisClient::new(synth.clone(), RetryPolicy::immediate(3));

        let out = dir.path().join("x.mp3");
        client.synthesize(&request("你好"), &out).await.unwrap();
        assert_eq!(synth.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn quota_message_instead_of_audio_is_retried() {
        let dir = TempDir::new().unwrap();
        let synth = Arc::new(Scripted::new(vec![
            Ok(b"Quota Exceeded".to_vec()),
            Err(ProviderError::from_status("Azure", 400, "Bad Request")),
        ]));
        let client = SynthesisClient::new(synth.clone(), RetryPolicy::immediate(5));

        let out = dir.path().join("x.mp3");
        client.synthesize(&request("你好"), &out).await.unwrap();
        assert_eq!(std::fs::read(&out).unwrap(), b"audio");
        assert_eq!(synth.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhaustion_names_the_query() {
        let dir = TempDir::new().unwrap();
        let synth = Arc::new(Scripted::new(vec![
            Err(ProviderError::Transient("503".into())),
            Err(ProviderError::Transient("504".into())),
        ]));
        let client = SynthesisClient::new(synth, RetryPolicy::immediate(2));

        let out = dir.path().join("x.mp3");
        let err = client.synthesize(&request("你好"), &out).await.unwrap_err();
        assert!(matches!(
            err,
            Error::RetriesExhausted { ref query, attempts: 2, ref last_error }
                if query == "你好" && last_error == "504"
        ));
        assert!(!out.exists());
    }

    #[tokio::test]
    async fn zero_attempt_policy_still_tries_once() {
        let dir = TempDir::new().unwrap();
        let synth = Arc::new(Scripted::new(Vec::new()));
        let client = SynthesisClient::new(synth.clone(), RetryPolicy::immediate(0));

        client
            .synthesize(&request("你好"), &dir.path().join("x.mp3"))
            .await
            .unwrap();
        assert_eq!(synth.calls.load(Ordering::SeqCst), 1);
    }
}
