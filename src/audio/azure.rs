//! Azure neural text-to-speech

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use super::markup::{self, Dialect};
use super::query::SynthesisRequest;
use super::retry::ProviderError;
use super::synth::SpeechSynthesizer;
use crate::Error;

/// Audio format requested from Azure
pub const OUTPUT_FORMAT: &str = "audio-16khz-128kbitrate-mono-mp3";

/// Synthesizes SSML through the Azure speech REST endpoint
pub struct AzureSynthesizer {
    client: reqwest::Client,
    endpoint: String,
    api_key: SecretString,
}

impl AzureSynthesizer {
    /// Create a new Azure synthesizer
    ///
    /// `endpoint` is the full `cognitiveservices/v1` URL of the speech resource.
    ///
    /// # Errors
    ///
    /// Returns error if the API key or endpoint is missing
    pub fn new(api_key: SecretString, endpoint: String) -> crate::Result<Self> {
        if api_key.expose_secret().is_empty() {
            return Err(Error::Config("Azure API key required for TTS".to_string()));
        }
        if endpoint.is_empty() {
            return Err(Error::Config("Azure endpoint required for TTS".to_string()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            endpoint,
            api_key,
        })
    }
}

#[async_trait]
impl SpeechSynthesizer for AzureSynthesizer {
    fn render(&self, request: &SynthesisRequest) -> String {
        markup::render(request, Dialect::Azure)
    }

    async fn synthesize(&self, markup: &str) -> Result<Vec<u8>, ProviderError> {
        let body = markup::strip_trailing_markup_artifacts(markup);
        tracing::debug!(bytes = body.len(), "sending Azure TTS request");

        let response = self
            .client
            .post(&self.endpoint)
            .header("Ocp-Apim-Subscription-Key", self.api_key.expose_secret())
            .header("Content-Type", "application/ssml+xml")
            .header("X-Microsoft-OutputFormat", OUTPUT_FORMAT)
            .header("User-Agent", "zh-audio")
            .body(body)
            .send()
            .await
            .map_err(|e| ProviderError::from_transport(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, body = %body, "Azure TTS error");
            return Err(ProviderError::from_status("Azure", status.as_u16(), &body));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| ProviderError::from_transport(&e))?;
        Ok(audio.to_vec())
    }

    fn name(&self) -> &'static str {
        "azure"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_missing_key() {
        let result = AzureSynthesizer::new(
            SecretString::from(String::new()),
            "https://westeurope.tts.speech.microsoft.com/cognitiveservices/v1".to_string(),
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn rejects_missing_endpoint() {
        let result = AzureSynthesizer::new(SecretString::from("key".to_string()), String::new());
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn rejected_requests_are_retried() {
        for (status, body) in [(403, "Quota Exceeded"), (401, "bad key"), (400, "Bad Request")] {
            assert!(
                matches!(
                    ProviderError::from_status("Azure", status, body),
                    ProviderError::Transient(_)
                ),
                "status {status}"
            );
        }
    }
}
