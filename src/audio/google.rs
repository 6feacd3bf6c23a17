//! Google Cloud text-to-speech

use async_trait::async_trait;
use base64::Engine;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::markup::{self, Dialect};
use super::query::SynthesisRequest;
use super::retry::ProviderError;
use super::synth::SpeechSynthesizer;
use crate::Error;

const ENDPOINT: &str = "https://texttospeech.googleapis.com/v1/text:synthesize";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeRequest<'a> {
    input: SsmlInput<'a>,
    voice: VoiceParams<'a>,
    audio_config: AudioConfig,
}

#[derive(Serialize)]
struct SsmlInput<'a> {
    ssml: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceParams<'a> {
    language_code: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AudioConfig {
    audio_encoding: &'static str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    audio_content: String,
}

/// Synthesizes SSML through the Google Cloud TTS REST API
pub struct GoogleSynthesizer {
    client: reqwest::Client,
    api_key: SecretString,
    language_code: String,
}

impl GoogleSynthesizer {
    /// Create a new Google synthesizer
    ///
    /// Voices are chosen inside the SSML; `language_code` is the request-level
    /// fallback (e.g. "cmn-CN").
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new(api_key: SecretString, language_code: String) -> crate::Result<Self> {
        if api_key.expose_secret().is_empty() {
            return Err(Error::Config("Google API key required for TTS".to_string()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            language_code,
        })
    }
}

/// Decode the `audioContent` field of a synthesize response
fn decode_audio(body: &str) -> Result<Vec<u8>, ProviderError> {
    let parsed: SynthesizeResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::Fatal(format!("invalid Google TTS response: {e}")))?;
    base64::engine::general_purpose::STANDARD
        .decode(parsed.audio_content)
        .map_err(|e| ProviderError::Fatal(format!("invalid Google TTS audio: {e}")))
}

#[async_trait]
impl SpeechSynthesizer for GoogleSynthesizer {
    fn render(&self, request: &SynthesisRequest) -> String {
        markup::render(request, Dialect::Google)
    }

    async fn synthesize(&self, markup: &str) -> Result<Vec<u8>, ProviderError> {
        let request = SynthesizeRequest {
            input: SsmlInput { ssml: markup },
            voice: VoiceParams {
                language_code: &self.language_code,
            },
            audio_config: AudioConfig {
                audio_encoding: "MP3",
            },
        };

        let response = self
            .client
            .post(ENDPOINT)
            .query(&[("key", self.api_key.expose_secret())])
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::from_transport(&e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::from_transport(&e))?;

        if !status.is_success() {
            tracing::warn!(status = %status, body = %body, "Google TTS error");
            return Err(ProviderError::from_status("Google", status.as_u16(), &body));
        }

        decode_audio(&body)
    }

    fn name(&self) -> &'static str {
        "google"
    }
}
