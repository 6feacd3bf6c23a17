//! Google Cloud Translation (v2 REST)

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::{Translator, with_retry};
use crate::audio::retry::RetryPolicy;
use crate::audio::retry::ProviderError;
use crate::{Error, Result};

const ENDPOINT: &str = "https://translation.googleapis.com/language/translate/v2";

#[derive(Serialize)]
struct TranslateRequest<'a> {
    q: [&'a str; 1],
    source: &'static str,
    target: &'static str,
    format: &'static str,
}

#[derive(Deserialize)]
struct TranslateResponse {
    data: TranslateData,
}

#[derive(Deserialize)]
struct TranslateData {
    #[serde(default)]
    translations: Vec<Translation>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Translation {
    translated_text: String,
}

/// Translates Chinese text to English through Google Cloud Translation
pub struct GoogleTranslator {
    client: reqwest::Client,
    api_key: SecretString,
    policy: RetryPolicy,
}

impl GoogleTranslator {
    /// Create a new Google translator
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new(api_key: SecretString, policy: RetryPolicy) -> Result<Self> {
        if api_key.expose_secret().is_empty() {
            return Err(Error::Config("Google API key required for translation".to_string()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            policy,
        })
    }

    async fn call(&self, text: &str) -> std::result::Result<Option<String>, ProviderError> {
        let response = self
            .client
            .post(ENDPOINT)
            .query(&[("key", self.api_key.expose_secret())])
            .json(&TranslateRequest {
                q: [text],
                source: "zh",
                target: "en",
                format: "text",
            })
            .send()
            .await
            .map_err(|e| ProviderError::from_transport(&e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::from_transport(&e))?;

        if !status.is_success() {
            tracing::warn!(status = %status, body = %body, "Google Translate error");
            return Err(ProviderError::from_status("Google Translate", status.as_u16(), &body));
        }

        first_translation(&body)
    }
}

fn first_translation(body: &str) -> std::result::Result<Option<String>, ProviderError> {
    let parsed: TranslateResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::Fatal(format!("invalid Google Translate response: {e}")))?;
    Ok(parsed
        .data
        .translations
        .into_iter()
        .next()
        .map(|t| t.translated_text))
}

#[async_trait]
impl Translator for GoogleTranslator {
    async fn translate(&self, text: &str) -> Result<String> {
        with_retry(self.name(), &self.policy, text, || self.call(text)).await
    }

    fn name(&self) -> &'static str {
        "google"
    }
}
