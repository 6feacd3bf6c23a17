//! DeepL translation

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::{Translator, with_retry};
use crate::audio::retry::RetryPolicy;
use crate::audio::retry::ProviderError;
use crate::{Error, Result};

const ENDPOINT: &str = "https://api-free.deepl.com/v2/translate";
const TARGET_LANG: &str = "EN";

#[derive(Serialize)]
struct TranslateRequest<'a> {
    text: [&'a str; 1],
    target_lang: &'static str,
}

#[derive(Deserialize)]
struct TranslateResponse {
    #[serde(default)]
    translations: Vec<Translation>,
}

#[derive(Deserialize)]
struct Translation {
    text: String,
}

/// Translates through the DeepL REST API
pub struct DeepLTranslator {
    client: reqwest::Client,
    endpoint: String,
    api_key: SecretString,
    policy: RetryPolicy,
}

impl DeepLTranslator {
    /// Create a translator against the DeepL free endpoint
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new(api_key: SecretString, policy: RetryPolicy) -> Result<Self> {
        Self::with_endpoint(api_key, ENDPOINT.to_string(), policy)
    }

    /// Create a translator against a custom endpoint (e.g. the pro API)
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn with_endpoint(
        api_key: SecretString,
        endpoint: String,
        policy: RetryPolicy,
    ) -> Result<Self> {
        if api_key.expose_secret().is_empty() {
            return Err(Error::Config("DeepL API key required".to_string()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            endpoint,
            api_key,
            policy,
        })
    }

    async fn call(&self, text: &str) -> std::result::Result<Option<String>, ProviderError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(
                "Authorization",
                format!("DeepL-Auth-Key {}", self.api_key.expose_secret()),
            )
            .json(&TranslateRequest {
                text: [text],
                target_lang: TARGET_LANG,
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
            tracing::warn!(status = %status, body = %body, "DeepL API error");
            return Err(ProviderError::from_status("DeepL", status.as_u16(), &body));
        }

        first_translation(&body)
    }
}

fn first_translation(body: &str) -> std::result::Result<Option<String>, ProviderError> {
    let parsed: TranslateResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::Transient(format!("invalid DeepL response: {e}")))?;
    Ok(parsed.translations.into_iter().next().map(|t| t.text))
}

#[async_trait]
impl Translator for DeepLTranslator {
    async fn translate(&self, text: &str) -> Result<String> {
        with_retry(self.name(), &self.policy, text, || self.call(text)).await
    }

    fn name(&self) -> &'static str {
        "deepl"
    }
}
