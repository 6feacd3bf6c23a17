//! Speech synthesizer capability

use async_trait::async_trait;

use super::markup::{self, Dialect};
use super::query::SynthesisRequest;
use super::retry::ProviderError;

/// A text-to-speech provider
///
/// Takes provider markup and returns raw audio bytes (MP3).
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Serialize a request into this provider's markup
    fn render(&self, request: &SynthesisRequest) -> String {
        markup::render(request, Dialect::Azure)
    }

    /// Synthesize markup into audio bytes
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Transient`] for failures worth retrying
    async fn synthesize(&self, markup: &str) -> Result<Vec<u8>, ProviderError>;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}
