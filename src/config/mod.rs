//! Configuration management
//!
//! Precedence is env > TOML file > default. The TOML file lives at
//! `~/.config/zh-audio/config.toml` unless a path is given explicitly.

pub mod file;

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use crate::audio::cache::FingerprintCache;
use crate::audio::client::SynthesisClient;
use crate::audio::query::{DEFAULT_IGNORE, DEFAULT_RATE, IgnoreList, QueryBuilder};
use crate::audio::retry::RetryPolicy;
use crate::audio::synth::SpeechSynthesizer;
use crate::audio::voices::{RandomVoiceSelector, VoiceCatalog};
use crate::audio::{AzureSynthesizer, GoogleSynthesizer};
use crate::processors::ProcessorContext;
use crate::translate::{DeepLTranslator, GoogleTranslator, Translator};
use crate::{Error, Result};

pub use file::{ZhAudioConfigFile, config_file_path, load_config_file};

/// Subdirectory of the cache root holding target-language renderings
pub const CACHE_LANGUAGE_DIR: &str = "zh";

/// Default request-level language for Google TTS
pub const DEFAULT_GOOGLE_LANGUAGE: &str = "cmn-CN";

/// Speech synthesis backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TtsProvider {
    /// Azure neural voices
    #[default]
    Azure,
    /// Google Cloud text-to-speech
    Google,
}

impl FromStr for TtsProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "azure" => Ok(Self::Azure),
            "google" | "gcp" => Ok(Self::Google),
            other => Err(Error::Config(format!("unknown TTS provider: {other}"))),
        }
    }
}

/// Translation backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TranslatorProvider {
    /// DeepL REST API
    #[default]
    DeepL,
    /// Google Cloud Translation
    Google,
}

impl FromStr for TranslatorProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "deepl" => Ok(Self::DeepL),
            "google" | "gcp" => Ok(Self::Google),
            other => Err(Error::Config(format!("unknown translator: {other}"))),
        }
    }
}

/// API keys (env > toml > None)
#[derive(Debug, Default)]
pub struct ApiKeys {
    pub azure: Option<SecretString>,
    pub google: Option<SecretString>,
    pub deepl: Option<SecretString>,
}

/// Speech synthesis configuration
#[derive(Debug)]
pub struct TtsConfig {
    /// Selected backend
    pub provider: TtsProvider,
    /// Azure endpoint URL
    pub azure_endpoint: Option<String>,
    /// Google request-level language code
    pub google_language_code: String,
    /// Speaking rate for target-language text
    pub rate: f32,
    /// Narrator voice name (`None` = the provider's built-in narrator)
    pub narrator_voice: Option<String>,
    /// Target-language voice names (empty = the provider's built-in list)
    pub target_voices: Vec<String>,
    /// Texts never sent for synthesis
    pub ignore: Vec<String>,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            provider: TtsProvider::default(),
            azure_endpoint: None,
            google_language_code: DEFAULT_GOOGLE_LANGUAGE.to_string(),
            rate: DEFAULT_RATE,
            narrator_voice: None,
            target_voices: Vec::new(),
            ignore: DEFAULT_IGNORE.iter().map(ToString::to_string).collect(),
        }
    }
}

/// Resolved configuration
#[derive(Debug)]
pub struct Config {
    /// Speech synthesis
    pub tts: TtsConfig,
    /// Translation backend
    pub translator: TranslatorProvider,
    /// Provider credentials
    pub api_keys: ApiKeys,
    /// Audio cache root (renderings live under `<cache_dir>/zh`)
    pub cache_dir: PathBuf,
    /// Deliverable root
    pub out_dir: PathBuf,
    /// Retry policy for provider calls
    pub retry: RetryPolicy,
    /// Records processed concurrently
    pub jobs: usize,
}

/// Default cache directory: `~/.cache/zh-audio`
fn default_cache_dir() -> PathBuf {
    directories::BaseDirs::new().map_or_else(
        || PathBuf::from(".cache").join("zh-audio"),
        |d| d.cache_dir().join("zh-audio"),
    )
}

fn parse_env<T: FromStr>(name: &str, value: Option<String>) -> Result<Option<T>> {
    value
        .map(|v| {
            v.trim()
                .parse()
                .map_err(|_| Error::Config(format!("invalid value for {name}: {v}")))
        })
        .transpose()
}

fn secret(value: Option<String>) -> Option<SecretString> {
    value.filter(|v| !v.is_empty()).map(SecretString::from)
}

impl Config {
    /// Load configuration from the environment and the config file
    ///
    /// # Errors
    ///
    /// Returns error if an explicit config file is unreadable or a value is
    /// malformed
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let fc = file::load_config_file(config_path)?;
        Self::resolve(fc, |name| std::env::var(name).ok())
    }

    /// Merge `fc` with values from `env`
    ///
    /// # Errors
    ///
    /// Returns error if a provider name or number does not parse
    pub fn resolve(fc: ZhAudioConfigFile, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = TtsConfig::default();

        let provider = match env("ZH_AUDIO_PROVIDER").or(fc.tts.provider) {
            Some(p) => p.parse()?,
            None => TtsProvider::default(),
        };

        let translator = match env("ZH_AUDIO_TRANSLATOR").or(fc.translate.provider) {
            Some(p) => p.parse()?,
            None => TranslatorProvider::default(),
        };

        let api_keys = ApiKeys {
            azure: secret(env("AZURE_TTS_KEY").or(fc.api_keys.azure)),
            google: secret(env("GOOGLE_API_KEY").or(fc.api_keys.google)),
            deepl: secret(env("DEEPL_API_KEY").or(fc.api_keys.deepl)),
        };

        let tts = TtsConfig {
            provider,
            azure_endpoint: env("AZURE_TTS_ENDPOINT").or(fc.tts.azure_endpoint),
            google_language_code: fc
                .tts
                .google_language_code
                .unwrap_or(defaults.google_language_code),
            rate: fc.tts.rate.unwrap_or(defaults.rate),
            narrator_voice: fc.tts.narrator_voice,
            target_voices: fc.tts.target_voices.unwrap_or_default(),
            ignore: fc.tts.ignore.unwrap_or(defaults.ignore),
        };

        let cache_dir = env("ZH_AUDIO_CACHE_DIR")
            .or(fc.paths.cache_dir)
            .map_or_else(default_cache_dir, PathBuf::from);
        let out_dir = env("ZH_AUDIO_OUT_DIR")
            .or(fc.paths.out_dir)
            .map_or_else(|| PathBuf::from("out"), PathBuf::from);

        let default_retry = RetryPolicy::default();
        let retry = RetryPolicy {
            max_attempts: parse_env("ZH_AUDIO_MAX_ATTEMPTS", env("ZH_AUDIO_MAX_ATTEMPTS"))?
                .or(fc.retry.max_attempts)
                .unwrap_or(default_retry.max_attempts),
            base_delay: fc
                .retry
                .base_delay_ms
                .map_or(default_retry.base_delay, Duration::from_millis),
            max_delay: fc
                .retry
                .max_delay_ms
                .map_or(default_retry.max_delay, Duration::from_millis),
        };

        let jobs = parse_env("ZH_AUDIO_JOBS", env("ZH_AUDIO_JOBS"))?
            .or(fc.run.jobs)
            .unwrap_or(1)
            .max(1);

        Ok(Self {
            tts,
            translator,
            api_keys,
            cache_dir,
            out_dir,
            retry,
            jobs,
        })
    }

    /// Build the configured speech synthesizer
    ///
    /// # Errors
    ///
    /// Returns error if the provider's credentials are missing
    pub fn synthesizer(&self) -> Result<Arc<dyn SpeechSynthesizer>> {
        match self.tts.provider {
            TtsProvider::Azure => {
                let key = require(self.api_keys.azure.as_ref(), "AZURE_TTS_KEY")?;
                let endpoint = self.tts.azure_endpoint.clone().ok_or_else(|| {
                    Error::Config("AZURE_TTS_ENDPOINT is required for Azure TTS".to_string())
                })?;
                Ok(Arc::new(AzureSynthesizer::new(key, endpoint)?))
            }
            TtsProvider::Google => {
                let key = require(self.api_keys.google.as_ref(), "GOOGLE_API_KEY")?;
                Ok(Arc::new(GoogleSynthesizer::new(
                    key,
                    self.tts.google_language_code.clone(),
                )?))
            }
        }
    }

    /// Build the configured translator
    ///
    /// # Errors
    ///
    /// Returns error if the provider's credentials are missing
    pub fn translator(&self) -> Result<Arc<dyn Translator>> {
        match self.translator {
            TranslatorProvider::DeepL => {
                let key = require(self.api_keys.deepl.as_ref(), "DEEPL_API_KEY")?;
                Ok(Arc::new(DeepLTranslator::new(key, self.retry.clone())?))
            }
            TranslatorProvider::Google => {
                let key = require(self.api_keys.google.as_ref(), "GOOGLE_API_KEY")?;
                Ok(Arc::new(GoogleTranslator::new(key, self.retry.clone())?))
            }
        }
    }

    /// Voices for the selected provider, with configured overrides applied
    #[must_use]
    pub fn voice_catalog(&self) -> VoiceCatalog {
        let builtin = match self.tts.provider {
            TtsProvider::Azure => VoiceCatalog::azure(),
            TtsProvider::Google => VoiceCatalog::google(),
        };
        builtin.with_overrides(&self.tts.target_voices, self.tts.narrator_voice.as_deref())
    }

    /// Query builder with random voice selection
    #[must_use]
    pub fn query_builder(&self) -> QueryBuilder {
        QueryBuilder::new(
            self.voice_catalog(),
            Arc::new(RandomVoiceSelector),
            IgnoreList::new(&self.tts.ignore),
            self.tts.rate,
        )
    }

    /// Cache over `<cache_dir>/zh`
    #[must_use]
    pub fn cache(&self) -> FingerprintCache {
        FingerprintCache::new(self.cache_dir.join(CACHE_LANGUAGE_DIR))
    }

    /// Assemble everything processors need
    ///
    /// # Errors
    ///
    /// Returns error if provider credentials are missing
    pub fn processor_context(&self) -> Result<ProcessorContext> {
        Ok(ProcessorContext {
            cache: self.cache(),
            client: SynthesisClient::new(self.synthesizer()?, self.retry.clone()),
            queries: self.query_builder(),
            translator: self.translator()?,
            out_dir: self.out_dir.clone(),
        })
    }
}

fn require(key: Option<&SecretString>, name: &str) -> Result<SecretString> {
    key.map(|k| SecretString::from(k.expose_secret().to_string()))
        .ok_or_else(|| Error::Config(format!("{name} is not set")))
}
