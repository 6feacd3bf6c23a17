//! Error types for zh-audio

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for zh-audio operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while generating audio
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Non-retryable text-to-speech failure
    #[error("TTS error: {0}")]
    Tts(String),

    /// Synthesis kept failing transiently until the attempt budget ran out
    #[error("exceeded retries ({attempts}) for query: {query}: {last_error}")]
    RetriesExhausted {
        /// Query text that could not be synthesized
        query: String,
        /// Number of attempts made
        attempts: u32,
        /// Error reported by the final attempt
        last_error: String,
    },

    /// An audio clip could not be decoded
    #[error("failed to decode {}: {reason}", path.display())]
    Decode {
        /// Offending clip
        path: PathBuf,
        /// Decoder message
        reason: String,
    },

    /// Output audio could not be encoded
    #[error("failed to encode {}: {reason}", path.display())]
    Encode {
        /// Output path
        path: PathBuf,
        /// Encoder message
        reason: String,
    },

    /// Merge was called on a plan without clips
    #[error("no input files provided")]
    EmptyInput,

    /// Clip and pause bookkeeping diverged
    #[error("the number of pauses ({pauses}) must match the number of files ({clips})")]
    ClipCountMismatch {
        /// Number of clips in the plan
        clips: usize,
        /// Number of pauses in the plan
        pauses: usize,
    },

    /// Translator returned no result
    #[error("translations empty for text: {0}")]
    MissingTranslation(String),

    /// Word or cloze record without any dictionary gloss
    #[error("word {0} has no translation")]
    IncompleteVocabularyEntry(String),

    /// Translation provider error
    #[error("translate error: {0}")]
    Translate(String),

    /// Malformed input file
    #[error("input error: {0}")]
    Input(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
