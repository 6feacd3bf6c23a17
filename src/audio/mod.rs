//! Audio generation: caching, request building, synthesis and concatenation
//!
//! A processor turns a record into a sequence of [`SynthesisRequest`]s, looks
//! each one up in the [`FingerprintCache`], synthesizes misses through a
//! [`SynthesisClient`] and collects the clips into a [`ConcatenationPlan`].

pub mod azure;
pub mod cache;
pub mod client;
pub mod concat;
pub mod google;
pub mod markup;
pub mod query;
pub mod retry;
pub mod synth;
pub mod voices;

pub use azure::AzureSynthesizer;
pub use cache::FingerprintCache;
pub use client::SynthesisClient;
pub use concat::ConcatenationPlan;
pub use google::GoogleSynthesizer;
pub use markup::Dialect;
pub use query::{IgnoreList, QueryBuilder, Script, SynthesisRequest, TextFragment};
pub use retry::{ProviderError, RetryPolicy};
pub use synth::SpeechSynthesizer;
pub use voices::{CyclingVoiceSelector, RandomVoiceSelector, Voice, VoiceCatalog, VoiceSelector};
