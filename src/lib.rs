//! zh-audio - Audio flashcards for Chinese study material
//!
//! This library turns sentence lists, dialogs, grammar patterns, cloze cards
//! and vocabulary records into spoken lessons:
//! - Text-to-speech through Azure or Google, with bounded retries
//! - A content-addressed cache of rendered phrases
//! - Ordered concatenation of clips with pauses into one WAV per record
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                     Processors                       │
//! │  Sentences │ Dialogs │ Patterns │ Clozes │ Words    │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                      Audio                           │
//! │  QueryBuilder │ FingerprintCache │ SynthesisClient  │
//! │               ConcatenationPlan                      │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                    Providers                         │
//! │   Azure TTS  │  Google TTS  │  DeepL  │  Translate  │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod audio;
pub mod config;
pub mod error;
pub mod input;
pub mod processors;
pub mod translate;

pub use config::Config;
pub use error::{Error, Result};
pub use processors::{Kind, ProcessorContext, RunOptions, RunReport};
