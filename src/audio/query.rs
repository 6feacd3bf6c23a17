//! Structured synthesis requests
//!
//! Processors describe what should be spoken as an ordered list of
//! [`TextFragment`]s. The provider markup is produced from that list in a
//! single pass by [`crate::audio::markup`], so fragments never need to be
//! patched up after concatenation.

use std::sync::Arc;

use super::voices::{Voice, VoiceCatalog, VoiceSelector};

/// Speaking rate used for target-language fragments
pub const DEFAULT_RATE: f32 = 0.7;

/// Speaking rate used for narrator fragments
pub const NARRATOR_RATE: f32 = 1.0;

/// Punctuation that produces empty or broken audio when sent on its own
pub const DEFAULT_IGNORE: &[&str] = &["。", "，", "！", "？", "…", ".", ",", "!", "?", " "];

/// Script class of a run of text, and the role a fragment is voiced in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    /// Chinese characters; target voices at the target rate
    Target,
    /// Latin and everything else that carries letters; the narrator
    Other,
}

/// Classify one character
///
/// Whitespace, digits and punctuation are neutral (`None`) and never cause a
/// script transition.
#[must_use]
pub fn script_of(c: char) -> Option<Script> {
    if is_han(c) {
        Some(Script::Target)
    } else if c.is_alphabetic() {
        Some(Script::Other)
    } else {
        None
    }
}

/// True for Han ideographs
#[must_use]
pub const fn is_han(c: char) -> bool {
    matches!(
        c,
        '\u{3007}'
            | '\u{3400}'..='\u{4DBF}'
            | '\u{4E00}'..='\u{9FFF}'
            | '\u{F900}'..='\u{FAFF}'
            | '\u{20000}'..='\u{2EBEF}'
            | '\u{30000}'..='\u{3134F}'
    )
}

/// A span of text with its voice and timing directives
#[derive(Debug, Clone, PartialEq)]
pub struct TextFragment {
    /// Text to speak, trimmed
    pub text: String,
    /// Speaker voice
    pub voice: Voice,
    /// Trailing silence in milliseconds
    pub pause_after: u32,
    /// Also render a whitespace-preserving (slow) variant
    pub split_rendering: bool,
    /// Script class the fragment was built for
    pub script: Script,
}

impl TextFragment {
    /// Text with all whitespace removed, spoken as one continuous utterance
    #[must_use]
    pub fn continuous_text(&self) -> String {
        self.text.chars().filter(|c| !c.is_whitespace()).collect()
    }

    /// True when a split rendering adds a second, whitespace-paced variant
    #[must_use]
    pub fn renders_twice(&self) -> bool {
        self.split_rendering && self.text.chars().any(char::is_whitespace)
    }
}

/// Ordered fragments plus global parameters for one audio unit
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisRequest {
    /// Fragments in input order; never empty after normalization
    pub fragments: Vec<TextFragment>,
    /// Speaking rate for target-language fragments
    pub rate: f32,
}

impl SynthesisRequest {
    /// True when every fragment was dropped
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Human-readable query text, used in logs and errors
    #[must_use]
    pub fn text(&self) -> String {
        self.fragments
            .iter()
            .map(|f| f.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Speaking rate for a fragment of the given script
    #[must_use]
    pub const fn rate_for(&self, script: Script) -> f32 {
        match script {
            Script::Target => self.rate,
            Script::Other => NARRATOR_RATE,
        }
    }
}

/// Strings that are never sent to the synthesizer
#[derive(Debug, Clone)]
pub struct IgnoreList {
    entries: Vec<String>,
}

impl Default for IgnoreList {
    fn default() -> Self {
        Self::new(DEFAULT_IGNORE.iter().copied())
    }
}

impl IgnoreList {
    /// Build from raw entries; entries are compared whitespace-free
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|e| strip_whitespace(e.as_ref()))
                .collect(),
        }
    }

    /// True when `text` is blank or matches an entry after whitespace removal
    #[must_use]
    pub fn is_ignored(&self, text: &str) -> bool {
        let normalized = strip_whitespace(text);
        normalized.is_empty() || self.entries.iter().any(|e| *e == normalized)
    }

    /// `None` for ignored text, the text otherwise
    #[must_use]
    pub fn drop_ignored<'a>(&self, text: &'a str) -> Option<&'a str> {
        (!self.is_ignored(text)).then_some(text)
    }
}

fn strip_whitespace(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Builds [`SynthesisRequest`]s with injected voice selection
#[derive(Clone)]
pub struct QueryBuilder {
    catalog: VoiceCatalog,
    selector: Arc<dyn VoiceSelector>,
    ignore: IgnoreList,
    rate: f32,
}

impl std::fmt::Debug for QueryBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryBuilder")
            .field("catalog", &self.catalog)
            .field("ignore", &self.ignore)
            .field("rate", &self.rate)
            .finish_non_exhaustive()
    }
}

impl QueryBuilder {
    /// Create a builder
    #[must_use]
    pub fn new(
        catalog: VoiceCatalog,
        selector: Arc<dyn VoiceSelector>,
        ignore: IgnoreList,
        rate: f32,
    ) -> Self {
        Self {
            catalog,
            selector,
            ignore,
            rate,
        }
    }

    /// Voice catalog in use
    #[must_use]
    pub const fn catalog(&self) -> &VoiceCatalog {
        &self.catalog
    }

    /// Start a new request
    #[must_use]
    pub fn request(&self) -> RequestBuilder<'_> {
        RequestBuilder {
            query: self,
            fragments: Vec::new(),
        }
    }
}

/// Accumulates fragments for one request
#[derive(Debug)]
pub struct RequestBuilder<'a> {
    query: &'a QueryBuilder,
    fragments: Vec<TextFragment>,
}

impl RequestBuilder<'_> {
    /// Append `text` spoken by `voice`, followed by `pause` ms of silence
    ///
    /// The narrator voice speaks in the narrator role; any other voice is a
    /// target voice. Ignored or blank text is dropped here and never reaches
    /// the provider.
    #[must_use]
    pub fn fragment(mut self, text: &str, voice: &Voice, pause: u32, split_rendering: bool) -> Self {
        let script = if *voice == self.query.catalog.narrator {
            Script::Other
        } else {
            Script::Target
        };
        self.push(text, voice, pause, split_rendering, script);
        self
    }

    /// Append target-language text in a randomly selected voice
    ///
    /// The text is spoken at the target rate with whitespace removed whatever
    /// characters it contains, so romanized tones are read like Han text.
    #[must_use]
    pub fn target(mut self, text: &str, pause: u32, split_rendering: bool) -> Self {
        let voice = self
            .query
            .catalog
            .pick_target(self.query.selector.as_ref())
            .clone();
        self.push(text, &voice, pause, split_rendering, Script::Target);
        self
    }

    /// Append English text in the narrator voice
    #[must_use]
    pub fn narrator(mut self, text: &str, pause: u32) -> Self {
        let voice = self.query.catalog.narrator.clone();
        self.push(text, &voice, pause, false, Script::Other);
        self
    }

    /// Split mixed text at script transitions and voice each run accordingly
    ///
    /// Target runs get a random target voice, everything else the narrator.
    /// Every run is trimmed and followed by `pause`.
    #[must_use]
    pub fn segment_by_script(mut self, text: &str, pause: u32) -> Self {
        for (run, script) in segment_runs(text) {
            let voice = match script {
                Script::Target => self
                    .query
                    .catalog
                    .pick_target(self.query.selector.as_ref())
                    .clone(),
                Script::Other => self.query.catalog.narrator.clone(),
            };
            self.push(&run, &voice, pause, false, script);
        }
        self
    }

    /// Finish the request
    #[must_use]
    pub fn build(self) -> SynthesisRequest {
        SynthesisRequest {
            fragments: self.fragments,
            rate: self.query.rate,
        }
    }

    fn push(
        &mut self,
        text: &str,
        voice: &Voice,
        pause: u32,
        split_rendering: bool,
        script: Script,
    ) {
        let Some(text) = self.query.ignore.drop_ignored(text.trim()) else {
            tracing::trace!(text, "dropping ignored fragment");
            return;
        };
        self.fragments.push(TextFragment {
            text: text.to_string(),
            voice: voice.clone(),
            pause_after: pause,
            split_rendering,
            script,
        });
    }
}

/// Split `text` into trimmed runs of a single script class
///
/// Neutral characters stay with the run they occur in. Blank runs are
/// skipped; a run with no classified character counts as [`Script::Other`].
#[must_use]
pub fn segment_runs(text: &str) -> Vec<(String, Script)> {
    let mut runs = Vec::new();
    let mut current = String::new();
    let mut class: Option<Script> = None;

    let mut flush = |run: &str, class: Option<Script>| {
        let trimmed = run.trim();
        if !trimmed.is_empty() {
            runs.push((trimmed.to_string(), class.unwrap_or(Script::Other)));
        }
    };

    for c in text.chars() {
        if let Some(script) = script_of(c) {
            match class {
                Some(current_class) if current_class != script => {
                    flush(&current, class);
                    current.clear();
                    class = Some(script);
                }
                None => class = Some(script),
                Some(_) => {}
            }
        }
        current.push(c);
    }
    flush(&current, class);

    runs
}
