//! Voice catalog and voice selection

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use rand::Rng;

/// Mandarin voices for Azure neural TTS
pub const AZURE_TARGET_VOICES: &[&str] = &[
    "zh-CN-XiaoxiaoNeural",
    "zh-CN-YunjianNeural",
    "zh-CN-XiaochenNeural",
    "zh-CN-YunyiMultilingualNeural",
];

/// English narrator voice for Azure neural TTS
pub const AZURE_NARRATOR_VOICE: &str = "en-US-AvaMultilingualNeural";

/// Mandarin voices for Google Cloud TTS
pub const GOOGLE_TARGET_VOICES: &[&str] = &[
    "cmn-CN-Wavenet-C",
    "cmn-CN-Wavenet-A",
    "cmn-TW-Wavenet-C",
    "cmn-TW-Wavenet-A",
];

/// English narrator voice for Google Cloud TTS
pub const GOOGLE_NARRATOR_VOICE: &str = "en-US-Standard-J";

/// A provider voice
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Voice {
    /// Provider voice name (e.g. "zh-CN-XiaoxiaoNeural")
    pub name: String,
    /// BCP-47 language code (e.g. "zh-CN")
    pub language: String,
}

impl Voice {
    /// Create a voice, deriving the language from the name prefix
    ///
    /// `zh-CN-XiaoxiaoNeural` and `cmn-CN-Wavenet-A` both carry their
    /// language in the first two dash-separated parts.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let language = name.splitn(3, '-').take(2).collect::<Vec<_>>().join("-");
        Self { name, language }
    }
}

/// Voices available to the query builder
#[derive(Debug, Clone)]
pub struct VoiceCatalog {
    /// Target-language voices, chosen from at random
    pub target: Vec<Voice>,
    /// Fixed voice for English instructions
    pub narrator: Voice,
}

impl Default for VoiceCatalog {
    fn default() -> Self {
        Self::azure()
    }
}

impl VoiceCatalog {
    fn from_static(target: &[&str], narrator: &str) -> Self {
        Self {
            target: target.iter().map(|v| Voice::new(*v)).collect(),
            narrator: Voice::new(narrator),
        }
    }

    /// Built-in Azure voices
    #[must_use]
    pub fn azure() -> Self {
        Self::from_static(AZURE_TARGET_VOICES, AZURE_NARRATOR_VOICE)
    }

    /// Built-in Google voices
    #[must_use]
    pub fn google() -> Self {
        Self::from_static(GOOGLE_TARGET_VOICES, GOOGLE_NARRATOR_VOICE)
    }

    /// Replace voices with configured names
    ///
    /// An empty `target` list or a missing narrator keeps the current voices.
    #[must_use]
    pub fn with_overrides(mut self, target: &[String], narrator: Option<&str>) -> Self {
        if !target.is_empty() {
            self.target = target.iter().map(Voice::new).collect();
        }
        if let Some(narrator) = narrator {
            self.narrator = Voice::new(narrator);
        }
        self
    }

    /// Assign a distinct target voice to each speaker, in the given order
    ///
    /// Speakers beyond the number of voices wrap around.
    #[must_use]
    pub fn assign_speakers(&self, speakers: &[String]) -> HashMap<String, Voice> {
        speakers
            .iter()
            .enumerate()
            .map(|(i, speaker)| (speaker.clone(), self.target_at(i).clone()))
            .collect()
    }

    /// Target voice at `index` modulo the list length (narrator if the list is empty)
    #[must_use]
    pub fn target_at(&self, index: usize) -> &Voice {
        if self.target.is_empty() {
            return &self.narrator;
        }
        &self.target[index % self.target.len()]
    }

    /// Draw a target voice through `selector`
    #[must_use]
    pub fn pick_target(&self, selector: &dyn VoiceSelector) -> &Voice {
        if self.target.is_empty() {
            return &self.narrator;
        }
        self.target_at(selector.pick(self.target.len()))
    }
}

/// Picks one of `n` voices
///
/// Implementations must not expose shared state to callers; each call is an
/// independent draw.
pub trait VoiceSelector: Send + Sync {
    /// Return an index in `0..n`. `n` is never zero.
    fn pick(&self, n: usize) -> usize;
}

/// Uniform random selection from the thread-local generator
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomVoiceSelector;

impl VoiceSelector for RandomVoiceSelector {
    fn pick(&self, n: usize) -> usize {
        rand::thread_rng().gen_range(0..n)
    }
}

/// Deterministic round-robin selection
///
/// Used in tests and when reproducible voice order is wanted.
#[derive(Debug, Default)]
pub struct CyclingVoiceSelector {
    next: AtomicUsize,
}

impl CyclingVoiceSelector {
    /// Start the cycle at `start`
    #[must_use]
    pub const fn starting_at(start: usize) -> Self {
        Self {
            next: AtomicUsize::new(start),
        }
    }
}

impl VoiceSelector for CyclingVoiceSelector {
    fn pick(&self, n: usize) -> usize {
        self.next.fetch_add(1, Ordering::Relaxed) % n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn voice_language_from_name() {
        assert_eq!(Voice::new("zh-CN-XiaoxiaoNeural").language, "zh-CN");
        assert_eq!(Voice::new("cmn-TW-Wavenet-A").language, "cmn-TW");
        assert_eq!(Voice::new("en-US-AvaMultilingualNeural").language, "en-US");
    }

    #[test]
    fn random_selector_stays_in_range() {
        let selector = RandomVoiceSelector;
        for _ in 0..200 {
            assert!(selector.pick(4) < 4);
        }
        assert_eq!(selector.pick(1), 0);
    }

    #[test]
    fn cycling_selector_is_deterministic() {
        let selector = CyclingVoiceSelector::default();
        let picks: Vec<usize> = (0..5).map(|_| selector.pick(3)).collect();
        assert_eq!(picks, vec![0, 1, 2, 0, 1]);

        let offset = CyclingVoiceSelector::starting_at(2);
        assert_eq!(offset.pick(4), 2);
    }

    #[test]
    fn speakers_get_distinct_voices() {
        let catalog = VoiceCatalog::default();
        let speakers = vec!["A".to_string(), "B".to_string()];
        let voices = catalog.assign_speakers(&speakers);

        assert_eq!(voices["A"], catalog.target[0]);
        assert_eq!(voices["B"], catalog.target[1]);
    }

    #[test]
    fn speakers_wrap_around_voice_list() {
        let catalog = VoiceCatalog::azure().with_overrides(&["zh-CN-A".to_string()], None);
        let speakers = vec!["A".to_string(), "B".to_string()];
        let voices = catalog.assign_speakers(&speakers);
        assert_eq!(voices["A"], voices["B"]);
    }

    #[test]
    fn empty_configured_target_list_keeps_builtins() {
        let catalog = VoiceCatalog::google().with_overrides(&[], Some("en-GB-Standard-A"));
        assert_eq!(catalog.target.len(), GOOGLE_TARGET_VOICES.len());
        assert_eq!(catalog.target[0].language, "cmn-CN");
        assert_eq!(catalog.narrator.name, "en-GB-Standard-A");
    }

    #[test]
    fn builtin_catalogs_use_provider_voice_names() {
        let google = VoiceCatalog::google();
        assert!(google.target.iter().all(|v| v.name.starts_with("cmn-")));
        assert_eq!(google.narrator.language, "en-US");

        let azure = VoiceCatalog::azure();
        assert!(azure.target.iter().all(|v| v.name.ends_with("Neural")));
    }
}
