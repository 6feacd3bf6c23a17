//! Shared test utilities

#![allow(dead_code)]

use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use zh_audio::ProcessorContext;
use zh_audio::audio::query::DEFAULT_RATE;
use zh_audio::audio::{
    CyclingVoiceSelector, FingerprintCache, IgnoreList, ProviderError, QueryBuilder, RetryPolicy,
    SpeechSynthesizer, SynthesisClient, VoiceCatalog,
};
use zh_audio::translate::Translator;
use zh_audio::{Error, Result};

/// Sample rate of stub audio
pub const STUB_RATE: u32 = 16000;

/// Length of every stub clip in milliseconds
pub const STUB_CLIP_MS: u64 = 100;

/// Encode `seconds` of a constant 16-bit mono tone as WAV bytes
#[must_use]
pub fn tone_wav(seconds: f32, sample_rate: u32) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).expect("wav writer");
        let frames = (seconds * sample_rate as f32) as usize;
        for _ in 0..frames {
            writer.write_sample(6000_i16).expect("write sample");
        }
        writer.finalize().expect("finalize wav");
    }
    cursor.into_inner()
}

/// Duration of a WAV file in milliseconds
#[must_use]
pub fn wav_duration_ms(path: &Path) -> u64 {
    let reader = hound::WavReader::open(path).expect("open wav");
    u64::from(reader.duration()) * 1000 / u64::from(reader.spec().sample_rate)
}

/// Synthesizer that answers every request with a short WAV clip
///
/// Records the markup of every call; the first `failures` calls fail
/// transiently.
#[derive(Default)]
pub struct StubSynthesizer {
    pub markups: Mutex<Vec<String>>,
    pub failures: AtomicU32,
}

impl StubSynthesizer {
    #[must_use]
    pub fn failing(failures: u32) -> Self {
        Self {
            markups: Mutex::default(),
            failures: AtomicU32::new(failures),
        }
    }

    #[must_use]
    pub fn calls(&self) -> usize {
        self.markups.lock().unwrap().len()
    }

    #[must_use]
    pub fn markups(&self) -> Vec<String> {
        self.markups.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechSynthesizer for StubSynthesizer {
    async fn synthesize(&self, markup: &str) -> std::result::Result<Vec<u8>, ProviderError> {
        self.markups.lock().unwrap().push(markup.to_string());
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(ProviderError::Transient("503 Service Unavailable".into()));
        }
        Ok(tone_wav(STUB_CLIP_MS as f32 / 1000.0, STUB_RATE))
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}

/// Translator that prefixes the input with `EN: `
#[derive(Default)]
pub struct StubTranslator {
    pub calls: AtomicU32,
    pub empty: bool,
}

#[async_trait]
impl Translator for StubTranslator {
    async fn translate(&self, text: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.empty {
            return Err(Error::MissingTranslation(text.to_string()));
        }
        Ok(format!("EN: {text}"))
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}

/// Processor context over stubs, rooted in `dir`
#[must_use]
pub fn stub_context(
    dir: &Path,
    synth: Arc<StubSynthesizer>,
    translator: Arc<StubTranslator>,
) -> ProcessorContext {
    ProcessorContext {
        cache: FingerprintCache::new(dir.join("cache").join("zh")),
        client: SynthesisClient::new(synth, RetryPolicy::immediate(3)),
        queries: QueryBuilder::new(
            VoiceCatalog::default(),
            Arc::new(CyclingVoiceSelector::default()),
            IgnoreList::default(),
            DEFAULT_RATE,
        ),
        translator,
        out_dir: dir.join("out"),
    }
}
