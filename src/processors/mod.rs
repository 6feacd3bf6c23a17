//! Record processors
//!
//! Each processor loads one kind of study material, lays out the clips of a
//! record on a [`Track`] and merges them into `<out>/<kind>/<key>.wav`.

mod clozes;
mod dialogs;
mod patterns;
mod report;
mod sentences;
mod words;

pub use report::{RecordFailure, RunReport, run_records};

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::audio::cache::{FingerprintCache, normalize_key};
use crate::audio::client::SynthesisClient;
use crate::audio::concat::ConcatenationPlan;
use crate::audio::query::{QueryBuilder, SynthesisRequest};
use crate::input::Example;
use crate::input::text::unquote_han;
use crate::translate::Translator;
use crate::{Error, Result};

/// Cache key of the closing cue appended to pattern files
pub const CUE_KEY: &str = "peep";

/// Kind of study material
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// One sentence per line
    Sentences,
    /// Dialogs separated by `---`
    Dialogs,
    /// Directory of grammar pattern JSON files
    Patterns,
    /// JSON array of cloze cards
    Clozes,
    /// JSON array of vocabulary records
    Words,
}

impl Kind {
    /// Output subdirectory name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sentences => "sentences",
            Self::Dialogs => "dialogs",
            Self::Patterns => "patterns",
            Self::Clozes => "clozes",
            Self::Words => "words",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Run options shared by all processors
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    /// Records processed concurrently
    pub jobs: usize,
    /// Abort on the first failing record
    pub fail_fast: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            jobs: 1,
            fail_fast: false,
        }
    }
}

/// Everything a processor needs to turn records into audio
#[derive(Clone)]
pub struct ProcessorContext {
    /// Rendered-phrase cache
    pub cache: FingerprintCache,
    /// Synthesis with retries
    pub client: SynthesisClient,
    /// Request construction and voice selection
    pub queries: QueryBuilder,
    /// English translations for sentences and dialogs
    pub translator: Arc<dyn Translator>,
    /// Root of the deliverables
    pub out_dir: PathBuf,
}

impl fmt::Debug for ProcessorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessorContext")
            .field("cache", &self.cache)
            .field("client", &self.client)
            .field("translator", &self.translator.name())
            .field("out_dir", &self.out_dir)
            .finish_non_exhaustive()
    }
}

impl ProcessorContext {
    /// Deliverable path for a record of `kind` keyed by `key`
    #[must_use]
    pub fn output_path(&self, kind: Kind, key: &str) -> PathBuf {
        self.out_dir
            .join(kind.as_str())
            .join(format!("{}.wav", normalize_key(key)))
    }

    /// Cached rendering of `key`, synthesizing `request` on a miss
    ///
    /// Concurrent callers with the same key wait on the cache lock; only the
    /// first one reaches the provider.
    ///
    /// # Errors
    ///
    /// Returns an error if synthesis fails
    pub async fn cached_clip(
        &self,
        key: &str,
        request: &SynthesisRequest,
    ) -> Result<Option<PathBuf>> {
        if request.is_empty() {
            return Ok(None);
        }

        let path = self.cache.cache_path(key);
        if self.cache.exists(&path) {
            tracing::debug!(path = %path.display(), "cache hit");
            return Ok(Some(path));
        }

        let _guard = self.cache.lock(&path).await;
        if self.cache.exists(&path) {
            tracing::debug!(path = %path.display(), "cache filled while waiting");
            return Ok(Some(path));
        }

        tracing::debug!(path = %path.display(), "cache miss");
        self.client.synthesize(request, &path).await
    }

    /// Process every record of `kind` found at `source`
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be loaded, or on the first
    /// failing record when `options.fail_fast` is set.
    pub async fn run(&self, kind: Kind, source: &Path, options: RunOptions) -> Result<RunReport> {
        tracing::info!(kind = %kind, source = %source.display(), jobs = options.jobs, "processing");
        let report = match kind {
            Kind::Sentences => sentences::run(self, source, options).await?,
            Kind::Dialogs => dialogs::run(self, source, options).await?,
            Kind::Patterns => patterns::run(self, source, options).await?,
            Kind::Clozes => clozes::run(self, source, options).await?,
            Kind::Words => words::run(self, source, options).await?,
        };
        tracing::info!(kind = %kind, summary = %report, "finished");
        Ok(report)
    }
}

/// Clips of one record, in playback order
pub struct Track<'a> {
    ctx: &'a ProcessorContext,
    plan: ConcatenationPlan,
}

impl<'a> Track<'a> {
    /// Start an empty track
    #[must_use]
    pub fn new(ctx: &'a ProcessorContext) -> Self {
        Self {
            ctx,
            plan: ConcatenationPlan::new(),
        }
    }

    /// Target-language `text` in a random voice, repeated `times`
    ///
    /// # Errors
    ///
    /// Returns an error if synthesis fails
    pub async fn target(&mut self, text: &str, pause: u32, split: bool, times: usize) -> Result<()> {
        let request = self.ctx.queries.request().target(text, 0, split).build();
        let clip = self.ctx.cached_clip(text, &request).await?;
        for _ in 0..times {
            self.plan.add_optional(clip.clone(), pause);
        }
        Ok(())
    }

    /// English `text` in the narrator voice
    ///
    /// # Errors
    ///
    /// Returns an error if synthesis fails
    pub async fn narrator(&mut self, text: &str, pause: u32) -> Result<()> {
        let request = self.ctx.queries.request().narrator(text, 0).build();
        let clip = self.ctx.cached_clip(text, &request).await?;
        self.plan.add_optional(clip, pause);
        Ok(())
    }

    /// Mixed-script `text`, each run voiced in its own language, `pause`
    /// between runs and after the clip
    ///
    /// # Errors
    ///
    /// Returns an error if synthesis fails
    pub async fn segmented(&mut self, text: &str, pause: u32) -> Result<()> {
        let request = self
            .ctx
            .queries
            .request()
            .segment_by_script(text, pause)
            .build();
        let clip = self.ctx.cached_clip(text, &request).await?;
        self.plan.add_optional(clip, pause);
        Ok(())
    }

    /// Example block: sentence twice, translation, sentence once more
    ///
    /// # Errors
    ///
    /// Returns an error if synthesis fails
    pub async fn examples(&mut self, examples: &[Example]) -> Result<()> {
        for example in examples {
            self.target(&example.chinese, 2000, true, 2).await?;
            self.narrator(&unquote_han(&example.english), 2000).await?;
            self.target(&example.chinese, 2000, true, 1).await?;
        }
        Ok(())
    }

    /// Append an already rendered clip
    pub fn add(&mut self, clip: Option<PathBuf>, pause: u32) {
        self.plan.add_optional(clip, pause);
    }

    /// Merge the track into `output`
    ///
    /// An empty track writes nothing and yields `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns an error if decoding or encoding fails
    pub async fn finish(self, output: PathBuf) -> Result<Option<PathBuf>> {
        if self.plan.is_empty() {
            return Ok(None);
        }

        let plan = self.plan;
        let written = tokio::task::spawn_blocking(move || plan.merge(&output))
            .await
            .map_err(|e| Error::Io(std::io::Error::other(e)))??;

        tracing::info!(path = %written.display(), "audio file written");
        Ok(Some(written))
    }
}
