//! Vocabulary lessons

use std::path::{Path, PathBuf};

use super::{Kind, ProcessorContext, RunOptions, RunReport, Track, run_records};
use crate::Result;
use crate::input::text::unquote_han;
use crate::input::{self, Word};

/// Intro spoken before a word's example sentences
pub(super) const EXAMPLES_INTRO: &str = "Here are a few example sentences";

pub(super) async fn run(
    ctx: &ProcessorContext,
    source: &Path,
    options: RunOptions,
) -> Result<RunReport> {
    let words = input::load_words(source)?;
    run_records(words, options.jobs, options.fail_fast, |word| async move {
        let outcome = process(ctx, &word).await;
        (word.chinese, outcome)
    })
    .await
}

async fn process(ctx: &ProcessorContext, word: &Word) -> Result<Option<PathBuf>> {
    word.require_gloss()?;

    let mut track = Track::new(ctx);
    track.target(&word.chinese, 1000, true, 2).await?;
    explain(&mut track, word).await?;
    track.examples(&word.examples).await?;

    track.finish(ctx.output_path(Kind::Words, &word.chinese)).await
}

/// Tones, glosses, repetitions and the note, ending with the examples intro
///
/// Shared with cloze lessons, which open with their own word repetitions.
pub(super) async fn explain(track: &mut Track<'_>, word: &Word) -> Result<()> {
    if let Some(tones) = word.tones_sentence() {
        track.narrator(&tones, 1000).await?;
    }
    track.target(&word.chinese, 2000, true, 1).await?;
    track.segmented(&word.gloss_text(), 1000).await?;
    track.target(&word.chinese, 1500, true, 2).await?;
    track.segmented(&unquote_han(&word.note), 200).await?;
    track.narrator(EXAMPLES_INTRO, 1000).await
}
