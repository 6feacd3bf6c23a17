//! Cloze card lessons: the word, then the sentence it was blanked from

use std::path::{Path, PathBuf};

use super::{Kind, ProcessorContext, RunOptions, RunReport, Track, run_records, words};
use crate::Result;
use crate::input::{self, Cloze};

pub(super) async fn run(
    ctx: &ProcessorContext,
    source: &Path,
    options: RunOptions,
) -> Result<RunReport> {
    let clozes = input::load_clozes(source)?;
    run_records(clozes, options.jobs, options.fail_fast, |cloze| async move {
        let outcome = process(ctx, &cloze).await;
        (cloze.sentence_back, outcome)
    })
    .await
}

async fn process(ctx: &ProcessorContext, cloze: &Cloze) -> Result<Option<PathBuf>> {
    let word = &cloze.word;
    word.require_gloss()?;

    let mut track = Track::new(ctx);
    track.target(&word.chinese, 2000, false, 1).await?;
    track.target(&word.chinese, 1000, false, 1).await?;
    words::explain(&mut track, word).await?;

    track.target(&cloze.sentence_back, 2000, true, 2).await?;
    track.narrator(&cloze.english, 2000).await?;
    track.target(&cloze.sentence_back, 2000, true, 1).await?;
    track.examples(&word.examples).await?;

    track.finish(ctx.output_path(Kind::Clozes, &cloze.sentence_back)).await
}
