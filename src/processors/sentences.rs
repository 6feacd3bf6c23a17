//! Sentence flashcards: sentence, translation, sentence

use std::path::{Path, PathBuf};

use super::{Kind, ProcessorContext, RunOptions, RunReport, Track, run_records};
use crate::Result;
use crate::input;

pub(super) async fn run(
    ctx: &ProcessorContext,
    source: &Path,
    options: RunOptions,
) -> Result<RunReport> {
    let sentences = input::load_sentences(source)?;
    run_records(sentences, options.jobs, options.fail_fast, |sentence| async move {
        let outcome = process(ctx, &sentence).await;
        (sentence, outcome)
    })
    .await
}

async fn process(ctx: &ProcessorContext, sentence: &str) -> Result<Option<PathBuf>> {
    let translation = ctx.translator.translate(sentence).await?;

    let mut track = Track::new(ctx);
    track.target(sentence, 1500, true, 2).await?;
    track.narrator(&translation, 1500).await?;
    track.target(sentence, 1500, true, 1).await?;

    track.finish(ctx.output_path(Kind::Sentences, sentence)).await
}
