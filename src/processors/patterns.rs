//! Grammar pattern lessons

use std::path::{Path, PathBuf};

use super::{CUE_KEY, Kind, ProcessorContext, RunOptions, RunReport, Track, run_records};
use crate::Result;
use crate::input::text::{clean_note, clean_structure};
use crate::input::{self, Grammar};

pub(super) async fn run(
    ctx: &ProcessorContext,
    source: &Path,
    options: RunOptions,
) -> Result<RunReport> {
    let patterns = input::load_patterns(source)?;
    run_records(patterns, options.jobs, options.fail_fast, |pattern| async move {
        let outcome = process(ctx, &pattern).await;
        (pattern.pattern, outcome)
    })
    .await
}

async fn process(ctx: &ProcessorContext, grammar: &Grammar) -> Result<Option<PathBuf>> {
    let mut track = Track::new(ctx);

    track.target(&grammar.pattern, 1500, true, 2).await?;
    track.segmented(&clean_note(&grammar.note), 200).await?;
    track.segmented(&clean_structure(&grammar.structure), 500).await?;
    track.narrator("Here are a few examples", 1000).await?;
    track.examples(&grammar.examples).await?;
    track
        .narrator("The most important points when using the pattern are:", 2000)
        .await?;
    track.narrator(&grammar.summary.join("\n"), 1500).await?;

    let cue = ctx.cache.cache_path(CUE_KEY);
    if ctx.cache.exists(&cue) {
        track.add(Some(cue), 1500);
    } else {
        tracing::warn!(path = %cue.display(), "closing cue missing from cache");
    }

    track.finish(ctx.output_path(Kind::Patterns, &grammar.pattern)).await
}
