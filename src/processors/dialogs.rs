//! Dialog flashcards
//!
//! Each speaker keeps one voice for the whole dialog, so line clips are
//! rendered into a scratch directory instead of the shared cache.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use super::{Kind, ProcessorContext, RunOptions, RunReport, Track, run_records};
use crate::Result;
use crate::audio::voices::Voice;
use crate::input::{self, Dialog};

pub(super) async fn run(
    ctx: &ProcessorContext,
    source: &Path,
    options: RunOptions,
) -> Result<RunReport> {
    let dialogs = input::load_dialogs(source)?;
    run_records(dialogs, options.jobs, options.fail_fast, |dialog| async move {
        let outcome = process(ctx, &dialog).await;
        (dialog.text(), outcome)
    })
    .await
}

async fn process(ctx: &ProcessorContext, dialog: &Dialog) -> Result<Option<PathBuf>> {
    let translation = ctx.translator.translate(&dialog.continuous_text()).await?;

    let catalog = ctx.queries.catalog();
    let voices = catalog.assign_speakers(&dialog.speakers);
    let scratch = TempDir::new()?;

    let mut track = Track::new(ctx);
    for (index, line) in dialog.lines.iter().enumerate() {
        let voice = voices.get(&line.speaker).unwrap_or_else(|| catalog.target_at(0));
        let name = format!("line-{index}");
        let clip = scratch_clip(ctx, &scratch, &name, &line.text, voice, false).await?;
        track.add(clip, 700);
    }

    track.narrator(&translation, 1500).await?;

    for (index, line) in dialog.lines.iter().enumerate() {
        let voice = voices.get(&line.speaker).unwrap_or_else(|| catalog.target_at(0));
        let name = format!("slow-{index}");
        let clip = scratch_clip(ctx, &scratch, &name, &line.text, voice, true).await?;
        track.add(clip, 1000);
    }

    let written = track
        .finish(ctx.output_path(Kind::Dialogs, &dialog.text()))
        .await?;
    drop(scratch);
    Ok(written)
}

async fn scratch_clip(
    ctx: &ProcessorContext,
    scratch: &TempDir,
    name: &str,
    text: &str,
    voice: &Voice,
    split: bool,
) -> Result<Option<PathBuf>> {
    let request = ctx.queries.request().fragment(text, voice, 0, split).build();
    let path = scratch.path().join(format!("{name}.mp3"));
    ctx.client.synthesize(&request, &path).await
}
