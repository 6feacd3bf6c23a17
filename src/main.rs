use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use zh_audio::{Config, Kind, RunOptions};

/// zh-audio - Generate audio flashcards from Chinese study material
#[derive(Parser)]
#[command(name = "zh-audio", version, about)]
struct Cli {
    /// Kind of material in the source
    #[arg(value_enum)]
    kind: KindArg,

    /// Source file (directory for patterns)
    #[arg(short, long)]
    source: PathBuf,

    /// Output root; files land in `<out>/<kind>/`
    #[arg(short, long, env = "ZH_AUDIO_OUT_DIR")]
    out: Option<PathBuf>,

    /// Audio cache root
    #[arg(long, env = "ZH_AUDIO_CACHE_DIR")]
    cache_dir: Option<PathBuf>,

    /// Config file (default: ~/.config/zh-audio/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Records processed concurrently
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Stop at the first failing record
    #[arg(long)]
    fail_fast: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Sentences,
    Dialogs,
    Patterns,
    Clozes,
    Words,
}

impl From<KindArg> for Kind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Sentences => Self::Sentences,
            KindArg::Dialogs => Self::Dialogs,
            KindArg::Patterns => Self::Patterns,
            KindArg::Clozes => Self::Clozes,
            KindArg::Words => Self::Words,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity; RUST_LOG wins when set
    let filter = match cli.verbose {
        0 => "info",
        1 => "info,zh_audio=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!("fatal: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Returns whether every record succeeded
async fn run(cli: Cli) -> anyhow::Result<bool> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(out) = cli.out {
        config.out_dir = out;
    }
    if let Some(cache_dir) = cli.cache_dir {
        config.cache_dir = cache_dir;
    }
    if let Some(jobs) = cli.jobs {
        config.jobs = jobs.max(1);
    }
    tracing::debug!(?config, "loaded configuration");

    let context = config.processor_context()?;
    let options = RunOptions {
        jobs: config.jobs,
        fail_fast: cli.fail_fast,
    };

    let report = context.run(cli.kind.into(), &cli.source, options).await?;

    for failure in &report.failures {
        tracing::error!(record = %failure.record, error = %failure.error, "failed");
    }
    tracing::info!(summary = %report, "done");

    Ok(report.is_success())
}
