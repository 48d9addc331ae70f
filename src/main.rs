use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use screenmark::config::Config;
use screenmark::replay::{self, ReplayError, ReplayOptions};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Replay(#[from] ReplayError),
    #[error("cannot encode report: {0}")]
    Report(#[from] serde_json::Error),
}

impl CliError {
    fn user_message(&self) -> String {
        match self {
            Self::Replay(ReplayError::Session(e)) => e.user_message(),
            other => other.to_string(),
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "screenmark", about = "Screenshot annotation engine tools")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay an input script against an image and export the result.
    Replay(ReplayArgs),
}

#[derive(Args, Debug)]
struct ReplayArgs {
    /// PNG standing in for the captured page.
    #[arg(long)]
    image: PathBuf,

    /// JSON array of input events.
    #[arg(long)]
    events: PathBuf,

    /// JSON key-binding overrides.
    #[arg(long, env = "SCREENMARK_KEYMAP")]
    keymap: Option<PathBuf>,

    /// Output PNG, or a directory for a generated filename.
    #[arg(long)]
    out: PathBuf,

    /// Write the final annotations here as JSON.
    #[arg(long)]
    annotations: Option<PathBuf>,

    /// Select this region (x,y,width,height) before capturing.
    #[arg(long, value_parser = replay::parse_region)]
    region: Option<canvas::geom::Rect>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Replay(args) => run_replay(args).await,
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "screenmark failed");
            eprintln!("error: {}", e.user_message());
            ExitCode::FAILURE
        }
    }
}

async fn run_replay(args: ReplayArgs) -> Result<(), CliError> {
    let options = ReplayOptions {
        image: args.image,
        events: args.events,
        keymap: args.keymap,
        out: args.out,
        annotations: args.annotations,
        region: args.region,
    };
    let report = replay::run(Config::from_env(), &options).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
