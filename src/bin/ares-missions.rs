#![forbid(unsafe_code)]

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ares_missions::{DeliveryMode, GeneratorConfig, MissionPipeline, PlayerContext};

/// Upper bound on `--count`; each mission is a separate remote call.
const MAX_COUNT: u32 = 100;

#[derive(Parser)]
#[command(
    name = "ares-missions",
    version,
    about = "Ask a hosted chat model for a mission contract and print it as JSON"
)]
struct Cli {
    /// Require email_header/email_text in the mission (email delivery)
    #[arg(long)]
    email: bool,

    /// Player context JSON file sent to the model
    #[arg(long, conflicts_with = "sample_context")]
    context: Option<PathBuf>,

    /// Use the built-in demo player as context
    #[arg(long)]
    sample_context: bool,

    /// Number of independent missions to request (N > 1 prints a JSON array)
    #[arg(
        long,
        default_value_t = 1,
        value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_COUNT))
    )]
    count: u32,

    /// Debug logging on stderr
    #[arg(long, short)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(2)
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("ares_missions=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ares_missions=info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr).with_target(false))
        .with(filter)
        .init();
}

/// Errors returned here are fatal; generation failures print `null` instead.
async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let context = if let Some(path) = &cli.context {
        Some(read_json::<PlayerContext>(path)?)
    } else if cli.sample_context {
        Some(PlayerContext::sample())
    } else {
        None
    };

    let mode = if cli.email {
        DeliveryMode::Email
    } else {
        DeliveryMode::Direct
    };

    // Credential first: nothing touches the network without one.
    let config = GeneratorConfig::from_env()?.with_delivery_mode(mode);
    let pipeline = MissionPipeline::from_config(&config)?;

    let json = if cli.count == 1 {
        let mission = pipeline.generate_or_none(context.as_ref()).await;
        serde_json::to_string_pretty(&mission)?
    } else {
        let missions = pipeline
            .generate_batch(context.as_ref(), cli.count as usize)
            .await;
        serde_json::to_string_pretty(&missions)?
    };

    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{json}")?;
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(
    path: &PathBuf,
) -> Result<T, Box<dyn std::error::Error>> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    let value = serde_json::from_str::<T>(&raw)
        .map_err(|e| format!("invalid context {}: {e}", path.display()))?;
    Ok(value)
}
