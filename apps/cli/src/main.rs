//! Ensemble CLI - run multi-agent teams from the command line
//!
//! This CLI provides an `ensemble` command that loads a team definition from
//! TOML, drives it with the orchestration engine and prints the outcome.
//! Runs use an offline echo model, so no provider credentials are needed.

mod commands;
mod echo;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use commands::{resume, run, strategies, validate};

/// Ensemble CLI - multi-agent workflow orchestration
#[derive(Parser, Debug)]
#[command(
    name = "ensemble",
    author,
    version,
    about = "Ensemble - multi-agent workflow orchestration",
    long_about = "Ensemble drives a team of agents through a shared conversation under a workflow strategy.\nTeams are described in TOML; suspended runs can be snapshotted and resumed."
)]
struct Args {
    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(short, long, default_value = "warn", global = true)]
    log_level: String,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a team
    ///
    /// Loads the team from a TOML file and drives it until it completes,
    /// stops or suspends. Suspended runs are written to the snapshot
    /// directory so they can be resumed.
    Run {
        /// Team configuration file
        #[arg(short, long)]
        config: PathBuf,

        /// Strategy identifier overriding the configured one
        #[arg(long)]
        strategy: Option<String>,

        /// Round count overriding max_rounds
        #[arg(long)]
        rounds: Option<u32>,

        /// Directory suspended runs are saved in
        #[arg(long, default_value = ".ensemble/snapshots")]
        snapshot_dir: PathBuf,

        /// Output the outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// Resume a suspended run from its snapshot
    Resume {
        /// Snapshot file written by `ensemble run`
        #[arg(short, long)]
        snapshot: PathBuf,

        /// Answer to the pending question
        #[arg(long, conflicts_with = "credential_supplied")]
        answer: Option<String>,

        /// The missing credential has been stored
        #[arg(long)]
        credential_supplied: bool,

        /// Output the outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate a team configuration without running it
    Validate {
        /// Team configuration file
        #[arg(short, long)]
        config: PathBuf,
    },

    /// List workflow strategies and their legacy identifiers
    Strategies,
}

fn init_tracing(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false).with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.without_time().init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level, args.log_format);

    match args.command {
        Command::Run { config, strategy, rounds, snapshot_dir, json } => {
            run::execute(run::RunOptions { config, strategy, rounds, snapshot_dir, json }).await?;
        }
        Command::Resume { snapshot, answer, credential_supplied, json } => {
            resume::execute(snapshot, answer, credential_supplied, json).await?;
        }
        Command::Validate { config } => {
            validate::execute(&config)?;
        }
        Command::Strategies => {
            strategies::execute();
        }
    }

    Ok(())
}
