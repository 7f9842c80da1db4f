//! chess-review - engine-backed review of chess positions and games.
//!
//! Prints one JSON document on stdout per invocation; logs go to stderr.

mod output;

use anyhow::Context;
use chess_analysis::{CancelFlag, GameOptions, ReviewConfig, ReviewError, ReviewService};
use clap::{Parser, Subcommand};
use output::{GameJson, PositionJson};
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::signal;

/// Exit status for unusable input (bad FEN, no legal moves).
const EXIT_BAD_INPUT: u8 = 2;

#[derive(Parser)]
#[command(name = "chess-review")]
#[command(about = "Engine-backed chess position and game review")]
struct Cli {
    /// Configuration file (defaults to ./chess-review.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// UCI engine executable, overriding the configuration file
    #[arg(long, global = true)]
    engine: Option<PathBuf>,

    /// Log per-ply and per-command detail
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyse a single position
    Position {
        /// Position in FEN notation
        fen: String,
        /// Search depth ceiling
        #[arg(short, long)]
        depth: Option<u32>,
        /// Time budget in milliseconds
        #[arg(short, long)]
        movetime: Option<u64>,
    },
    /// Review every move of a game
    Game {
        /// PGN or plain move list, `-` for stdin
        file: String,
        /// Search depth ceiling for each position
        #[arg(short, long)]
        depth: Option<u32>,
        /// Time budget in milliseconds for each position
        #[arg(short, long)]
        movetime: Option<u64>,
        /// Bypass the result cache
        #[arg(long)]
        no_cache: bool,
    },
}

fn read_notation(file: &str) -> anyhow::Result<String> {
    if file == "-" {
        let mut notation = String::new();
        std::io::stdin()
            .read_to_string(&mut notation)
            .context("Failed to read game from stdin")?;
        Ok(notation)
    } else {
        std::fs::read_to_string(file).with_context(|| format!("Failed to read game file {}", file))
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<ReviewConfig> {
    let mut config = ReviewConfig::load(cli.config.as_deref()).with_context(|| match &cli.config {
        Some(path) => format!("Failed to load config {:?}", path),
        None => format!("Failed to load {}", ReviewConfig::FILE_NAME),
    })?;
    if let Some(engine) = &cli.engine {
        config.engine.path = engine.clone();
    }
    Ok(config)
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}

/// Bad input exits with its own status; every other failure exits with 1.
fn exit_status(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<ReviewError>() {
        Some(review) if review.is_bad_input() => EXIT_BAD_INPUT,
        _ => 1,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if cli.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .init();

    // Returning lets the runtime shut down and engine leases drop normally.
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::from(exit_status(&err))
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    tracing::info!("Engine: {:?}", config.engine.path);
    let service = ReviewService::from_config(&config);

    match cli.command {
        Commands::Position {
            fen,
            depth,
            movetime,
        } => {
            let depth = depth.unwrap_or(config.analysis.depth);
            let movetime = movetime.unwrap_or(config.analysis.movetime_ms);
            let analysis = service
                .analyze_position(&fen, depth, movetime)
                .await?;
            print_json(&PositionJson::new(&fen, depth, movetime, &analysis))?;
        }
        Commands::Game {
            file,
            depth,
            movetime,
            no_cache,
        } => {
            let notation = read_notation(&file)?;
            let options = GameOptions {
                depth: depth.unwrap_or(config.analysis.depth),
                time_budget_ms: movetime.unwrap_or(config.analysis.movetime_ms),
                cache_enabled: !no_cache,
            };

            let cancel = CancelFlag::new();
            let on_signal = cancel.clone();
            tokio::spawn(async move {
                if signal::ctrl_c().await.is_ok() {
                    tracing::info!("Interrupt received, stopping after the current ply");
                    on_signal.cancel();
                }
            });

            let report = service
                .analyze_game_with_cancel(&notation, &options, &cancel)
                .await?;
            if let Some(token) = &report.truncated_at {
                tracing::warn!("Game truncated at illegal move {:?}", token);
            }
            print_json(&GameJson::new(&file, &options, &report))?;
        }
    }

    Ok(())
}
