#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that plays a Depths dungeon on autopilot.

mod summary;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use depths_core::{Controller, Cue};
use depths_session::{PlayerInput, Session, SessionConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::summary::Summary;

/// Runs a seeded dungeon in attract mode and prints what happened.
#[derive(Debug, Parser)]
#[command(name = "depths", version)]
struct Args {
    /// TOML configuration file; defaults are used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Dungeon seed, overriding the configuration file.
    #[arg(long)]
    seed: Option<u64>,
    /// Floor width, overriding the configuration file.
    #[arg(long)]
    width: Option<u32>,
    /// Floor height, overriding the configuration file.
    #[arg(long)]
    height: Option<u32>,
    /// Number of turns to simulate.
    #[arg(long, default_value_t = 500)]
    turns: u64,
    /// Summary format written to stdout.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let config = load_config(&args)?;
    let summary = run(config, args.turns)?;

    match args.format {
        OutputFormat::Text => print!("{summary}"),
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("failed to encode summary")?
        ),
    }
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn load_config(args: &Args) -> Result<SessionConfig> {
    let mut config = match &args.config {
        Some(path) => SessionConfig::load(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => SessionConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(width) = args.width {
        config.width = width;
    }
    if let Some(height) = args.height {
        config.height = height;
    }
    // Nobody is at the keyboard.
    config.viewer = Controller::PathFollowing;
    Ok(config)
}

fn run(config: SessionConfig, turns: u64) -> Result<Summary> {
    let mut session = Session::new(config).context("invalid configuration")?;
    let mut summary = Summary::new(session.config().seed, turns);
    take_first_offer(&mut session, &mut summary);

    for _ in 0..turns {
        let report = session.turn(PlayerInput::Idle);
        summary.record_turn(&report);

        let changed = report.mission.is_some() || report.cues.contains(&Cue::Descend);
        if changed && session.mission_target().is_none() {
            take_first_offer(&mut session, &mut summary);
        }
    }

    summary.finish(&session);
    info!(
        seed = summary.seed,
        turns,
        floor = summary.final_floor,
        score = summary.score,
        "run_finished"
    );
    Ok(summary)
}

fn take_first_offer(session: &mut Session, summary: &mut Summary) {
    let offers = session.offer_missions();
    summary.record_offers(&offers);
    if let Some(mission) = offers.into_iter().next() {
        session.accept_mission(mission);
    }
}
