//! Command-line driver for Homer-Wright rosette runs.
//!
//! Loads a run file, lays out a ring of neurons, runs the simulation for the
//! configured simulated time and streams frames as JSON lines.

mod runner;
mod settings;
mod tissue;

use std::{fs::File, io::BufWriter, path::PathBuf};

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use runner::{JsonLinesAnimator, NullAnimator, Runner};
use settings::RunConfig;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML run file; built-in defaults when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Where to write JSON-lines frames.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Overrides `engine.seed`.
    #[arg(long)]
    seed: Option<u64>,

    /// Overrides `run.total_time`.
    #[arg(long)]
    total_time: Option<f64>,

    /// Overrides `run.frame_every`.
    #[arg(long)]
    frame_every: Option<u64>,
}

fn init_logging() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "rosette_run=info,rosette_core=warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let args = Args::parse();

    let mut cfg = match &args.config {
        Some(path) => RunConfig::load(path)?,
        None => RunConfig::default(),
    };
    if let Some(seed) = args.seed {
        cfg.engine.seed = seed;
    }
    if let Some(t) = args.total_time {
        cfg.run.total_time = t;
    }
    if let Some(n) = args.frame_every {
        cfg.run.frame_every = n;
    }

    let mut runner = Runner::new(cfg)?;
    let summary = match &args.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("creating frame file {}", path.display()))?;
            let mut animator = JsonLinesAnimator::new(BufWriter::new(file));
            let summary = runner.run(&mut animator)?;
            animator
                .finish()
                .with_context(|| format!("writing frames to {}", path.display()))?;
            summary
        }
        None => runner.run(&mut NullAnimator)?,
    };

    println!(
        "simulated {:.2} time units: {} steps, {} cycles, {} neurites, {} differentiated, {} frames",
        runner.time(),
        summary.steps,
        summary.cycles,
        summary.neurites,
        summary.differentiated,
        summary.frames
    );
    Ok(())
}
