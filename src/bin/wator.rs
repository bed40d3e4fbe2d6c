// src/bin/wator.rs
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command-line driver for the Wa-Tor simulation engine.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use rand::RngCore;

use wator_sim::frame::FileFrameSink;
use wator_sim::planner::Planner;
use wator_sim::rules::Rules;
use wator_sim::simulation::Simulation;

/// Parallel, NUMA-aware Wa-Tor predator-prey simulation.
#[derive(Debug, Parser)]
#[command(name = "wator", version, about)]
struct Cli {
    /// Grid width, in cells.
    #[arg(long)]
    width: u32,

    /// Grid height, in cells.
    #[arg(long)]
    height: u32,

    /// Number of chronons to simulate.
    #[arg(long)]
    itercnt: u32,

    /// Initial fish count. Defaults to width*height/10, minimum 1.
    #[arg(long)]
    fish: Option<u64>,

    /// Initial shark count. Defaults to width*height/30, minimum 1.
    #[arg(long)]
    sharks: Option<u64>,

    /// Chronons a fish must live before it can breed.
    #[arg(long, default_value_t = wator_sim::constants::DEFAULT_FISH_BREED_TIME)]
    fishbreed: u32,

    /// Chronons a shark must live before it can breed.
    #[arg(long, default_value_t = wator_sim::constants::DEFAULT_SHARK_BREED_TIME)]
    sharkbreed: u32,

    /// Chronons a shark tolerates without eating before starving.
    #[arg(long, default_value_t = wator_sim::constants::DEFAULT_SHARK_STARVE_TIME)]
    sharkstarve: u32,

    /// Number of worker CPUs. Defaults to the host's logical core count.
    #[arg(long)]
    workers: Option<usize>,

    /// Never assign two workers to hyperthread siblings of the same core.
    #[arg(long)]
    disable_ht: bool,

    /// PRNG seed. Defaults to OS entropy.
    #[arg(long)]
    seed: Option<u32>,

    /// Path to write packed frames to.
    #[arg(long, default_value = "/dev/null")]
    output: PathBuf,

    /// Print per-chronon timing statistics instead of progress logs.
    #[arg(long)]
    benchmark: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let cell_count = cli.width as u64 * cli.height as u64;
    let fish = cli.fish.unwrap_or_else(|| (cell_count / 10).max(1));
    let sharks = cli.sharks.unwrap_or_else(|| (cell_count / 30).max(1));
    let workers = cli.workers.unwrap_or_else(num_cpus::get);
    let seed = cli.seed.unwrap_or_else(|| rand::rng().next_u32()) as u64;

    let rules = Rules::new(
        cli.width,
        cli.height,
        fish,
        sharks,
        cli.fishbreed,
        cli.sharkbreed,
        cli.sharkstarve,
    )
    .context("invalid rules")?;

    let plan = Planner::new(workers, !cli.disable_ht).context("failed to plan worker CPUs")?;
    tracing::info!(
        workers,
        numa = plan.is_numa(),
        seed,
        "starting wator run"
    );

    let mut sim = Simulation::new(rules, plan, seed, true).context("failed to build simulation")?;
    let mut sink = FileFrameSink::create(&cli.output)
        .with_context(|| format!("failed to open output file {}", cli.output.display()))?;

    sim.run(cli.itercnt as u64, &mut sink)
        .context("simulation run failed")?;

    let stats = sim.stats();
    if cli.benchmark {
        println!(
            "chronons={} compute_time={:?} avg_chronon_time={:?} waiting_time={:?}",
            stats.chronons_run,
            stats.compute_time,
            stats.avg_chronon_time(),
            stats.waiting_time,
        );
    } else {
        let (water, fish, sharks) = sim.grid().census();
        tracing::info!(water, fish, sharks, "run complete");
    }

    Ok(())
}
