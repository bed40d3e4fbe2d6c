// src/simulation.rs
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ties the grid, planner and worker pool together into a runnable
//! simulation: one [`Simulation::step`] call advances every stripe by one
//! chronon (two barrier-separated half-iterations).

use std::time::{Duration, Instant};

use rand_core::RngCore;

use crate::error::Result;
use crate::frame::{encode_frame, FrameSink};
use crate::grid::Grid;
use crate::planner::Planner;
use crate::rng::Lfsr;
use crate::rules::Rules;
use crate::worker::{self, Worker};

/// Timing and throughput figures accumulated across the run, surfaced by
/// the `--benchmark` CLI flag.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulationStats {
    pub chronons_run: u64,
    pub compute_time: Duration,
    pub waiting_time: Duration,
}

impl SimulationStats {
    pub fn avg_chronon_time(&self) -> Duration {
        if self.chronons_run == 0 {
            Duration::ZERO
        } else {
            self.compute_time / self.chronons_run as u32
        }
    }
}

/// A running Wa-Tor simulation: grid state, the worker pool it was built
/// with, and a master RNG that reseeds every worker once per half-iteration
/// so a run is fully determined by `(rules, plan, seed)`.
pub struct Simulation {
    grid: Grid,
    rules: Rules,
    plan: Planner,
    workers: Vec<Worker>,
    pin_threads: bool,
    master_rng: Lfsr,
    stats: SimulationStats,
}

impl Simulation {
    pub fn new(rules: Rules, plan: Planner, seed: u64, pin_threads: bool) -> Result<Self> {
        let mut grid = Grid::new(&rules, &plan)?;
        let mut master_rng = Lfsr::new(seed);

        let mut seed_rng = master_rng.clone();
        grid.randomize(&rules, &mut seed_rng);
        // Advance past whatever `seed_rng` consumed so per-worker reseeding
        // below does not replay the same bits `randomize` just used.
        master_rng = seed_rng;

        let cpu_ids = flattened_cpu_order(&plan);
        if pin_threads {
            worker::pin_current_thread(cpu_ids[0]);
        }
        let workers = cpu_ids[1..]
            .iter()
            .map(|&cpu| Worker::start(cpu, pin_threads))
            .collect();

        Ok(Simulation {
            grid,
            rules,
            plan,
            workers,
            pin_threads,
            master_rng,
            stats: SimulationStats::default(),
        })
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    pub fn plan(&self) -> &Planner {
        &self.plan
    }

    pub fn stats(&self) -> SimulationStats {
        self.stats
    }

    /// Advances the grid by one chronon: an even-parity half-iteration,
    /// then an odd-parity one, each dispatched across the worker pool and
    /// followed by a full barrier.
    pub fn step(&mut self) {
        let started = Instant::now();
        self.half_iteration(true);
        self.half_iteration(false);
        self.stats.compute_time += started.elapsed();
        self.stats.chronons_run += 1;
    }

    fn half_iteration(&mut self, even: bool) {
        let width = self.grid.width();
        let rules = self.rules;
        let worker_count = self.plan.cpu_count();
        let seeds: Vec<u64> = (0..worker_count).map(|_| self.master_rng.next_u64()).collect();

        let raw_contexts = self.grid.raw_stripe_contexts_for_parity(even);
        debug_assert_eq!(raw_contexts.len(), worker_count);

        for (j, raw) in raw_contexts.into_iter().enumerate() {
            let seed = seeds[j];
            // SAFETY: every stripe this half-iteration touches belongs to
            // exactly one `raw` entry (see `Grid::stripe_contexts_for_parity`),
            // and `wait_idle` below blocks until every dispatched task has
            // returned before `self.grid` is touched again, so the 'static
            // bound this closure needs is honored in practice even though
            // `raw.bind` cannot express the real, shorter lifetime.
            let task: Box<dyn FnOnce() + Send + 'static> = Box::new(move || {
                let mut ctx = unsafe { raw.bind::<'static>() };
                let mut rng = Lfsr::new(seed);
                crate::kernel::update_stripe(&mut ctx, width, &rules, &mut rng);
            });

            if j == 0 {
                Worker::run_inline(task);
            } else {
                self.workers[j - 1].push(task);
            }
        }

        let waited = Instant::now();
        for worker in &self.workers {
            worker.wait_idle();
        }
        self.stats.waiting_time += waited.elapsed();
    }

    /// Runs `chronons` chronons, writing one frame per chronon to `sink`
    /// (the header is written once, before the first frame).
    pub fn run<S: FrameSink>(&mut self, chronons: u64, sink: &mut S) -> Result<()> {
        sink.write_header(self.grid.width() as u32, self.grid.height() as u32)?;
        for _ in 0..chronons {
            self.step();
            let frame = encode_frame(&self.grid);
            sink.write_frame(&frame)?;
        }
        sink.flush()?;
        Ok(())
    }
}

/// Flattens `plan`'s per-NUMA CPU lists into the same order
/// `Grid::with_alloc` assigns stripes in, so worker index `j` always owns
/// stripes `2j` and `2j+1`.
fn flattened_cpu_order(plan: &Planner) -> Vec<usize> {
    let mut cpus = Vec::with_capacity(plan.cpu_count());
    for &numa_id in plan.numa_list() {
        cpus.extend_from_slice(plan.cpu_list_per_numa(numa_id));
    }
    cpus
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::MemoryFrameSink;

    fn rules(w: u32, h: u32) -> Rules {
        Rules::new(w, h, (w as u64 * h as u64) / 10, (w as u64 * h as u64) / 30, 3, 10, 3).unwrap()
    }

    #[test]
    fn deterministic_for_same_seed() {
        let plan_a = Planner::mock(vec![0], vec![vec![0, 1]]);
        let plan_b = Planner::mock(vec![0], vec![vec![0, 1]]);
        let r = rules(16, 16);
        let mut sim_a = Simulation::new(r, plan_a, 42, false).unwrap();
        let mut sim_b = Simulation::new(r, plan_b, 42, false).unwrap();

        let mut sink_a = MemoryFrameSink::default();
        let mut sink_b = MemoryFrameSink::default();
        sim_a.run(5, &mut sink_a).unwrap();
        sim_b.run(5, &mut sink_b).unwrap();

        assert_eq!(sink_a.frames, sink_b.frames);
    }

    #[test]
    fn different_seeds_usually_diverge() {
        let plan_a = Planner::mock(vec![0], vec![vec![0, 1]]);
        let plan_b = Planner::mock(vec![0], vec![vec![0, 1]]);
        let r = rules(16, 16);
        let mut sim_a = Simulation::new(r, plan_a, 1, false).unwrap();
        let mut sim_b = Simulation::new(r, plan_b, 2, false).unwrap();

        let mut sink_a = MemoryFrameSink::default();
        let mut sink_b = MemoryFrameSink::default();
        sim_a.run(5, &mut sink_a).unwrap();
        sim_b.run(5, &mut sink_b).unwrap();

        assert_ne!(sink_a.frames, sink_b.frames);
    }

    #[test]
    fn frame_header_matches_grid_dimensions() {
        let plan = Planner::mock(vec![0], vec![vec![0]]);
        let r = rules(12, 8);
        let mut sim = Simulation::new(r, plan, 7, false).unwrap();
        let mut sink = MemoryFrameSink::default();
        sim.run(3, &mut sink).unwrap();
        assert_eq!(sink.header, Some((12, 8)));
        assert_eq!(sink.frames.len(), 3);
    }

    #[test]
    fn multi_worker_run_matches_single_worker_population_trend() {
        let plan = Planner::mock(vec![0], vec![vec![0, 1, 2, 3]]);
        let r = Rules::new(32, 32, 40, 15, 3, 10, 3).unwrap();
        let mut sim = Simulation::new(r, plan, 55, false).unwrap();
        for _ in 0..10 {
            sim.step();
        }
        let (water, fish, shark) = sim.grid().census();
        assert_eq!(water + fish + shark, 32 * 32);
    }
}
