// tests/boundary_scenarios.rs
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Literal-seed scenarios exercising edges of the rule set: minimum grid
//! size, an empty ocean, starvation, a saturated breeding cascade, and
//! cross-run determinism against a real output file.

use wator_sim::frame::{bytes_per_frame, FileFrameSink, MemoryFrameSink};
use wator_sim::planner::Planner;
use wator_sim::rules::Rules;
use wator_sim::simulation::Simulation;

fn single_worker_plan() -> Planner {
    Planner::mock(vec![0], vec![vec![0]])
}

/// S1: a 4x8 ocean with 4 fish and 1 shark survives its first chronon
/// without the fish population leaving a plausible range, and without
/// exploding past the grid's capacity over 20 chronons.
#[test]
fn s1_minimum_viable_grid() {
    let rules = Rules::new(4, 8, 4, 1, 3, 10, 3).unwrap();
    let mut sim = Simulation::new(rules, single_worker_plan(), 1, false).unwrap();

    sim.step();
    let (_, fish, _) = sim.grid().census();
    assert!((3..=5).contains(&fish), "fish count after 1 chronon was {fish}");

    for _ in 0..19 {
        sim.step();
    }
    let (_, fish, shark) = sim.grid().census();
    assert!(fish <= 32);
    assert!(shark <= 32);
}

/// S2: an ocean with no animals stays all-water forever, and every frame
/// is all-zero bytes.
#[test]
fn s2_all_water() {
    let rules = Rules::new(10, 10, 0, 0, 3, 10, 3).unwrap();
    let mut sim = Simulation::new(rules, single_worker_plan(), 5, false).unwrap();

    let mut sink = MemoryFrameSink::default();
    sim.run(7, &mut sink).unwrap();

    assert_eq!(sink.frames.len(), 7);
    for frame in &sink.frames {
        assert!(frame.iter().all(|&b| b == 0));
    }
    let (water, fish, shark) = sim.grid().census();
    assert_eq!(water, 100);
    assert_eq!(fish, 0);
    assert_eq!(shark, 0);
}

/// S3: sharks with a starve time of 1 and nothing to eat are all dead
/// after `sharkStarveTime + 1 = 2` chronons.
#[test]
fn s3_starvation() {
    let rules = Rules::new(4, 8, 0, 4, 3, 10, 1).unwrap();
    let mut sim = Simulation::new(rules, single_worker_plan(), 3, false).unwrap();

    sim.step();
    sim.step();

    let (_, _, shark) = sim.grid().census();
    assert_eq!(shark, 0);
}

/// S4: an 8x8 grid with 63 fish and a breed time of 0 saturates to 64 fish
/// after one chronon — every fish breeds, and the 64th cell (the only
/// water tile) is filled exactly once.
#[test]
fn s4_breeding_cascade() {
    let rules = Rules::new(8, 8, 63, 0, 0, 10, 3).unwrap();
    let mut sim = Simulation::new(rules, single_worker_plan(), 2, false).unwrap();

    sim.step();

    let (water, fish, shark) = sim.grid().census();
    assert_eq!(fish, 64);
    assert_eq!(water, 0);
    assert_eq!(shark, 0);
}

/// S6: two independently constructed simulations with identical rules,
/// plan and seed produce byte-identical output files, each exactly
/// `16 + iterCnt * bytes_per_frame` bytes long.
#[test]
fn s6_determinism_across_runs() {
    let rules = Rules::new(12, 12, 10, 4, 3, 10, 3).unwrap();
    let iter_cnt = 6u64;

    let dir = tempfile::tempdir().unwrap();
    let path_a = dir.path().join("a.map");
    let path_b = dir.path().join("b.map");

    {
        let mut sim = Simulation::new(rules, single_worker_plan(), 77, false).unwrap();
        let mut sink = FileFrameSink::create(&path_a).unwrap();
        sim.run(iter_cnt, &mut sink).unwrap();
    }
    {
        let mut sim = Simulation::new(rules, single_worker_plan(), 77, false).unwrap();
        let mut sink = FileFrameSink::create(&path_b).unwrap();
        sim.run(iter_cnt, &mut sink).unwrap();
    }

    let bytes_a = std::fs::read(&path_a).unwrap();
    let bytes_b = std::fs::read(&path_b).unwrap();
    assert_eq!(bytes_a, bytes_b);

    let expected_len = 16 + iter_cnt * bytes_per_frame(12, 12);
    assert_eq!(bytes_a.len() as u64, expected_len);
}
