// src/lib.rs
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A parallel, NUMA-aware engine for the Wa-Tor predator-prey cellular
//! automaton.
//!
//! The ocean is a toroidal grid split into horizontal stripes, two per
//! worker. Each chronon advances in two barrier-separated half-iterations
//! (even-parity stripes, then odd-parity stripes) so no two workers ever
//! touch the same row at once. [`planner::Planner`] maps the requested
//! worker count onto NUMA nodes and CPUs; [`worker::Worker`] runs one OS
//! thread per assigned CPU; [`kernel::update_stripe`] is the per-cell rule
//! engine; [`simulation::Simulation`] ties it together and drives
//! [`frame`] output.

pub mod cell;
pub mod constants;
pub mod error;
pub mod frame;
pub mod grid;
pub mod kernel;
pub mod numa;
pub mod planner;
pub mod rng;
pub mod rules;
pub mod simulation;
pub mod worker;

pub use cell::{Cell, Entity};
pub use error::{Error, Result};
pub use grid::{AllocTag, Grid};
pub use numa::{NumaNode, NumaTopology};
pub use planner::Planner;
pub use rules::Rules;
pub use simulation::{Simulation, SimulationStats};
