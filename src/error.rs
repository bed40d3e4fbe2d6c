// src/error.rs
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error kinds surfaced by the simulation engine's setup path.
//!
//! Everything here is a setup-stage failure (rules validation, planning,
//! grid allocation) or an I/O failure while writing frames. Per-chronon
//! compute errors are not represented: inputs are validated up front, and
//! a release build assumes the grid and rules invariants hold from then on
//! (see `kernel.rs`). A worker task panicking is deliberately *not* an
//! `Error` variant — the worker runtime swallows it (see `worker.rs`).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid rules: {0}")]
    InvalidRules(String),

    #[error("not enough CPUs: requested {requested}, available {available}")]
    NotEnoughCpus { requested: usize, available: usize },

    #[error("allocation failed: {0}")]
    AllocationFailed(String),

    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
