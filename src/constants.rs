// src/constants.rs
//
// SPDX-License-Identifier: MIT OR Apache-2.0

/// Maximum value a fish/shark `age` field may hold.
pub const MAX_AGE: u32 = 14;

/// Maximum value a shark's `last_ate` field may hold.
pub const MAX_LAST_ATE: u32 = 14;

/// Tap mask for the [`crate::rng::Lfsr`] engine.
pub const LFSR_TAP_MASK: u64 = 0xDEAD_BEEF;

/// Seed substituted whenever a caller requests seed `0`.
pub const LFSR_DEFAULT_SEED: u64 = 1337;

/// The stripe-per-NUMA-partition multiplier fixed by the parity algorithm.
///
/// Not a tuning parameter: halving it breaks the even/odd non-interference
/// argument in the stripe update kernel.
pub const STRIPES_PER_WORKER: usize = 2;

/// Default divisor for the initial fish population (`w*h/10`).
pub const DEFAULT_FISH_DIVISOR: u64 = 10;

/// Default divisor for the initial shark population (`w*h/30`).
pub const DEFAULT_SHARK_DIVISOR: u64 = 30;

/// Default number of chronons a fish must live before it can breed.
pub const DEFAULT_FISH_BREED_TIME: u32 = 3;

/// Default number of chronons a shark must live before it can breed.
pub const DEFAULT_SHARK_BREED_TIME: u32 = 10;

/// Default number of chronons a shark tolerates without eating.
pub const DEFAULT_SHARK_STARVE_TIME: u32 = 3;
