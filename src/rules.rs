// src/rules.rs
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Validated parameters for one simulation run.

use crate::constants::{MAX_AGE, MAX_LAST_ATE};
use crate::error::{Error, Result};

/// Breed/starve times and population sizes for one run. Constructed once
/// and never mutated (spec.md's "no dynamic rule changes mid-run").
#[derive(Debug, Clone, Copy)]
pub struct Rules {
    width: u32,
    height: u32,
    initial_fish: u64,
    initial_shark: u64,
    fish_breed_time: u32,
    shark_breed_time: u32,
    shark_starve_time: u32,
}

impl Rules {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        width: u32,
        height: u32,
        initial_fish: u64,
        initial_shark: u64,
        fish_breed_time: u32,
        shark_breed_time: u32,
        shark_starve_time: u32,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidRules(
                "width and height must not be zero".into(),
            ));
        }

        (width as u64)
            .checked_mul(height as u64)
            .ok_or_else(|| Error::InvalidRules("width*height overflows".into()))?;

        if fish_breed_time > MAX_AGE
            || shark_breed_time > MAX_AGE
            || shark_starve_time > MAX_LAST_ATE
        {
            return Err(Error::InvalidRules(
                "fish breed time, shark breed time or shark starve time exceed 14".into(),
            ));
        }

        Ok(Rules {
            width,
            height,
            initial_fish,
            initial_shark,
            fish_breed_time,
            shark_breed_time,
            shark_starve_time,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }
    pub fn height(&self) -> u32 {
        self.height
    }
    pub fn initial_fish(&self) -> u64 {
        self.initial_fish
    }
    pub fn initial_shark(&self) -> u64 {
        self.initial_shark
    }
    pub fn fish_breed_time(&self) -> u32 {
        self.fish_breed_time
    }
    pub fn shark_breed_time(&self) -> u32 {
        self.shark_breed_time
    }
    pub fn shark_starve_time(&self) -> u32 {
        self.shark_starve_time
    }

    pub fn cell_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}
