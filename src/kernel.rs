// src/kernel.rs
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The stripe update kernel: advances every live cell in one stripe by one
//! half-iteration.
//!
//! A cell is visited at most once per half-iteration, in row-major order.
//! Cells already written as a move's destination — whether by an earlier
//! cell in this same scan, or by a neighboring stripe in the other half of
//! this chronon — are skipped via the row masks in [`crate::grid`].

use rand_core::RngCore;

use crate::cell::{Cell, Entity};
use crate::constants::MAX_AGE;
use crate::grid::{Row, StripeCtx};
use crate::rules::Rules;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Up,
    Right,
    Down,
    Left,
}

const DIRECTIONS: [Direction; 4] = [Direction::Up, Direction::Right, Direction::Down, Direction::Left];

fn wrap_x(x: usize, width: usize, delta: isize) -> usize {
    (((x as isize + delta) % width as isize + width as isize) % width as isize) as usize
}

/// Reads the cell a move in `dir` from `(local_y, x)` would land on.
fn peek(ctx: &StripeCtx, width: usize, local_y: usize, x: usize, dir: Direction) -> Option<Cell> {
    let height = ctx.stripe().height();
    match dir {
        Direction::Left => Some(ctx.stripe().row(local_y).cell(wrap_x(x, width, -1))),
        Direction::Right => Some(ctx.stripe().row(local_y).cell(wrap_x(x, width, 1))),
        Direction::Up => {
            if local_y == 0 {
                ctx.prev_boundary().map(|r| r.cell(x))
            } else {
                Some(ctx.stripe().row(local_y - 1).cell(x))
            }
        }
        Direction::Down => {
            if local_y + 1 == height {
                ctx.next_boundary().map(|r| r.cell(x))
            } else {
                Some(ctx.stripe().row(local_y + 1).cell(x))
            }
        }
    }
}

/// Writes `cell` into the target of a move in `dir`, marking it as a
/// consumed destination so the scan never revisits it as a source.
fn commit(ctx: &mut StripeCtx, width: usize, local_y: usize, x: usize, dir: Direction, cell: Cell) {
    let height = ctx.stripe().height();
    match dir {
        Direction::Left => {
            let tx = wrap_x(x, width, -1);
            let row = ctx.stripe_mut().row_mut(local_y);
            row.set_cell(tx, cell);
            if x == 0 {
                row.set_update(tx, true);
            }
        }
        Direction::Right => {
            let tx = wrap_x(x, width, 1);
            let row = ctx.stripe_mut().row_mut(local_y);
            row.set_cell(tx, cell);
            if x != width - 1 {
                row.set_update(tx, true);
            }
        }
        Direction::Up => {
            if local_y == 0 {
                if let Some(row) = ctx.prev_boundary_mut() {
                    row.set_cell(x, cell);
                    row.set_bottom(x, true);
                }
            } else {
                let row = ctx.stripe_mut().row_mut(local_y - 1);
                row.set_cell(x, cell);
            }
        }
        Direction::Down => {
            if local_y + 1 == height {
                if let Some(row) = ctx.next_boundary_mut() {
                    row.set_cell(x, cell);
                    row.set_top(x, true);
                }
            } else {
                let row = ctx.stripe_mut().row_mut(local_y + 1);
                row.set_cell(x, cell);
                row.set_update(x, true);
            }
        }
    }
}

fn consume_boundary_marks(row: &mut Row, x: usize) -> bool {
    let consumed = row.top(x) || row.bottom(x);
    if consumed {
        row.set_top(x, false);
        row.set_bottom(x, false);
    }
    consumed
}

/// Advances every cell of `ctx`'s stripe by one half-iteration.
pub fn update_stripe<R: RngCore>(ctx: &mut StripeCtx, width: usize, rules: &Rules, rng: &mut R) {
    let height = ctx.stripe().height();
    for local_y in 0..height {
        for x in 0..width {
            let row = ctx.stripe_mut().row_mut(local_y);
            let boundary_hit = consume_boundary_marks(row, x);
            let update_hit = row.update(x);
            if update_hit {
                row.set_update(x, false);
            }
            if boundary_hit || update_hit {
                continue;
            }
            let cell = row.cell(x);
            if cell.is_water() {
                continue;
            }
            tick_and_move(ctx, width, local_y, x, cell, rules, rng);
        }
    }
}

fn candidate_directions(
    ctx: &StripeCtx,
    width: usize,
    local_y: usize,
    x: usize,
    entity: Entity,
) -> (Vec<Direction>, Vec<Direction>) {
    let mut eat = Vec::new();
    let mut free = Vec::new();
    for &dir in &DIRECTIONS {
        match peek(ctx, width, local_y, x, dir) {
            Some(neighbor) if neighbor.is_water() => free.push(dir),
            Some(neighbor) if entity == Entity::Shark && neighbor.entity() == Entity::Fish => {
                eat.push(dir)
            }
            _ => {}
        }
    }
    (eat, free)
}

fn choose<R: RngCore>(rng: &mut R, options: &[Direction]) -> Direction {
    debug_assert!(!options.is_empty());
    let idx = (rng.next_u32() as usize) % options.len();
    options[idx]
}

fn tick_and_move<R: RngCore>(
    ctx: &mut StripeCtx,
    width: usize,
    local_y: usize,
    x: usize,
    cell: Cell,
    rules: &Rules,
    rng: &mut R,
) {
    match cell.entity() {
        Entity::Water => unreachable!("water is filtered out before tick_and_move"),
        Entity::Fish => tick_fish(ctx, width, local_y, x, cell, rules, rng),
        Entity::Shark => tick_shark(ctx, width, local_y, x, cell, rules, rng),
    }
}

/// Fish: if already old enough to breed, hold age steady (the tentative age
/// is overwritten with 0 on both ends of a successful move); otherwise age
/// by one chronon, saturating at [`MAX_AGE`].
fn tick_fish<R: RngCore>(
    ctx: &mut StripeCtx,
    width: usize,
    local_y: usize,
    x: usize,
    cell: Cell,
    rules: &Rules,
    rng: &mut R,
) {
    let age_before = cell.age();
    let breeds = age_before >= rules.fish_breed_time();
    let ticked_age = if breeds { age_before } else { (age_before + 1).min(MAX_AGE) };

    let (_, free) = candidate_directions(ctx, width, local_y, x, Entity::Fish);
    if free.is_empty() {
        // No room to move: the tick still applies, but breeding needs a
        // free neighbor to split into, so it does not happen yet.
        ctx.stripe_mut()
            .row_mut(local_y)
            .set_cell(x, Cell::new(Entity::Fish, ticked_age, 0));
        return;
    }

    let dir = choose(rng, &free);
    if breeds {
        commit(ctx, width, local_y, x, dir, Cell::new(Entity::Fish, 0, 0));
        ctx.stripe_mut()
            .row_mut(local_y)
            .set_cell(x, Cell::new(Entity::Fish, 0, 0));
    } else {
        commit(ctx, width, local_y, x, dir, Cell::new(Entity::Fish, ticked_age, 0));
        ctx.stripe_mut().row_mut(local_y).set_cell(x, Cell::WATER);
    }
}

/// Shark: dies of starvation before anything else if it has already gone
/// `sharkStarveTime` chronons without eating. Otherwise ages and tallies a
/// tentative `last_ate`, exactly as [`tick_fish`] does for age.
fn tick_shark<R: RngCore>(
    ctx: &mut StripeCtx,
    width: usize,
    local_y: usize,
    x: usize,
    cell: Cell,
    rules: &Rules,
    rng: &mut R,
) {
    let last_ate_before = cell.last_ate();
    if last_ate_before >= rules.shark_starve_time() {
        ctx.stripe_mut().row_mut(local_y).set_cell(x, Cell::WATER);
        return;
    }
    let ticked_last_ate = (last_ate_before + 1).min(crate::constants::MAX_LAST_ATE);

    let age_before = cell.age();
    let breeds = age_before >= rules.shark_breed_time();
    let ticked_age = if breeds { age_before } else { (age_before + 1).min(MAX_AGE) };

    let (eat, free) = candidate_directions(ctx, width, local_y, x, Entity::Shark);
    let (dir, eating) = if !eat.is_empty() {
        (choose(rng, &eat), true)
    } else if !free.is_empty() {
        (choose(rng, &free), false)
    } else {
        ctx.stripe_mut()
            .row_mut(local_y)
            .set_cell(x, Cell::new(Entity::Shark, ticked_age, ticked_last_ate));
        return;
    };

    let moved_last_ate = if eating { 0 } else { ticked_last_ate };
    if breeds {
        commit(ctx, width, local_y, x, dir, Cell::new(Entity::Shark, 0, moved_last_ate));
        ctx.stripe_mut()
            .row_mut(local_y)
            .set_cell(x, Cell::new(Entity::Shark, 0, moved_last_ate));
    } else {
        commit(
            ctx,
            width,
            local_y,
            x,
            dir,
            Cell::new(Entity::Shark, ticked_age, moved_last_ate),
        );
        ctx.stripe_mut().row_mut(local_y).set_cell(x, Cell::WATER);
    }
}
