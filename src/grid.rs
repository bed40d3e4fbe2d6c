// src/grid.rs
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Toroidal grid storage, partitioned into horizontal stripes.
//!
//! A stripe is the unit of parallel work: each worker owns exactly
//! [`crate::constants::STRIPES_PER_WORKER`] stripes, and a chronon advances
//! in two half-iterations (even-parity stripes, then odd-parity stripes) so
//! no two workers ever touch the same row concurrently. Stripe boundaries
//! never move once a [`Grid`] is built.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::cell::{Cell, Entity};
use crate::constants::STRIPES_PER_WORKER;
use crate::error::{Error, Result};
use crate::planner::Planner;
use crate::rules::Rules;

/// Where a new stripe's backing storage should be allocated.
///
/// `PerNumaNode` is a placement hint, not an enforcement mechanism: the
/// actual NUMA affinity of a stripe's pages comes from first-touch, i.e.
/// from the pinned worker thread that initializes the stripe during
/// [`Grid::randomize`], not from this allocation call itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocTag {
    Default,
    PerNumaNode(usize),
    Mock,
}

/// One row's cells plus its destination-tracking bitmasks.
#[derive(Debug, Clone)]
pub struct Row {
    cells: Vec<Cell>,
    /// Set once a cell in this row has been written to as a move's
    /// destination during the current half-iteration.
    update: Vec<bool>,
    /// Set when the stripe above wrote into this row's top border as a
    /// destination, so the next half-iteration's scan does not reuse it.
    top: Vec<bool>,
    /// Same as `top`, for the stripe below.
    bottom: Vec<bool>,
}

impl Row {
    fn new(width: usize) -> Self {
        Row {
            cells: vec![Cell::WATER; width],
            update: vec![false; width],
            top: vec![false; width],
            bottom: vec![false; width],
        }
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn cells_mut(&mut self) -> &mut [Cell] {
        &mut self.cells
    }

    pub fn cell(&self, x: usize) -> Cell {
        self.cells[x]
    }

    pub fn set_cell(&mut self, x: usize, cell: Cell) {
        self.cells[x] = cell;
    }

    pub fn update(&self, x: usize) -> bool {
        self.update[x]
    }

    pub fn set_update(&mut self, x: usize, value: bool) {
        self.update[x] = value;
    }

    pub fn top(&self, x: usize) -> bool {
        self.top[x]
    }

    pub fn set_top(&mut self, x: usize, value: bool) {
        self.top[x] = value;
    }

    pub fn bottom(&self, x: usize) -> bool {
        self.bottom[x]
    }

    pub fn set_bottom(&mut self, x: usize, value: bool) {
        self.bottom[x] = value;
    }
}

/// A contiguous band of rows, the unit a single worker task processes.
#[derive(Debug, Clone)]
pub struct Stripe {
    numa_index: usize,
    stripe_index: usize,
    start_row: usize,
    rows: Vec<Row>,
}

impl Stripe {
    fn allocate(numa_index: usize, stripe_index: usize, start_row: usize, height: usize, width: usize, _tag: AllocTag) -> Self {
        Stripe {
            numa_index,
            stripe_index,
            start_row,
            rows: (0..height).map(|_| Row::new(width)).collect(),
        }
    }

    pub fn numa_index(&self) -> usize {
        self.numa_index
    }

    pub fn stripe_index(&self) -> usize {
        self.stripe_index
    }

    pub fn start_row(&self) -> usize {
        self.start_row
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn row(&self, local_y: usize) -> &Row {
        &self.rows[local_y]
    }

    pub fn row_mut(&mut self, local_y: usize) -> &mut Row {
        &mut self.rows[local_y]
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Whether `stripe_index` belongs to the set processed in the first
    /// half-iteration of a chronon.
    pub fn is_even_parity(&self) -> bool {
        self.stripe_index % 2 == 0
    }
}

/// The full toroidal ocean: width, height and the ordered stripes covering
/// every row exactly once.
#[derive(Debug, Clone)]
pub struct Grid {
    width: usize,
    height: usize,
    stripes: Vec<Stripe>,
    row_to_stripe: Vec<usize>,
}

impl Grid {
    /// Builds an empty (all-water) grid laid out for `plan`'s worker count.
    ///
    /// Fails if `height` cannot hold at least two rows per stripe for every
    /// worker ([`crate::constants::STRIPES_PER_WORKER`] stripes each).
    pub fn new(rules: &Rules, plan: &Planner) -> Result<Self> {
        Self::with_alloc(rules, plan, AllocTag::Default)
    }

    pub fn with_alloc(rules: &Rules, plan: &Planner, default_tag: AllocTag) -> Result<Self> {
        let width = rules.width() as usize;
        let height = rules.height() as usize;
        let worker_count = plan.cpu_count().max(1);
        let stripe_count = worker_count * STRIPES_PER_WORKER;

        if height < stripe_count * 2 {
            return Err(Error::InvalidRules(format!(
                "height {height} too small for {worker_count} workers \
                 (need at least {} rows)",
                stripe_count * 2
            )));
        }

        let base_rows = height / stripe_count;
        let extra = height % stripe_count;

        let mut stripes = Vec::with_capacity(stripe_count);
        let mut row_to_stripe = Vec::with_capacity(height);
        let mut start_row = 0usize;
        let mut stripe_index = 0usize;

        for (numa_slot, &numa_id) in plan.numa_list().iter().enumerate() {
            let cpus = plan.cpu_list_per_numa(numa_id);
            let stripes_here = cpus.len() * STRIPES_PER_WORKER;
            for local in 0..stripes_here {
                let rows_here = base_rows + usize::from(stripe_index < extra);
                let tag = if matches!(default_tag, AllocTag::Mock) {
                    AllocTag::Mock
                } else {
                    AllocTag::PerNumaNode(numa_id)
                };
                let stripe = Stripe::allocate(numa_slot, stripe_index, start_row, rows_here, width, tag);
                row_to_stripe.extend(std::iter::repeat(stripe_index).take(rows_here));
                stripes.push(stripe);
                start_row += rows_here;
                stripe_index += 1;
                let _ = local;
            }
        }

        debug_assert_eq!(stripes.len(), stripe_count);
        debug_assert_eq!(row_to_stripe.len(), height);

        Ok(Grid {
            width,
            height,
            stripes,
            row_to_stripe,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn stripe_count(&self) -> usize {
        self.stripes.len()
    }

    pub fn stripe(&self, index: usize) -> &Stripe {
        &self.stripes[index]
    }

    pub fn stripe_mut(&mut self, index: usize) -> &mut Stripe {
        &mut self.stripes[index]
    }

    pub fn stripes(&self) -> &[Stripe] {
        &self.stripes
    }

    fn locate(&self, y: usize) -> (usize, usize) {
        let stripe_index = self.row_to_stripe[y];
        let local_y = y - self.stripes[stripe_index].start_row;
        (stripe_index, local_y)
    }

    pub fn cell(&self, y: usize, x: usize) -> Cell {
        let (stripe_index, local_y) = self.locate(y);
        self.stripes[stripe_index].row(local_y).cell(x)
    }

    pub fn set_cell(&mut self, y: usize, x: usize, cell: Cell) {
        let (stripe_index, local_y) = self.locate(y);
        self.stripes[stripe_index].row_mut(local_y).set_cell(x, cell);
    }

    /// Toroidal row/column offset: wraps `coord + delta` into `[0, bound)`.
    pub fn wrap(coord: i64, delta: i64, bound: usize) -> usize {
        let bound = bound as i64;
        (((coord + delta) % bound + bound) % bound) as usize
    }

    /// Scatters `initial_fish` fish and `initial_shark` sharks uniformly at
    /// random over distinct tiles, leaving the rest as water. All ages and
    /// `last_ate` counters start at zero.
    pub fn randomize<R: Rng + ?Sized>(&mut self, rules: &Rules, rng: &mut R) {
        let total = (self.width * self.height) as u64;
        let fish = rules.initial_fish().min(total);
        let sharks = rules.initial_shark().min(total - fish);

        let mut indices: Vec<u64> = (0..total).collect();
        indices.shuffle(rng);

        for &idx in indices.iter().take(fish as usize) {
            let (y, x) = self.index_to_coord(idx);
            self.set_cell(y, x, Cell::new(Entity::Fish, 0, 0));
        }
        for &idx in indices.iter().skip(fish as usize).take(sharks as usize) {
            let (y, x) = self.index_to_coord(idx);
            self.set_cell(y, x, Cell::new(Entity::Shark, 0, 0));
        }
    }

    fn index_to_coord(&self, idx: u64) -> (usize, usize) {
        let y = (idx / self.width as u64) as usize;
        let x = (idx % self.width as u64) as usize;
        (y, x)
    }

    /// Counts entities by kind; used by tests and the CLI's `--benchmark`
    /// summary, never by the hot per-chronon path.
    pub fn census(&self) -> (u64, u64, u64) {
        let (mut water, mut fish, mut shark) = (0u64, 0u64, 0u64);
        for stripe in &self.stripes {
            for row in stripe.rows() {
                for &cell in row.cells() {
                    match cell.entity() {
                        Entity::Water => water += 1,
                        Entity::Fish => fish += 1,
                        Entity::Shark => shark += 1,
                    }
                }
            }
        }
        (water, fish, shark)
    }
}

/// Mutable access to one stripe plus the single boundary row it may write
/// into on each neighbor, handed to a worker for one half-iteration.
pub struct StripeCtx<'a> {
    stripe: &'a mut Stripe,
    prev_boundary: Option<&'a mut Row>,
    next_boundary: Option<&'a mut Row>,
}

impl<'a> StripeCtx<'a> {
    pub fn stripe(&self) -> &Stripe {
        self.stripe
    }

    pub fn stripe_mut(&mut self) -> &mut Stripe {
        self.stripe
    }

    /// Row reached by moving "up" out of this stripe's first row: the last
    /// row of the previous stripe, or `None` when there is only one stripe.
    pub fn prev_boundary_mut(&mut self) -> Option<&mut Row> {
        self.prev_boundary.as_deref_mut()
    }

    /// Row reached by moving "down" out of this stripe's last row.
    pub fn next_boundary_mut(&mut self) -> Option<&mut Row> {
        self.next_boundary.as_deref_mut()
    }

    pub fn prev_boundary(&self) -> Option<&Row> {
        self.prev_boundary.as_deref()
    }

    pub fn next_boundary(&self) -> Option<&Row> {
        self.next_boundary.as_deref()
    }
}

/// A [`StripeCtx`] reduced to raw pointers so it can be handed to a worker
/// thread that outlives the borrow checker's view of one `stripe_contexts`
/// call. The caller is responsible for the same invariants documented on
/// [`Grid::stripe_contexts_for_parity`], plus ensuring the originating
/// `Grid` outlives every [`RawStripeCtx::bind`] call — the simulation
/// driver's half-iteration barrier (`Worker::wait_idle`) provides this.
pub struct RawStripeCtx {
    stripe: *mut Stripe,
    prev_boundary: Option<*mut Row>,
    next_boundary: Option<*mut Row>,
}

// SAFETY: a `RawStripeCtx` is only ever dereferenced once, on the thread
// it is sent to, by `bind`, and the pointed-to memory is not touched by
// any other thread for the lifetime of that dereference (see the struct
// doc and `Grid::stripe_contexts_for_parity`).
unsafe impl Send for RawStripeCtx {}

impl RawStripeCtx {
    /// # Safety
    /// See [`RawStripeCtx`].
    pub unsafe fn bind<'a>(self) -> StripeCtx<'a> {
        StripeCtx {
            stripe: unsafe { &mut *self.stripe },
            prev_boundary: self.prev_boundary.map(|p| unsafe { &mut *p }),
            next_boundary: self.next_boundary.map(|p| unsafe { &mut *p }),
        }
    }
}

impl Grid {
    /// Builds mutable per-stripe contexts for every stripe of the given
    /// parity, each with raw-pointer access to the single boundary row it
    /// may write into on its neighbors.
    ///
    /// # Safety
    /// Every stripe has at least 2 rows (enforced in [`Grid::with_alloc`]),
    /// so a stripe's first and last row are always distinct. A stripe's
    /// immediate neighbors always have the opposite parity, so within one
    /// call only a neighbor's single boundary row is reached through
    /// `prev_boundary`/`next_boundary` — never its own interior, which
    /// belongs to a context that is only produced by the *other* parity's
    /// call. Two contexts produced by this same call never alias: adjacent
    /// same-parity stripes are at least 2 apart, and their shared neighbor
    /// contributes its first row to one context and its last row to the
    /// other, which are distinct elements.
    pub fn stripe_contexts_for_parity(&mut self, even: bool) -> Vec<StripeCtx<'_>> {
        let count = self.stripes.len();
        let base: *mut Stripe = self.stripes.as_mut_ptr();
        let mut contexts = Vec::new();
        for i in 0..count {
            if (i % 2 == 0) != even {
                continue;
            }
            // SAFETY: see method doc.
            let own = unsafe { &mut *base.add(i) };
            let prev_index = if i == 0 { count - 1 } else { i - 1 };
            let next_index = if i + 1 == count { 0 } else { i + 1 };
            let prev_boundary = if count > 1 {
                let prev_stripe = unsafe { &mut *base.add(prev_index) };
                let last = prev_stripe.rows.len() - 1;
                Some(unsafe { &mut *prev_stripe.rows.as_mut_ptr().add(last) })
            } else {
                None
            };
            let next_boundary = if count > 1 {
                let next_stripe = unsafe { &mut *base.add(next_index) };
                Some(unsafe { &mut *next_stripe.rows.as_mut_ptr() })
            } else {
                None
            };
            contexts.push(StripeCtx {
                stripe: own,
                prev_boundary,
                next_boundary,
            });
        }
        contexts
    }

    /// Raw-pointer counterpart of [`Grid::stripe_contexts_for_parity`], in
    /// the same stripe-index order, for dispatching each stripe to a
    /// worker thread. See [`RawStripeCtx`] for the safety contract.
    pub fn raw_stripe_contexts_for_parity(&mut self, even: bool) -> Vec<RawStripeCtx> {
        let count = self.stripes.len();
        let base: *mut Stripe = self.stripes.as_mut_ptr();
        let mut contexts = Vec::new();
        for i in 0..count {
            if (i % 2 == 0) != even {
                continue;
            }
            let prev_index = if i == 0 { count - 1 } else { i - 1 };
            let next_index = if i + 1 == count { 0 } else { i + 1 };
            // SAFETY: see `stripe_contexts_for_parity`; identical indexing.
            let prev_boundary = if count > 1 {
                let prev_stripe = unsafe { &mut *base.add(prev_index) };
                let last = prev_stripe.rows.len() - 1;
                Some(unsafe { prev_stripe.rows.as_mut_ptr().add(last) })
            } else {
                None
            };
            let next_boundary = if count > 1 {
                let next_stripe = unsafe { &mut *base.add(next_index) };
                Some(next_stripe.rows.as_mut_ptr())
            } else {
                None
            };
            contexts.push(RawStripeCtx {
                stripe: unsafe { base.add(i) },
                prev_boundary,
                next_boundary,
            });
        }
        contexts
    }
}
