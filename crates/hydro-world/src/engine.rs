//! Step engine for advancing the height field.
//!
//! Every step reads the pre-step grid only. Exchanges between neighbours are
//! accumulated into a delta buffer and applied in one pass at the end, so the
//! order cells are visited in never changes the result.

use crate::clock::{Clock, MonotonicClock};
use crate::grid::Grid;
use hydro_core::{Direction, Position, Result, SimConfig};
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Pending change for one cell
#[derive(Debug, Clone, Copy, Default)]
struct Delta {
    head: f64,
    vx: f64,
    vy: f64,
}

#[derive(Debug, Clone, Copy)]
enum Axis {
    X,
    Y,
}

impl Axis {
    fn direction(self, velocity: f64) -> Option<Direction> {
        match self {
            Axis::X => Direction::along_x(velocity),
            Axis::Y => Direction::along_y(velocity),
        }
    }
}

impl Delta {
    fn velocity_mut(&mut self, axis: Axis) -> &mut f64 {
        match axis {
            Axis::X => &mut self.vx,
            Axis::Y => &mut self.vy,
        }
    }
}

/// Share of a cell's head that spreads diffusively rather than following its velocity.
///
/// 1 for still water, tending to 0 as speed dominates head. Callers must
/// ensure `head` and `v_squared` are not both zero.
pub fn head_fraction(head: f64, v_squared: f64) -> f64 {
    head.abs() / (head.abs() + v_squared.sqrt())
}

/// Share of the directed flow carried along the x axis.
///
/// Callers must ensure the velocity is non-zero.
pub fn vx_fraction(vx: f64, vy: f64) -> f64 {
    vx.abs() / (vx.abs() + vy.abs())
}

pub struct StepEngine<C: Clock = MonotonicClock> {
    config: SimConfig,
    clock: C,
    previous: Option<Duration>,
    deltas: Vec<Delta>,
    steps: u64,
}

impl StepEngine<MonotonicClock> {
    /// Engine timed by the real monotonic clock
    pub fn new(config: SimConfig) -> Result<Self> {
        Self::with_clock(config, MonotonicClock::new())
    }
}

impl<C: Clock> StepEngine<C> {
    pub fn with_clock(config: SimConfig, clock: C) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            clock,
            previous: None,
            deltas: Vec::new(),
            steps: 0,
        })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Number of steps that actually advanced the grid
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Whether a timing baseline has been recorded
    pub fn is_warmed_up(&self) -> bool {
        self.previous.is_some()
    }

    /// Forget the timing baseline. The next [`StepEngine::step`] only records time.
    pub fn reset(&mut self) {
        debug!(steps = self.steps, "Step engine timing reset");
        self.previous = None;
    }

    /// Advance the grid by the wall-clock time elapsed since the previous call.
    ///
    /// The first call after construction or [`StepEngine::reset`] records the
    /// baseline and leaves the grid untouched. `dt` is not clamped, so a long
    /// stall between calls produces a correspondingly large step.
    pub fn step(&mut self, grid: &mut Grid) {
        let now = self.clock.now();
        let Some(previous) = self.previous.replace(now) else {
            debug!("Timing baseline recorded");
            return;
        };

        let elapsed = now.saturating_sub(previous).as_secs_f64();
        if elapsed > self.config.stall_warning_secs {
            warn!(
                elapsed_secs = elapsed,
                threshold_secs = self.config.stall_warning_secs,
                "Long gap between steps, applying unclamped dt"
            );
        }

        self.advance(grid, elapsed * self.config.time_scale);
    }

    /// Apply one exchange pass scaled by an explicit, already-scaled `dt`.
    pub fn advance(&mut self, grid: &mut Grid, dt: f64) {
        self.deltas.clear();
        self.deltas.resize(grid.len(), Delta::default());

        for index in 0..grid.len() {
            self.exchange(grid, index);
        }

        for (cell, delta) in grid.cells_mut().iter_mut().zip(&self.deltas) {
            if cell.is_wall {
                continue;
            }
            cell.head += delta.head * dt;
            cell.vx += delta.vx * dt;
            cell.vy += delta.vy * dt;
        }

        self.steps += 1;
        trace!(step = self.steps, dt, "Grid advanced");
    }

    /// Accumulate the outflow of one cell into the delta buffer
    fn exchange(&mut self, grid: &Grid, index: usize) {
        let cell = grid.cells()[index];
        if cell.is_wall || cell.head <= self.config.min_head {
            return;
        }

        let pos = grid.index_to_pos(index);
        let links = grid.fillable_links(pos);
        if links.is_empty() {
            return;
        }

        let v_squared = cell.vx * cell.vx + cell.vy * cell.vy;
        let head_fraction = head_fraction(cell.head, v_squared);
        let amount_lost = cell.head;

        // Diffusion: an even split to every fillable neighbour, pushing it
        // along the direction the water moved.
        let each = head_fraction * amount_lost / links.len() as f64;
        for (dir, target) in links {
            let (ux, uy) = dir.unit_vector();
            self.deltas[index].head -= each;
            let delta = &mut self.deltas[target];
            delta.head += each;
            delta.vx += each * ux;
            delta.vy += each * uy;
        }

        if v_squared > 0.0 {
            let v_amount = amount_lost * (1.0 - head_fraction);
            let vx_fraction = vx_fraction(cell.vx, cell.vy);
            self.advect(grid, index, pos, Axis::X, v_amount * vx_fraction, cell.vx);
            self.advect(grid, index, pos, Axis::Y, v_amount * (1.0 - vx_fraction), cell.vy);
        }
    }

    /// Move `share` of head and the whole `velocity` component one cell along
    /// `axis`, or bounce the component if that cell cannot take water.
    fn advect(
        &mut self,
        grid: &Grid,
        source: usize,
        pos: Position,
        axis: Axis,
        share: f64,
        velocity: f64,
    ) {
        let Some(dir) = axis.direction(velocity) else {
            return;
        };

        match grid.fillable_index(pos.step(dir)) {
            Some(target) => {
                self.deltas[source].head -= share;
                self.deltas[target].head += share;
                *self.deltas[source].velocity_mut(axis) -= velocity;
                *self.deltas[target].velocity_mut(axis) += velocity;
            }
            None => {
                *self.deltas[source].velocity_mut(axis) -= 2.0 * velocity;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use hydro_core::Cell;
    use proptest::prelude::*;

    const EPS: f64 = 1e-9;

    fn engine() -> StepEngine<ManualClock> {
        StepEngine::with_clock(SimConfig::default(), ManualClock::new()).unwrap()
    }

    fn heads(grid: &Grid) -> Vec<f64> {
        grid.cells().iter().map(|cell| cell.head).collect()
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-6,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_first_step_only_records_time() {
        let mut engine = engine();
        let mut grid = Grid::from_row(&[100.0, 0.0, 0.0]).unwrap();
        let before = grid.clone();

        engine.clock().advance_secs(5.0);
        engine.step(&mut grid);

        assert_eq!(grid, before);
        assert!(engine.is_warmed_up());
        assert_eq!(engine.steps(), 0);
    }

    #[test]
    fn test_step_scales_elapsed_time() {
        let config = SimConfig {
            time_scale: 10.0,
            ..Default::default()
        };
        let clock = ManualClock::new();
        let mut engine = StepEngine::with_clock(config, clock.clone()).unwrap();
        let mut grid = Grid::from_row(&[100.0, 0.0, 0.0]).unwrap();

        engine.step(&mut grid);
        clock.advance(Duration::from_millis(100));
        engine.step(&mut grid);

        // 0.1 s at 10x is a unit step
        let h = heads(&grid);
        assert_close(h[0], 0.0);
        assert_close(h[1], 100.0);
        assert_close(h[2], 0.0);
        assert_eq!(engine.steps(), 1);
    }

    #[test]
    fn test_reset_rearms_warm_up() {
        let clock = ManualClock::new();
        let mut engine = StepEngine::with_clock(SimConfig::default(), clock.clone()).unwrap();
        let mut grid = Grid::from_row(&[100.0, 0.0]).unwrap();

        engine.step(&mut grid);
        engine.reset();
        assert!(!engine.is_warmed_up());

        clock.advance_secs(60.0);
        let before = grid.clone();
        engine.step(&mut grid);
        assert_eq!(grid, before);
    }

    #[test]
    fn test_no_elapsed_time_is_no_change() {
        let mut engine = engine();
        let mut grid = Grid::from_row(&[100.0, 40.0, 0.0]).unwrap();
        let before = grid.clone();

        engine.step(&mut grid);
        engine.step(&mut grid);
        assert_eq!(grid, before);
    }

    #[test]
    fn test_single_neighbour_diffusion() {
        let mut grid = Grid::from_row(&[100.0, 0.0, 0.0]).unwrap();
        engine().advance(&mut grid, 1.0);

        let h = heads(&grid);
        assert_close(h[0], 0.0);
        assert_close(h[1], 100.0);
        assert_close(h[2], 0.0);

        // diffusing water carries momentum in the direction it moved
        assert_close(grid.cells()[1].vx, 100.0);
        assert_close(grid.cells()[1].vy, 0.0);
    }

    #[test]
    fn test_even_split_between_two_neighbours() {
        let mut grid = Grid::from_row(&[100.0, 100.0, 100.0]).unwrap();
        engine().advance(&mut grid, 1.0);

        // Middle sends 50 each way, ends receive from and send 100 to the middle.
        let h = heads(&grid);
        assert_close(h[0], 50.0);
        assert_close(h[1], 200.0);
        assert_close(h[2], 50.0);

        let vx: Vec<f64> = grid.cells().iter().map(|c| c.vx).collect();
        assert_close(vx[0], -50.0);
        assert_close(vx[1], 0.0);
        assert_close(vx[2], 50.0);
    }

    #[test]
    fn test_dt_scales_the_update() {
        let mut grid = Grid::from_row(&[100.0, 0.0]).unwrap();
        engine().advance(&mut grid, 0.25);

        let h = heads(&grid);
        assert_close(h[0], 75.0);
        assert_close(h[1], 25.0);
    }

    #[test]
    fn test_directed_flow_carries_velocity() {
        let mut grid = Grid::from_row(&[0.0, 100.0, 0.0]).unwrap();
        grid.set(Position::new(1, 0), Cell::water(100.0).with_velocity(10.0, 0.0)).unwrap();
        engine().advance(&mut grid, 1.0);

        let hf = 100.0 / 110.0;
        let each = hf * 100.0 / 2.0;
        let directed = 100.0 * (1.0 - hf);

        let h = heads(&grid);
        assert_close(h[0], each);
        assert_close(h[1], 0.0);
        assert_close(h[2], each + directed);

        let cells = grid.cells();
        assert_close(cells[0].vx, -each);
        assert_close(cells[1].vx, 0.0);
        assert_close(cells[2].vx, each + 10.0);
    }

    #[test]
    fn test_reflection_at_boundary() {
        let mut grid = Grid::new(2, 1).unwrap();
        grid.set(Position::new(0, 0), Cell::water(100.0).with_velocity(-10.0, 0.0)).unwrap();
        engine().advance(&mut grid, 1.0);

        let source = grid.get(Position::new(0, 0)).unwrap();
        assert_close(source.vx, 10.0);

        // Only the diffusive share reached the neighbour; the directed share stayed put.
        let hf = 100.0 / 110.0;
        assert_close(source.head, 100.0 * (1.0 - hf));
        assert_close(grid.stats().total_head, 100.0);
    }

    #[test]
    fn test_reflection_at_wall() {
        let mut grid = Grid::new(3, 1).unwrap();
        grid.set(Position::new(1, 0), Cell::water(100.0).with_velocity(10.0, 0.0)).unwrap();
        grid.set(Position::new(2, 0), Cell::wall()).unwrap();
        engine().advance(&mut grid, 1.0);

        assert_close(grid.get(Position::new(1, 0)).unwrap().vx, -10.0);
        assert_eq!(*grid.get(Position::new(2, 0)).unwrap(), Cell::wall());
        assert_close(grid.stats().total_head, 100.0);
    }

    #[test]
    fn test_reflection_on_y_axis() {
        let mut grid = Grid::new(1, 2).unwrap();
        grid.set(Position::new(0, 0), Cell::water(100.0).with_velocity(0.0, -4.0)).unwrap();
        engine().advance(&mut grid, 1.0);

        let source = grid.get(Position::new(0, 0)).unwrap();
        assert_close(source.vy, 4.0);
        assert_close(source.vx, 0.0);
    }

    #[test]
    fn test_diagonal_velocity_splits_by_axis() {
        let mut grid = Grid::new(3, 3).unwrap();
        let center = Position::new(1, 1);
        grid.set(center, Cell::water(100.0).with_velocity(3.0, 4.0)).unwrap();
        engine().advance(&mut grid, 1.0);

        let hf = 100.0 / 105.0;
        let each = hf * 100.0 / 4.0;
        let directed = 100.0 * (1.0 - hf);

        let east = grid.get(Position::new(2, 1)).unwrap();
        let south = grid.get(Position::new(1, 2)).unwrap();
        assert_close(east.head, each + directed * 3.0 / 7.0);
        assert_close(south.head, each + directed * 4.0 / 7.0);
        assert_close(east.vx, each + 3.0);
        assert_close(south.vy, each + 4.0);

        let source = grid.get(center).unwrap();
        assert_close(source.head, 0.0);
        assert_close(source.vx, 0.0);
        assert_close(source.vy, 0.0);
    }

    #[test]
    fn test_threshold_head_does_not_flow() {
        let mut grid = Grid::from_row(&[5.0, 0.0]).unwrap();
        let before = grid.clone();
        engine().advance(&mut grid, 1.0);
        assert_eq!(grid, before);
    }

    #[test]
    fn test_isolated_cell_is_untouched() {
        let mut grid = Grid::new(3, 3).unwrap();
        for pos in grid.positions().collect::<Vec<_>>() {
            grid.set(pos, Cell::wall()).unwrap();
        }
        let center = Position::new(1, 1);
        grid.set(center, Cell::water(100.0).with_velocity(7.0, -3.0)).unwrap();
        let before = grid.clone();

        let mut engine = engine();
        for _ in 0..5 {
            engine.advance(&mut grid, 1.0);
        }
        assert_eq!(grid, before);
    }

    fn arb_grid() -> impl Strategy<Value = Grid> {
        (1usize..6, 1usize..6).prop_flat_map(|(w, h)| {
            let cell = (0.0f64..200.0, -20.0f64..20.0, -20.0f64..20.0, prop::bool::weighted(0.25))
                .prop_map(|(head, vx, vy, is_wall)| Cell { head, vx, vy, is_wall });
            prop::collection::vec(cell, w * h).prop_map(move |cells| {
                let mut grid = Grid::new(w, h).unwrap();
                grid.cells_mut().copy_from_slice(&cells);
                grid
            })
        })
    }

    proptest! {
        #[test]
        fn walls_never_change(grid in arb_grid(), dt in 0.0f64..2.0) {
            let mut after = grid.clone();
            engine().advance(&mut after, dt);

            for (before, after) in grid.cells().iter().zip(after.cells()) {
                if before.is_wall {
                    prop_assert_eq!(before, after);
                }
            }
        }

        #[test]
        fn walls_are_never_neighbours(grid in arb_grid()) {
            for pos in grid.positions() {
                for neighbour in grid.fillable_neighbours(pos) {
                    prop_assert!(!grid.get(neighbour).unwrap().is_wall);
                    prop_assert_eq!(pos.manhattan_distance(&neighbour), 1);
                }
            }
        }

        #[test]
        fn still_empty_grid_stays_empty(w in 1usize..8, h in 1usize..8, steps in 1usize..10) {
            let mut grid = Grid::new(w, h).unwrap();
            let mut engine = engine();
            for _ in 0..steps {
                engine.advance(&mut grid, 1.0);
            }
            prop_assert!(grid.cells().iter().all(|cell| *cell == Cell::empty()));
        }

        #[test]
        fn total_head_is_conserved(grid in arb_grid(), dt in 0.0f64..2.0) {
            let before = grid.stats().total_head;
            let mut after = grid.clone();
            engine().advance(&mut after, dt);
            let drift = (after.stats().total_head - before).abs();
            prop_assert!(drift < 1e-6 * before.max(1.0));
        }

        #[test]
        fn fractions_stay_in_unit_range(
            head in 5.0f64..1e6,
            vx in -1e3f64..1e3,
            vy in -1e3f64..1e3,
        ) {
            let hf = head_fraction(head, vx * vx + vy * vy);
            prop_assert!((0.0..=1.0).contains(&hf));

            if vx != 0.0 || vy != 0.0 {
                let xf = vx_fraction(vx, vy);
                prop_assert!((0.0..=1.0).contains(&xf));
            }
        }
    }

    #[test]
    fn test_fraction_limits() {
        assert_eq!(head_fraction(100.0, 0.0), 1.0);
        assert!(head_fraction(1.0, 1e12) < 1e-5);
        assert_eq!(vx_fraction(2.0, 0.0), 1.0);
        assert_eq!(vx_fraction(0.0, -2.0), 0.0);
        assert!((vx_fraction(-3.0, 3.0) - 0.5).abs() < EPS);
    }
}
