//! Cell editing: painting walls and water into a grid.

use crate::grid::Grid;
use hydro_core::{EditorConfig, Position, Result};
use tracing::debug;

/// Toggle the wall flag of the cell at `pos`. Returns the new wall state.
///
/// A cell turned into a wall loses its head; a wall turned back into a cell
/// keeps whatever velocity it held before.
pub fn toggle_wall(grid: &mut Grid, pos: Position) -> Result<bool> {
    let cell = grid.try_get_mut(pos)?;
    if cell.is_wall {
        cell.is_wall = false;
    } else {
        cell.head = 0.0;
        cell.is_wall = true;
    }
    debug!(x = pos.x, y = pos.y, is_wall = cell.is_wall, "Wall toggled");
    Ok(cell.is_wall)
}

/// Pour or drain water at `pos`. Returns whether the cell now holds water.
///
/// Cells above `drain_threshold` are emptied; anything else (walls included)
/// becomes an open cell filled to `water_level`.
pub fn toggle_water(grid: &mut Grid, pos: Position, config: &EditorConfig) -> Result<bool> {
    let cell = grid.try_get_mut(pos)?;
    let filled = if cell.head > config.drain_threshold {
        cell.head = 0.0;
        false
    } else {
        cell.is_wall = false;
        cell.head = config.water_level;
        true
    };
    debug!(x = pos.x, y = pos.y, head = cell.head, "Water toggled");
    Ok(filled)
}

/// Maps screen coordinates onto grid cells for interactive editing
#[derive(Debug, Clone)]
pub struct CellEditor {
    config: EditorConfig,
}

impl CellEditor {
    pub fn new(config: EditorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Grid position under the pixel `(px, py)`
    pub fn cell_at(&self, px: i32, py: i32) -> Position {
        let size = self.config.cell_size as i32;
        Position::new(px.div_euclid(size), py.div_euclid(size))
    }

    /// Window size in pixels needed to show `grid`
    pub fn window_size(&self, grid: &Grid) -> (u32, u32) {
        let size = self.config.cell_size;
        (size * grid.width() as u32, size * grid.height() as u32)
    }

    pub fn toggle_wall_at(&self, grid: &mut Grid, px: i32, py: i32) -> Result<bool> {
        toggle_wall(grid, self.cell_at(px, py))
    }

    pub fn toggle_water_at(&self, grid: &mut Grid, px: i32, py: i32) -> Result<bool> {
        toggle_water(grid, self.cell_at(px, py), &self.config)
    }
}
