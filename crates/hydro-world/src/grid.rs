//! 2D bounded grid of water cells.

use hydro_core::{Cell, Direction, Error, GridStats, Position, Result, WorldConfig};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use smallvec::SmallVec;

/// A fixed-size rectangular grid.
///
/// Dimensions are set at construction and never change. Positions outside
/// `[0, width) x [0, height)` are never resolved to a cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl Grid {
    /// Create an all-empty grid. Both dimensions must be non-zero.
    pub fn new(width: usize, height: usize) -> Result<Self> {
        if width == 0 || height == 0 || width > i32::MAX as usize || height > i32::MAX as usize {
            return Err(Error::InvalidDimensions { width, height });
        }
        let size = width
            .checked_mul(height)
            .ok_or(Error::InvalidDimensions { width, height })?;
        Ok(Self {
            width,
            height,
            cells: vec![Cell::empty(); size],
        })
    }

    /// Create a grid from world configuration, scattering walls and water pools
    pub fn from_config(config: &WorldConfig, rng: &mut ChaCha8Rng) -> Result<Self> {
        config.validate()?;
        let mut grid = Self::new(config.width, config.height)?;

        for cell in &mut grid.cells {
            let roll = rng.gen::<f32>();

            if roll < config.wall_density {
                *cell = Cell::wall();
            } else if roll < config.wall_density + config.water_density {
                *cell = Cell::water(config.water_level);
            }
        }

        Ok(grid)
    }

    /// Build a single-row grid from a list of heads. Handy for scenarios and tests.
    pub fn from_row(heads: &[f64]) -> Result<Self> {
        let mut grid = Self::new(heads.len(), 1)?;
        for (cell, &head) in grid.cells.iter_mut().zip(heads) {
            cell.head = head;
        }
        Ok(grid)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Total number of cells
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Always `false`; construction rejects empty grids.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn contains(&self, pos: Position) -> bool {
        pos.x >= 0 && pos.y >= 0 && (pos.x as usize) < self.width && (pos.y as usize) < self.height
    }

    /// Flat index of `pos`, `None` when out of bounds
    pub fn index_of(&self, pos: Position) -> Option<usize> {
        self.contains(pos)
            .then(|| pos.y as usize * self.width + pos.x as usize)
    }

    /// Get position from index
    pub fn index_to_pos(&self, index: usize) -> Position {
        let x = (index % self.width) as i32;
        let y = (index / self.width) as i32;
        Position::new(x, y)
    }

    pub fn get(&self, pos: Position) -> Option<&Cell> {
        self.index_of(pos).map(|index| &self.cells[index])
    }

    pub fn get_mut(&mut self, pos: Position) -> Option<&mut Cell> {
        let index = self.index_of(pos)?;
        self.cells.get_mut(index)
    }

    /// Like [`Grid::get_mut`], but reports the offending position
    pub fn try_get_mut(&mut self, pos: Position) -> Result<&mut Cell> {
        let (width, height) = (self.width, self.height);
        self.get_mut(pos).ok_or(Error::OutOfBounds {
            x: pos.x,
            y: pos.y,
            width,
            height,
        })
    }

    /// Set cell at position
    pub fn set(&mut self, pos: Position, cell: Cell) -> Result<()> {
        *self.try_get_mut(pos)? = cell;
        Ok(())
    }

    /// In bounds and not a wall
    pub fn is_fillable(&self, pos: Position) -> bool {
        self.get(pos).is_some_and(|cell| !cell.is_wall)
    }

    /// Flat index of `pos` if it can receive water
    pub(crate) fn fillable_index(&self, pos: Position) -> Option<usize> {
        self.index_of(pos).filter(|&index| !self.cells[index].is_wall)
    }

    /// Fillable neighbours of `pos` with their flat indices, in west, east,
    /// north, south order.
    pub(crate) fn fillable_links(&self, pos: Position) -> SmallVec<[(Direction, usize); 4]> {
        Direction::all()
            .into_iter()
            .filter_map(|dir| self.fillable_index(pos.step(dir)).map(|index| (dir, index)))
            .collect()
    }

    /// Directions from `pos` towards its fillable neighbours
    pub fn fillable_directions(&self, pos: Position) -> SmallVec<[Direction; 4]> {
        self.fillable_links(pos).into_iter().map(|(dir, _)| dir).collect()
    }

    /// Positions of the fillable neighbours of `pos`
    pub fn fillable_neighbours(&self, pos: Position) -> SmallVec<[Position; 4]> {
        self.fillable_links(pos)
            .into_iter()
            .map(|(_, index)| self.index_to_pos(index))
            .collect()
    }

    /// Iterator over all positions
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.cells.len()).map(move |i| self.index_to_pos(i))
    }

    /// Iterator over all cells with positions
    pub fn iter(&self) -> impl Iterator<Item = (Position, &Cell)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, cell)| (self.index_to_pos(i), cell))
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub(crate) fn cells_mut(&mut self) -> &mut [Cell] {
        &mut self.cells
    }

    pub fn stats(&self) -> GridStats {
        GridStats::from_cells(&self.cells)
    }
}
