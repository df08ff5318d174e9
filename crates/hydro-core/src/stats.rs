//! Aggregate statistics over a grid's cells.

use crate::Cell;
use serde::{Deserialize, Serialize};

/// Summary of the water held in a grid
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GridStats {
    /// Sum of head over all non-wall cells
    pub total_head: f64,
    /// Largest head among non-wall cells
    pub max_head: f64,
    /// Smallest head among non-wall cells (negative values flag undershoot)
    pub min_head: f64,
    /// Non-wall cells with positive head
    pub wet_cells: usize,
    /// Number of wall cells
    pub wall_cells: usize,
    /// Fastest velocity magnitude among non-wall cells
    pub max_speed: f64,
}

impl GridStats {
    pub fn from_cells<'a>(cells: impl IntoIterator<Item = &'a Cell>) -> Self {
        let mut stats = Self::default();
        let mut seen_water = false;

        for cell in cells {
            if cell.is_wall {
                stats.wall_cells += 1;
                continue;
            }

            stats.total_head += cell.head;
            if cell.head > 0.0 {
                stats.wet_cells += 1;
            }
            if seen_water {
                stats.max_head = stats.max_head.max(cell.head);
                stats.min_head = stats.min_head.min(cell.head);
            } else {
                stats.max_head = cell.head;
                stats.min_head = cell.head;
                seen_water = true;
            }
            stats.max_speed = stats.max_speed.max(cell.speed());
        }

        stats
    }

    /// True if every non-wall value is finite
    pub fn is_finite(&self) -> bool {
        self.total_head.is_finite()
            && self.max_head.is_finite()
            && self.min_head.is_finite()
            && self.max_speed.is_finite()
    }
}
