//! Core type definitions for the simulation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// 2D position in the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn add(&self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// The adjacent position one step in `direction`
    pub fn step(&self, direction: Direction) -> Self {
        let (dx, dy) = direction.to_delta();
        self.add(dx, dy)
    }

    /// Manhattan distance to another position
    pub fn manhattan_distance(&self, other: &Position) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Axis-aligned direction between 4-connected cells.
///
/// `y` grows downwards, so `North` is `-y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    West,
    East,
    North,
    South,
}

impl Direction {
    pub fn to_delta(&self) -> (i32, i32) {
        match self {
            Direction::West => (-1, 0),
            Direction::East => (1, 0),
            Direction::North => (0, -1),
            Direction::South => (0, 1),
        }
    }

    /// Unit vector pointing in this direction
    pub fn unit_vector(&self) -> (f64, f64) {
        let (dx, dy) = self.to_delta();
        (dx as f64, dy as f64)
    }

    /// All directions in neighbour enumeration order: west, east, north, south.
    pub fn all() -> [Direction; 4] {
        [
            Direction::West,
            Direction::East,
            Direction::North,
            Direction::South,
        ]
    }

    /// Direction along the x axis matching the sign of `v`, `None` when `v == 0`.
    pub fn along_x(v: f64) -> Option<Direction> {
        if v > 0.0 {
            Some(Direction::East)
        } else if v < 0.0 {
            Some(Direction::West)
        } else {
            None
        }
    }

    /// Direction along the y axis matching the sign of `v`, `None` when `v == 0`.
    pub fn along_y(v: f64) -> Option<Direction> {
        if v > 0.0 {
            Some(Direction::South)
        } else if v < 0.0 {
            Some(Direction::North)
        } else {
            None
        }
    }
}

/// One column of water in the grid
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    /// Water column height
    pub head: f64,
    /// Velocity along x
    pub vx: f64,
    /// Velocity along y
    pub vy: f64,
    /// Walls neither give nor receive water
    pub is_wall: bool,
}

impl Cell {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn water(head: f64) -> Self {
        Self {
            head,
            ..Self::default()
        }
    }

    pub fn wall() -> Self {
        Self {
            is_wall: true,
            ..Self::default()
        }
    }

    pub fn with_velocity(mut self, vx: f64, vy: f64) -> Self {
        self.vx = vx;
        self.vy = vy;
        self
    }

    /// Magnitude of the velocity vector
    pub fn speed(&self) -> f64 {
        (self.vx * self.vx + self.vy * self.vy).sqrt()
    }
}
