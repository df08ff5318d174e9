//! Grid state and step engine.
//!
//! This module implements the 2D height field where water columns exchange
//! head and momentum with their 4-connected neighbours.

pub mod clock;
pub mod editor;
pub mod engine;
pub mod grid;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use editor::CellEditor;
pub use engine::StepEngine;
pub use grid::Grid;
