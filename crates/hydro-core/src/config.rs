//! Configuration types for the simulation.

use crate::{Error, Position, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Step engine parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Cells at or below this head neither diffuse nor advect
    pub min_head: f64,
    /// Multiplier applied to measured wall-clock time before integration
    pub time_scale: f64,
    /// Unscaled gap between steps (seconds) above which a stall is logged
    pub stall_warning_secs: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            min_head: 5.0,
            time_scale: 10.0,
            stall_warning_secs: 0.5,
        }
    }
}

impl SimConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.min_head.is_finite() || self.min_head < 0.0 {
            return Err(Error::Config(format!(
                "min_head must be finite and non-negative, got {}",
                self.min_head
            )));
        }
        if !self.time_scale.is_finite() || self.time_scale <= 0.0 {
            return Err(Error::Config(format!(
                "time_scale must be finite and positive, got {}",
                self.time_scale
            )));
        }
        if !self.stall_warning_secs.is_finite() || self.stall_warning_secs <= 0.0 {
            return Err(Error::Config(format!(
                "stall_warning_secs must be finite and positive, got {}",
                self.stall_warning_secs
            )));
        }
        Ok(())
    }
}

/// World generation parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Width of the grid in cells
    pub width: usize,
    /// Height of the grid in cells
    pub height: usize,
    /// Fraction of cells turned into walls (0.0 to 1.0)
    pub wall_density: f32,
    /// Fraction of cells filled with water (0.0 to 1.0)
    pub water_density: f32,
    /// Head given to generated water cells
    pub water_level: f64,
    /// Random seed for reproducibility
    pub seed: u64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: 15,
            height: 10,
            wall_density: 0.1,
            water_density: 0.1,
            water_level: 100.0,
            seed: 0,
        }
    }
}

impl WorldConfig {
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        let densities = [("wall_density", self.wall_density), ("water_density", self.water_density)];
        for (name, value) in densities {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::Config(format!("{} must be within [0, 1], got {}", name, value)));
            }
        }
        if self.wall_density + self.water_density > 1.0 {
            return Err(Error::Config(
                "wall_density + water_density must not exceed 1".to_string(),
            ));
        }
        if !self.water_level.is_finite() || self.water_level < 0.0 {
            return Err(Error::Config(format!(
                "water_level must be finite and non-negative, got {}",
                self.water_level
            )));
        }
        Ok(())
    }
}

/// Cell editing parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Side length of one cell on screen, in pixels
    pub cell_size: u32,
    /// Head poured into a cell when water is toggled on
    pub water_level: f64,
    /// Cells holding more than this are drained when water is toggled
    pub drain_threshold: f64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            cell_size: 50,
            water_level: 100.0,
            drain_threshold: 50.0,
        }
    }
}

impl EditorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.cell_size == 0 {
            return Err(Error::Config("cell_size must be positive".to_string()));
        }
        Ok(())
    }
}

/// Headless driver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Number of loop iterations to run
    pub num_ticks: u64,
    /// Sleep between iterations (milliseconds)
    pub frame_interval_ms: u64,
    /// Log grid statistics every N ticks (0 disables)
    pub report_interval: u64,
    /// Print an ASCII frame on every report
    pub render: bool,
    /// Emit logs as JSON lines instead of human-readable text
    pub log_json: bool,
    /// Cells toggled to walls before the first step
    pub walls: Vec<Position>,
    /// Cells toggled to water before the first step
    pub pours: Vec<Position>,
    pub world: WorldConfig,
    pub sim: SimConfig,
    pub editor: EditorConfig,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            num_ticks: 1_000,
            frame_interval_ms: 16,
            report_interval: 100,
            render: false,
            log_json: false,
            walls: Vec::new(),
            pours: Vec::new(),
            world: WorldConfig::default(),
            sim: SimConfig::default(),
            editor: EditorConfig::default(),
        }
    }
}

impl DriverConfig {
    /// Load a configuration from a JSON file; missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Loading driver configuration");
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.world.validate()?;
        self.sim.validate()?;
        self.editor.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_configs() {
        let sim = SimConfig::default();
        assert_eq!(sim.min_head, 5.0);
        assert!(sim.validate().is_ok());

        let world = WorldConfig::default();
        assert_eq!(world.width, 15);
        assert_eq!(world.height, 10);

        let editor = EditorConfig::default();
        assert_eq!(editor.cell_size, 50);
        assert_eq!(editor.water_level, 100.0);

        assert!(DriverConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{ "num_ticks": 5, "world": { "width": 3, "height": 1 } }"#;
        let config: DriverConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.num_ticks, 5);
        assert_eq!(config.world.width, 3);
        assert_eq!(config.world.water_level, 100.0);
        assert_eq!(config.sim.time_scale, SimConfig::default().time_scale);
    }

    #[test]
    fn test_zero_dimensions_rejected() {
        let world = WorldConfig {
            width: 0,
            ..Default::default()
        };
        assert!(matches!(
            world.validate(),
            Err(Error::InvalidDimensions { width: 0, height: 10 })
        ));
    }

    #[test]
    fn test_bad_time_scale_rejected() {
        let sim = SimConfig {
            time_scale: 0.0,
            ..Default::default()
        };
        assert!(matches!(sim.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_densities_must_fit() {
        let world = WorldConfig {
            wall_density: 0.7,
            water_density: 0.6,
            ..Default::default()
        };
        assert!(matches!(world.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = DriverConfig::from_json_file("/nonexistent/hydro-driver.json");
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
