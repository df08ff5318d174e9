//! Headless driver for the HydroSim step engine.
//!
//! Usage: `hydro-driver [config.json]`

mod render;
mod telemetry;

use anyhow::{Context, Result};
use hydro_core::{DriverConfig, GridStats};
use hydro_world::{editor, Clock, Grid, StepEngine};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::time::Duration;
use tracing::{info, warn};

fn main() -> Result<()> {
    // Load configuration
    let config = match std::env::args().nth(1) {
        Some(path) => DriverConfig::from_json_file(&path)
            .with_context(|| format!("failed to load config from {}", path))?,
        None => DriverConfig::default(),
    };
    config.validate()?;

    telemetry::init_telemetry(config.log_json)?;

    info!(
        width = config.world.width,
        height = config.world.height,
        seed = config.world.seed,
        num_ticks = config.num_ticks,
        "Starting HydroSim driver"
    );

    let mut rng = ChaCha8Rng::seed_from_u64(config.world.seed);
    let mut grid = Grid::from_config(&config.world, &mut rng)?;
    apply_edits(&mut grid, &config)?;

    let mut engine = StepEngine::new(config.sim.clone())?;
    let stats = run(&mut engine, &mut grid, &config);

    info!(
        event = "run_summary",
        steps = engine.steps(),
        total_head = stats.total_head,
        max_head = stats.max_head,
        wet_cells = stats.wet_cells,
        "Simulation finished"
    );

    Ok(())
}

/// Paint the configured walls and water onto the seeded grid
fn apply_edits(grid: &mut Grid, config: &DriverConfig) -> Result<()> {
    for &pos in &config.walls {
        editor::toggle_wall(grid, pos).with_context(|| format!("cannot place wall at {}", pos))?;
    }
    for &pos in &config.pours {
        editor::toggle_water(grid, pos, &config.editor)
            .with_context(|| format!("cannot pour water at {}", pos))?;
    }
    Ok(())
}

/// Drive the engine for `num_ticks` iterations and return the final statistics
fn run<C: Clock>(engine: &mut StepEngine<C>, grid: &mut Grid, config: &DriverConfig) -> GridStats {
    let frame_interval = Duration::from_millis(config.frame_interval_ms);

    for tick in 0..config.num_ticks {
        engine.step(grid);

        if config.report_interval > 0 && tick % config.report_interval == 0 {
            report(tick, grid, config.render);
        }

        if !frame_interval.is_zero() {
            std::thread::sleep(frame_interval);
        }
    }

    grid.stats()
}

fn report(tick: u64, grid: &Grid, render: bool) {
    let stats = grid.stats();
    info!(
        event = "tick_report",
        tick,
        total_head = format!("{:.2}", stats.total_head),
        max_head = stats.max_head,
        min_head = stats.min_head,
        wet_cells = stats.wet_cells,
        max_speed = stats.max_speed,
        "Grid snapshot"
    );

    if !stats.is_finite() {
        warn!(tick, "Grid holds non-finite values");
    }

    if render {
        println!("{}", render::render(grid));
    }
}
