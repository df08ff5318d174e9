//! Text rendering of a grid for terminals.

use hydro_world::Grid;

/// Shades from dry to full, indexed by the blue channel a window would draw.
const SHADES: [char; 5] = [' ', '.', ':', 'o', 'O'];

/// Blue intensity for a head value: four levels per unit head, saturating at 255.
pub fn intensity(head: f64) -> u8 {
    (4.0 * head).clamp(0.0, u8::MAX as f64) as u8
}

fn shade(head: f64) -> char {
    let level = intensity(head) as usize * (SHADES.len() - 1) / u8::MAX as usize;
    SHADES[level]
}

/// One line per row, `#` for walls
pub fn render(grid: &Grid) -> String {
    let mut out = String::with_capacity((grid.width() + 1) * grid.height());
    for row in grid.cells().chunks(grid.width()) {
        for cell in row {
            out.push(if cell.is_wall { '#' } else { shade(cell.head) });
        }
        out.push('\n');
    }
    out
}
