use ndarray::{s, Array2};
use serde::{Deserialize, Serialize};

use crate::error::{PilotError, Result};

/// The paintable obstacle field: a 2-D occupancy grid over the plane.
///
/// Cells are 0.0 (clear) or 1.0 (sand). The grid is indexed `[y, x]` and
/// mutated only through the brush operations and `clear`; the simulation's
/// sensors read it through `density_at` and `is_sand`.
#[derive(Clone, Serialize, Deserialize)]
pub struct SandField {
    cells: Array2<f32>,
    brush_radius: usize,
}

impl SandField {
    pub fn new(width: usize, height: usize, brush_radius: usize) -> Self {
        SandField {
            cells: Array2::zeros((height, width)),
            brush_radius,
        }
    }

    pub fn width(&self) -> usize {
        self.cells.ncols()
    }

    pub fn height(&self) -> usize {
        self.cells.nrows()
    }

    pub fn cells(&self) -> &Array2<f32> {
        &self.cells
    }

    fn check_bounds(&self, x: i32, y: i32) -> Result<()> {
        if x < 0 || y < 0 || x as usize >= self.width() || y as usize >= self.height() {
            return Err(PilotError::InvalidParameter {
                name: "coordinates".to_string(),
                reason: format!(
                    "({}, {}) outside the {}x{} field",
                    x,
                    y,
                    self.width(),
                    self.height()
                ),
            });
        }
        Ok(())
    }

    /// Stamp the square brush around an in-grid center, clipped at the edges.
    fn brush(&mut self, x: i32, y: i32) {
        let radius = self.brush_radius as i32;
        let y0 = (y - radius).max(0) as usize;
        let y1 = ((y + radius) as usize).min(self.height());
        let x0 = (x - radius).max(0) as usize;
        let x1 = ((x + radius) as usize).min(self.width());
        self.cells.slice_mut(s![y0..y1, x0..x1]).fill(1.0);
    }

    /// Paint sand around `(x, y)`. Coordinates outside the grid are rejected
    /// and leave the field unchanged.
    pub fn paint(&mut self, x: i32, y: i32) -> Result<()> {
        self.check_bounds(x, y)?;
        self.brush(x, y);
        Ok(())
    }

    /// Paint sand along the rasterized line between the two endpoints
    /// inclusive (Bresenham), brushing every visited cell.
    pub fn paint_segment(&mut self, x1: i32, y1: i32, x2: i32, y2: i32) -> Result<()> {
        self.check_bounds(x1, y1)?;
        self.check_bounds(x2, y2)?;

        let (mut x, mut y) = (x1, y1);
        let dx = (x2 - x1).abs();
        let dy = (y2 - y1).abs();
        let sx = if x1 < x2 { 1 } else { -1 };
        let sy = if y1 < y2 { 1 } else { -1 };
        let mut err = dx - dy;

        loop {
            self.brush(x, y);
            if x == x2 && y == y2 {
                break;
            }
            let e2 = 2 * err;
            if e2 > -dy {
                err -= dy;
                x += sx;
            }
            if e2 < dx {
                err += dx;
                y += sy;
            }
        }
        Ok(())
    }

    /// Reset the whole field to clear.
    pub fn clear(&mut self) {
        self.cells.fill(0.0);
    }

    /// Whether the cell under a continuous position holds sand. Positions
    /// outside the grid read as clear; the stepper clamps the car before this
    /// can matter.
    pub fn is_sand(&self, x: f32, y: f32) -> bool {
        if x < 0.0 || y < 0.0 {
            return false;
        }
        let (xi, yi) = (x as usize, y as usize);
        if xi >= self.width() || yi >= self.height() {
            return false;
        }
        self.cells[[yi, xi]] > 0.0
    }

    /// Mean occupancy of the `2*half_window` square window centered on an
    /// in-grid cell, in `[0, 1]`. The window is clipped at the grid edges but
    /// normalized by the full window area, matching the sensor model.
    pub fn density_at(&self, cx: usize, cy: usize, half_window: usize) -> f32 {
        if half_window == 0 {
            return 0.0;
        }
        let y0 = cy.saturating_sub(half_window);
        let y1 = (cy + half_window).min(self.height());
        let x0 = cx.saturating_sub(half_window);
        let x1 = (cx + half_window).min(self.width());
        let area = (2 * half_window * 2 * half_window) as f32;
        self.cells.slice(s![y0..y1, x0..x1]).sum() / area
    }
}
