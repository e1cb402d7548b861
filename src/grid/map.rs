//! Square occupancy grid with multi-resolution preprocessing.
//!
//! Cells hold occupancy in [0, 1] (0 = free, 1 = occupied). Continuous
//! cell coordinates place integer values at cell centres, so cell (i, j)
//! covers `[i - 0.5, i + 0.5) × [j - 0.5, j + 0.5)`.

use log::debug;

use crate::error::MapError;

/// Bilinear sample of the grid: value and gradient.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Sample {
    /// Interpolated occupancy
    pub value: f64,
    /// ∂value/∂x
    pub grad_x: f64,
    /// ∂value/∂y
    pub grad_y: f64,
}

impl Sample {
    /// Zero value with zero gradient (outside the grid).
    pub const ZERO: Sample = Sample {
        value: 0.0,
        grad_x: 0.0,
        grad_y: 0.0,
    };
}

/// Square grid of occupancy values.
#[derive(Debug, Clone, PartialEq)]
pub struct GridMap {
    size: usize,
    resolution: f64,
    cells: Vec<f32>,
}

impl GridMap {
    /// Grid filled with a constant value.
    pub fn filled(size: usize, resolution: f64, value: f32) -> Self {
        Self {
            size,
            resolution,
            cells: vec![value.clamp(0.0, 1.0); size * size],
        }
    }

    /// Build from raw occupancy percentages (row-major, -1 = unknown).
    ///
    /// Values ≥ 0 map to `min(v / 100, 1)`, negative values to 0.
    pub fn from_occupancy(
        raw: &[i8],
        width: usize,
        height: usize,
        resolution: f64,
    ) -> Result<Self, MapError> {
        if width != height {
            return Err(MapError::NonSquare { width, height });
        }
        if width == 0 {
            return Err(MapError::Malformed("empty grid".into()));
        }
        let expected = width
            .checked_mul(height)
            .ok_or_else(|| MapError::Malformed(format!("{}x{} grid overflows", width, height)))?;
        if raw.len() != expected {
            return Err(MapError::Malformed(format!(
                "expected {} cells, got {}",
                expected,
                raw.len()
            )));
        }
        if !(resolution.is_finite() && resolution > 0.0) {
            return Err(MapError::Malformed(format!(
                "invalid resolution {}",
                resolution
            )));
        }

        let cells = raw
            .iter()
            .map(|&v| {
                if v >= 0 {
                    (v as f32 / 100.0).min(1.0)
                } else {
                    0.0
                }
            })
            .collect();

        Ok(Self {
            size: width,
            resolution,
            cells,
        })
    }

    /// Cells per side.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Cell size in metres.
    #[inline]
    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    /// Raw cell values, row-major.
    #[inline]
    pub fn cells(&self) -> &[f32] {
        &self.cells
    }

    /// Cell value, `None` outside the grid.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Option<f32> {
        if x < self.size && y < self.size {
            Some(self.cells[y * self.size + x])
        } else {
            None
        }
    }

    /// Set a cell value, clamped to [0, 1]. Out-of-range writes are ignored.
    pub fn set(&mut self, x: usize, y: usize, value: f32) {
        if x < self.size && y < self.size {
            self.cells[y * self.size + x] = value.clamp(0.0, 1.0);
        }
    }

    /// Cell value with indices clamped to the nearest edge cell.
    #[inline]
    fn get_clamped(&self, x: i64, y: i64) -> f64 {
        let last = self.size as i64 - 1;
        let (x, y) = (x.clamp(0, last) as usize, y.clamp(0, last) as usize);
        self.cells[y * self.size + x] as f64
    }

    /// Halve the resolution.
    ///
    /// Each new cell is the mean of a 2×2 source block; blocks that run past
    /// the last row/column reuse it.
    pub fn downscale(&self) -> GridMap {
        let new_size = self.size.div_ceil(2);
        let last = self.size.saturating_sub(1);
        let mut cells = Vec::with_capacity(new_size * new_size);

        for y in 0..new_size {
            let y0 = 2 * y;
            let y1 = (2 * y + 1).min(last);
            for x in 0..new_size {
                let x0 = 2 * x;
                let x1 = (2 * x + 1).min(last);
                let sum = self.cells[y0 * self.size + x0]
                    + self.cells[y0 * self.size + x1]
                    + self.cells[y1 * self.size + x0]
                    + self.cells[y1 * self.size + x1];
                cells.push(sum * 0.25);
            }
        }

        GridMap {
            size: new_size,
            resolution: self.resolution * 2.0,
            cells,
        }
    }

    /// Iterative 3×3 box blur.
    ///
    /// Border cells average only the neighbours that exist.
    pub fn smooth(&mut self, iterations: usize) {
        let n = self.size as i64;
        let mut next = vec![0.0f32; self.cells.len()];

        for _ in 0..iterations {
            for y in 0..n {
                for x in 0..n {
                    let mut sum = 0.0f32;
                    let mut count = 0u32;
                    for dy in -1..=1 {
                        for dx in -1..=1 {
                            let (nx, ny) = (x + dx, y + dy);
                            if nx >= 0 && ny >= 0 && nx < n && ny < n {
                                sum += self.cells[(ny * n + nx) as usize];
                                count += 1;
                            }
                        }
                    }
                    next[(y * n + x) as usize] = (sum / count as f32).clamp(0.0, 1.0);
                }
            }
            std::mem::swap(&mut self.cells, &mut next);
        }
    }

    /// Bilinear value and per-cell gradient at continuous cell coordinates.
    ///
    /// Coordinates outside the grid, `[-0.5, size - 0.5]` on either axis,
    /// give [`Sample::ZERO`]. Between the outer centres and the grid edge
    /// the edge cells extend outward, so the border half-cell reads the
    /// border value with no gradient across it.
    pub fn sample(&self, gx: f64, gy: f64) -> Sample {
        let max = self.size as f64 - 0.5;
        if self.size == 0 || !(gx >= -0.5 && gx <= max && gy >= -0.5 && gy <= max) {
            return Sample::ZERO;
        }

        let x0 = gx.floor() as i64;
        let y0 = gy.floor() as i64;
        let fx = gx - x0 as f64;
        let fy = gy - y0 as f64;

        let d00 = self.get_clamped(x0, y0);
        let d10 = self.get_clamped(x0 + 1, y0);
        let d01 = self.get_clamped(x0, y0 + 1);
        let d11 = self.get_clamped(x0 + 1, y0 + 1);

        let d0 = d00 * (1.0 - fx) + d10 * fx;
        let d1 = d01 * (1.0 - fx) + d11 * fx;

        Sample {
            value: d0 * (1.0 - fy) + d1 * fy,
            grad_x: (d10 - d00) * (1.0 - fy) + (d11 - d01) * fy,
            grad_y: (d01 - d00) * (1.0 - fx) + (d11 - d10) * fx,
        }
    }

    /// Downscale `levels` times, then smooth `iterations` times.
    pub fn preprocess(self, levels: usize, iterations: usize) -> GridMap {
        let mut grid = self;
        for level in 0..levels {
            grid = grid.downscale();
            debug!(
                "[Grid] Downscale {}/{}: {}x{} @ {:.3}m",
                level + 1,
                levels,
                grid.size,
                grid.size,
                grid.resolution
            );
        }
        grid.smooth(iterations);
        grid
    }
}
