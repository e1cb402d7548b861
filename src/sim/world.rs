//! Synthetic occupancy world with ray casting.

use nalgebra::Isometry3;

use crate::core::messages::OccupancyGridMsg;
use crate::core::pose::Pose2D;
use crate::matching::ScanPoint;

/// Square occupancy world anchored at the map origin.
#[derive(Debug, Clone)]
pub struct SimWorld {
    size: usize,
    resolution: f64,
    occupied: Vec<bool>,
    wall_line: Vec<(f64, f64)>,
}

impl SimWorld {
    /// Empty world.
    pub fn empty(size: usize, resolution: f64) -> Self {
        Self {
            size,
            resolution,
            occupied: vec![false; size * size],
            wall_line: Vec::new(),
        }
    }

    /// Closed square room.
    ///
    /// Walls are `wall` cells thick and sit `wall` cells in from the grid
    /// border, so the outside of each wall is free space too.
    pub fn room(size: usize, resolution: f64, wall: usize) -> Self {
        let mut world = Self::empty(size, resolution);
        let (lo, hi) = (wall, size.saturating_sub(wall));

        for y in lo..hi {
            for x in lo..hi {
                let near = |v: usize| v < lo + wall || v >= hi.saturating_sub(wall);
                if near(x) || near(y) {
                    world.occupied[y * size + x] = true;
                }
            }
        }

        // Middle row of each wall
        let a = lo + wall / 2;
        let b = size.saturating_sub(1 + a);
        let centre = |k: usize| (k as f64 + 0.5) * resolution;
        for k in a..=b {
            world.wall_line.push((centre(k), centre(a)));
            world.wall_line.push((centre(k), centre(b)));
        }
        for k in a + 1..b {
            world.wall_line.push((centre(a), centre(k)));
            world.wall_line.push((centre(b), centre(k)));
        }

        world
    }

    /// Mark every cell whose centre lies in the rectangle as occupied.
    pub fn add_box(&mut self, min: (f64, f64), max: (f64, f64)) {
        for y in 0..self.size {
            for x in 0..self.size {
                let cx = (x as f64 + 0.5) * self.resolution;
                let cy = (y as f64 + 0.5) * self.resolution;
                if cx >= min.0 && cx <= max.0 && cy >= min.1 && cy <= max.1 {
                    self.occupied[y * self.size + x] = true;
                }
            }
        }
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

    /// Side length in metres.
    #[inline]
    pub fn extent(&self) -> f64 {
        self.size as f64 * self.resolution
    }

    /// Whether the cell containing `(x, y)` is occupied. Outside is free.
    pub fn is_occupied(&self, x: f64, y: f64) -> bool {
        if x < 0.0 || y < 0.0 {
            return false;
        }
        let cx = (x / self.resolution) as usize;
        let cy = (y / self.resolution) as usize;
        cx < self.size && cy < self.size && self.occupied[cy * self.size + cx]
    }

    /// March a ray in half-cell steps; distance to the first occupied sample.
    pub fn ray_cast(&self, ox: f64, oy: f64, angle: f64, max_range: f64) -> Option<f64> {
        let step = self.resolution * 0.5;
        let (dy, dx) = angle.sin_cos();
        let mut distance = 0.0;

        while distance < max_range {
            distance += step;
            if self.is_occupied(ox + dx * distance, oy + dy * distance) {
                return Some(distance);
            }
        }
        None
    }

    /// Map message with occupied cells at 100 and free cells at 0.
    pub fn to_message(&self) -> OccupancyGridMsg {
        OccupancyGridMsg {
            width: self.size,
            height: self.size,
            resolution: self.resolution,
            origin: Isometry3::identity(),
            data: self
                .occupied
                .iter()
                .map(|&o| if o { 100 } else { 0 })
                .collect(),
        }
    }

    /// Cell centres along the middle of the room walls, map frame.
    #[inline]
    pub fn wall_line(&self) -> &[(f64, f64)] {
        &self.wall_line
    }

    /// Wall middle line seen from `pose`, as body-frame scan points.
    pub fn wall_points_in_body(&self, pose: &Pose2D) -> Vec<ScanPoint> {
        self.wall_line
            .iter()
            .map(|&(x, y)| {
                let (bx, by) = pose.inverse_transform_point(x, y);
                ScanPoint::new(bx, by)
            })
            .collect()
    }
}
