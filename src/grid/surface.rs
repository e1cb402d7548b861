//! Derived map surface used for scan matching.

use log::debug;
use nalgebra::Isometry3;

use super::map::{GridMap, Sample};
use crate::core::messages::OccupancyGridMsg;
use crate::core::transform::{from_isometry_25, inverse25, Transform};
use crate::error::MapError;

/// Preprocessed grid plus its placement in the map frame.
///
/// Built once per map message and shared read-only afterwards.
#[derive(Debug, Clone)]
pub struct MapSurface {
    grid: GridMap,
    grid_to_map: Transform,
    map_to_grid: Transform,
}

impl MapSurface {
    /// Wrap an already processed grid.
    pub fn new(grid: GridMap, origin: &Isometry3<f64>) -> Self {
        let grid_to_map = from_isometry_25(origin);
        Self {
            grid,
            map_to_grid: inverse25(&grid_to_map),
            grid_to_map,
        }
    }

    /// Validate, downscale and smooth a map message.
    pub fn build(
        msg: &OccupancyGridMsg,
        downscale: usize,
        num_smooth: usize,
    ) -> Result<Self, MapError> {
        let grid = GridMap::from_occupancy(&msg.data, msg.width, msg.height, msg.resolution)?;
        debug!(
            "[Grid] Input map {}x{} @ {:.3}m",
            grid.size(),
            grid.size(),
            grid.resolution()
        );

        let grid = grid.preprocess(downscale, num_smooth);
        debug!(
            "[Grid] Surface ready: {}x{} @ {:.3}m after {} smoothing passes",
            grid.size(),
            grid.size(),
            grid.resolution(),
            num_smooth
        );

        Ok(Self::new(grid, &msg.origin))
    }

    /// Underlying grid.
    #[inline]
    pub fn grid(&self) -> &GridMap {
        &self.grid
    }

    /// Grid frame to map frame (25-d).
    #[inline]
    pub fn grid_to_map(&self) -> &Transform {
        &self.grid_to_map
    }

    /// Map frame to grid frame (25-d).
    #[inline]
    pub fn map_to_grid(&self) -> &Transform {
        &self.map_to_grid
    }

    /// Sample at grid-frame metres; gradient is per metre.
    #[inline]
    pub fn sample_metric(&self, x: f64, y: f64) -> Sample {
        let inv_res = 1.0 / self.grid.resolution();
        let s = self.grid.sample(x * inv_res - 0.5, y * inv_res - 0.5);
        Sample {
            value: s.value,
            grad_x: s.grad_x * inv_res,
            grad_y: s.grad_y * inv_res,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::pose::Pose2D;
    use crate::core::transform::{isometry_from_pose, origin_of};
    use approx::assert_relative_eq;

    fn message(size: usize, origin: Pose2D) -> OccupancyGridMsg {
        let mut data = vec![0i8; size * size];
        data[size * (size / 2) + size / 2] = 100;
        OccupancyGridMsg {
            width: size,
            height: size,
            resolution: 0.1,
            origin: isometry_from_pose(&origin),
            data,
        }
    }

    #[test]
    fn test_build_records_grid_to_map() {
        let origin = Pose2D::new(-2.0, 1.0, 0.3);
        let surface = MapSurface::build(&message(8, origin), 1, 0).unwrap();

        assert_eq!(surface.grid().size(), 4);
        assert_relative_eq!(surface.grid().resolution(), 0.2);

        let placed = origin_of(surface.grid_to_map());
        assert_relative_eq!(placed.x, -2.0, epsilon = 1e-12);
        assert_relative_eq!(placed.y, 1.0, epsilon = 1e-12);
        assert_relative_eq!(placed.yaw, 0.3, epsilon = 1e-12);

        let roundtrip = surface.grid_to_map() * surface.map_to_grid();
        assert_relative_eq!(roundtrip, Transform::identity(), epsilon = 1e-12);
    }

    #[test]
    fn test_build_rejects_non_square() {
        let mut msg = message(4, Pose2D::identity());
        msg.height = 2;
        msg.data.truncate(8);
        assert!(matches!(
            MapSurface::build(&msg, 0, 0),
            Err(MapError::NonSquare { .. })
        ));
    }

    #[test]
    fn test_sample_metric_hits_cell_centres() {
        let surface = MapSurface::build(&message(10, Pose2D::identity()), 0, 0).unwrap();
        // Cell (5, 5) is occupied; its centre is at (0.55, 0.55)
        assert_relative_eq!(surface.sample_metric(0.55, 0.55).value, 1.0, epsilon = 1e-9);
        assert_relative_eq!(surface.sample_metric(0.25, 0.25).value, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_sample_metric_gradient_per_metre() {
        let surface = MapSurface::build(&message(10, Pose2D::identity()), 0, 0).unwrap();
        // Halfway between centres (4,5) and (5,5): rises by 1 over 0.1 m
        let s = surface.sample_metric(0.50, 0.55);
        assert_relative_eq!(s.value, 0.5, epsilon = 1e-9);
        assert_relative_eq!(s.grad_x, 10.0, epsilon = 1e-6);
    }

    #[test]
    fn test_sample_metric_outside_is_zero() {
        let surface = MapSurface::build(&message(10, Pose2D::identity()), 0, 0).unwrap();
        assert_eq!(surface.sample_metric(-1.0, 0.5), Sample::ZERO);
        assert_eq!(surface.sample_metric(0.5, 5.0), Sample::ZERO);
    }

    #[test]
    fn test_sample_metric_border_column_is_occupied_to_the_edge() {
        let mut msg = message(10, Pose2D::identity());
        msg.data.iter_mut().for_each(|c| *c = 0);
        for row in 0..10 {
            msg.data[row * 10] = 100;
        }
        let surface = MapSurface::build(&msg, 0, 0).unwrap();

        // Outer half of cell column 0, between the map edge and its centre
        let s = surface.sample_metric(0.02, 0.55);
        assert_relative_eq!(s.value, 1.0, epsilon = 1e-9);
        assert_relative_eq!(s.grad_x, 0.0, epsilon = 1e-9);

        let s = surface.sample_metric(0.05, 0.55);
        assert_relative_eq!(s.value, 1.0, epsilon = 1e-9);
        assert_relative_eq!(s.grad_x, -10.0, epsilon = 1e-6);

        assert_eq!(surface.sample_metric(-0.01, 0.55), Sample::ZERO);
    }
}
