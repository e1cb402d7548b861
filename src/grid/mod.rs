//! Occupancy grid preprocessing and sampling.
//!
//! A raw map message becomes a [`MapSurface`]: a square [`GridMap`] in
//! [0, 1], optionally downscaled and box-smoothed, that can be sampled with
//! bilinear interpolation and an analytic gradient.
//!
//! ```text
//! OccupancyGridMsg ──> GridMap::from_occupancy ──> downscale × N ──> smooth × M
//!                                                                      │
//!                                           MapSurface { grid, grid_to_map }
//! ```

mod map;
mod surface;

pub use map::{GridMap, Sample};
pub use surface::MapSurface;
