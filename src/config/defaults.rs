//! Default value functions for serde deserialization.

pub fn broadcast_tf() -> bool {
    true
}

pub fn base_frame() -> String {
    "base_link".to_string()
}

pub fn odom_frame() -> String {
    "odom".to_string()
}

pub fn map_frame() -> String {
    "map".to_string()
}

pub fn map_downscale() -> usize {
    0
}

pub fn num_smooth() -> usize {
    5
}

pub fn solver_iterations() -> usize {
    20
}

pub fn solver_gain() -> f64 {
    0.1
}

pub fn solver_damping() -> f64 {
    1000.0
}

pub fn sample_rate() -> usize {
    10
}

pub fn sample_std_xy() -> f64 {
    0.5
}

pub fn sample_std_yaw() -> f64 {
    0.5
}

pub fn seed() -> u64 {
    0
}

pub fn update_gain() -> f64 {
    0.5
}

pub fn confidence_gain() -> f64 {
    0.01
}

pub fn max_confidence() -> f64 {
    0.95
}

pub fn min_points() -> usize {
    10
}

pub fn tolerance_ms() -> u64 {
    100
}

pub fn history_len() -> usize {
    512
}
