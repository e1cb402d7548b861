//! Localizer configuration.
//!
//! Loaded from a single TOML file; every key is optional and falls back to
//! the defaults in [`defaults`].
//!
//! ## Example TOML
//!
//! ```toml
//! broadcast_tf = true
//!
//! [frames]
//! base_frame = "base_link"
//! odom_frame = "odom"
//! map_frame = "map"
//!
//! [map]
//! downscale = 0       # halvings of the input resolution
//! num_smooth = 5      # 3x3 box blur passes
//!
//! [solver]
//! iterations = 20     # Gauss-Newton steps per hypothesis
//! gain = 0.1
//! damping = 1000.0
//!
//! [search]
//! sample_rate = 10    # perturbed hypotheses per scan
//! sample_std_x = 0.5  # metres, scaled by (1 - confidence)
//! sample_std_y = 0.5
//! sample_std_yaw = 0.5
//! seed = 0            # 0 = random
//!
//! [fusion]
//! update_gain = 0.5
//! confidence_gain = 0.01
//! max_confidence = 0.95
//! min_points = 10
//!
//! [transforms]
//! tolerance_ms = 100
//! history_len = 512
//! ```

pub mod defaults;

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::localizer::FusionParams;
use crate::matching::{SearchConfig, SolverConfig};

/// Frame names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FramesSection {
    #[serde(default = "defaults::base_frame")]
    pub base_frame: String,
    #[serde(default = "defaults::odom_frame")]
    pub odom_frame: String,
    #[serde(default = "defaults::map_frame")]
    pub map_frame: String,
}

impl Default for FramesSection {
    fn default() -> Self {
        Self {
            base_frame: defaults::base_frame(),
            odom_frame: defaults::odom_frame(),
            map_frame: defaults::map_frame(),
        }
    }
}

/// Map preprocessing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapSection {
    #[serde(default = "defaults::map_downscale")]
    pub downscale: usize,
    #[serde(default = "defaults::num_smooth")]
    pub num_smooth: usize,
}

impl Default for MapSection {
    fn default() -> Self {
        Self {
            downscale: defaults::map_downscale(),
            num_smooth: defaults::num_smooth(),
        }
    }
}

/// Pose solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverSection {
    #[serde(default = "defaults::solver_iterations")]
    pub iterations: usize,
    #[serde(default = "defaults::solver_gain")]
    pub gain: f64,
    #[serde(default = "defaults::solver_damping")]
    pub damping: f64,
}

impl Default for SolverSection {
    fn default() -> Self {
        Self {
            iterations: defaults::solver_iterations(),
            gain: defaults::solver_gain(),
            damping: defaults::solver_damping(),
        }
    }
}

/// Hypothesis search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSection {
    #[serde(default = "defaults::sample_rate")]
    pub sample_rate: usize,
    #[serde(default = "defaults::sample_std_xy")]
    pub sample_std_x: f64,
    #[serde(default = "defaults::sample_std_xy")]
    pub sample_std_y: f64,
    #[serde(default = "defaults::sample_std_yaw")]
    pub sample_std_yaw: f64,
    #[serde(default = "defaults::seed")]
    pub seed: u64,
}

impl Default for SearchSection {
    fn default() -> Self {
        Self {
            sample_rate: defaults::sample_rate(),
            sample_std_x: defaults::sample_std_xy(),
            sample_std_y: defaults::sample_std_xy(),
            sample_std_yaw: defaults::sample_std_yaw(),
            seed: defaults::seed(),
        }
    }
}

/// Temporal fusion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusionSection {
    #[serde(default = "defaults::update_gain")]
    pub update_gain: f64,
    #[serde(default = "defaults::confidence_gain")]
    pub confidence_gain: f64,
    #[serde(default = "defaults::max_confidence")]
    pub max_confidence: f64,
    #[serde(default = "defaults::min_points")]
    pub min_points: usize,
}

impl Default for FusionSection {
    fn default() -> Self {
        Self {
            update_gain: defaults::update_gain(),
            confidence_gain: defaults::confidence_gain(),
            max_confidence: defaults::max_confidence(),
            min_points: defaults::min_points(),
        }
    }
}

/// In-memory transform buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformsSection {
    /// How far outside the stored history a lookup may reach.
    #[serde(default = "defaults::tolerance_ms")]
    pub tolerance_ms: u64,
    /// Samples kept per dynamic edge.
    #[serde(default = "defaults::history_len")]
    pub history_len: usize,
}

impl Default for TransformsSection {
    fn default() -> Self {
        Self {
            tolerance_ms: defaults::tolerance_ms(),
            history_len: defaults::history_len(),
        }
    }
}

/// Top-level localizer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalizerConfig {
    #[serde(default = "defaults::broadcast_tf")]
    pub broadcast_tf: bool,
    #[serde(default)]
    pub frames: FramesSection,
    #[serde(default)]
    pub map: MapSection,
    #[serde(default)]
    pub solver: SolverSection,
    #[serde(default)]
    pub search: SearchSection,
    #[serde(default)]
    pub fusion: FusionSection,
    #[serde(default)]
    pub transforms: TransformsSection,
}

impl Default for LocalizerConfig {
    fn default() -> Self {
        Self {
            broadcast_tf: defaults::broadcast_tf(),
            frames: FramesSection::default(),
            map: MapSection::default(),
            solver: SolverSection::default(),
            search: SearchSection::default(),
            fusion: FusionSection::default(),
            transforms: TransformsSection::default(),
        }
    }
}

impl LocalizerConfig {
    /// Load and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the first readable file in `paths`, else defaults.
    ///
    /// Files that exist but fail to parse or validate are reported and
    /// skipped.
    pub fn load_or_default<P: AsRef<Path>>(paths: &[P]) -> Self {
        for path in paths {
            let path = path.as_ref();
            if !path.exists() {
                continue;
            }
            match Self::load(path) {
                Ok(config) => {
                    log::info!("Loaded config from {}", path.display());
                    return config;
                }
                Err(e) => log::warn!("Failed to load config {}: {}", path.display(), e),
            }
        }
        log::info!("Using default configuration");
        Self::default()
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn invalid(msg: String) -> Result<(), ConfigError> {
            Err(ConfigError::Invalid(msg))
        }

        let f = &self.frames;
        for (key, name) in [
            ("base_frame", &f.base_frame),
            ("odom_frame", &f.odom_frame),
            ("map_frame", &f.map_frame),
        ] {
            if name.trim().is_empty() {
                return invalid(format!("frames.{} is empty", key));
            }
        }
        if f.base_frame == f.odom_frame || f.odom_frame == f.map_frame || f.base_frame == f.map_frame
        {
            return invalid("frame names must be distinct".into());
        }

        let s = &self.solver;
        if s.iterations == 0 {
            return invalid("solver.iterations must be > 0".into());
        }
        if !(s.gain.is_finite() && s.gain > 0.0) {
            return invalid(format!("solver.gain must be > 0, got {}", s.gain));
        }
        if !(s.damping.is_finite() && s.damping >= 0.0) {
            return invalid(format!("solver.damping must be >= 0, got {}", s.damping));
        }

        let h = &self.search;
        for (key, std) in [
            ("sample_std_x", h.sample_std_x),
            ("sample_std_y", h.sample_std_y),
            ("sample_std_yaw", h.sample_std_yaw),
        ] {
            if !(std.is_finite() && std >= 0.0) {
                return invalid(format!("search.{} must be >= 0, got {}", key, std));
            }
        }

        let u = &self.fusion;
        if !(0.0..=1.0).contains(&u.update_gain) {
            return invalid(format!(
                "fusion.update_gain must be in [0, 1], got {}",
                u.update_gain
            ));
        }
        if !(0.0..=1.0).contains(&u.confidence_gain) {
            return invalid(format!(
                "fusion.confidence_gain must be in [0, 1], got {}",
                u.confidence_gain
            ));
        }
        if !(0.0..1.0).contains(&u.max_confidence) {
            return invalid(format!(
                "fusion.max_confidence must be in [0, 1), got {}",
                u.max_confidence
            ));
        }
        if u.min_points == 0 {
            return invalid("fusion.min_points must be >= 1".into());
        }

        if self.transforms.history_len == 0 {
            return invalid("transforms.history_len must be >= 1".into());
        }

        Ok(())
    }

    /// Solver step parameters.
    pub fn solver_config(&self) -> SolverConfig {
        SolverConfig {
            gain: self.solver.gain,
            damping: self.solver.damping,
        }
    }

    /// Hypothesis search parameters.
    pub fn search_config(&self) -> SearchConfig {
        SearchConfig {
            iterations: self.solver.iterations,
            sample_rate: self.search.sample_rate,
            std_x: self.search.sample_std_x,
            std_y: self.search.sample_std_y,
            std_yaw: self.search.sample_std_yaw,
            seed: self.search.seed,
        }
    }

    /// Fusion gains.
    pub fn fusion_params(&self) -> FusionParams {
        FusionParams {
            update_gain: self.fusion.update_gain,
            confidence_gain: self.fusion.confidence_gain,
            max_confidence: self.fusion.max_confidence,
        }
    }
}
