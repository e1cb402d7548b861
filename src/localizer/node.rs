//! The localizer: scan, map and pose-estimate handlers around one lock.
//!
//! # Scan update
//!
//! ```text
//! LaserScan ──> lookups (sensor→base, base→odom @ stamp)
//!                  │
//!                  ▼
//!   prior = G⁻¹ · T(offset) · L · 0        (grid frame)
//!                  │
//!                  ▼
//!   HypothesisSearch (prior + N Gaussian restarts)
//!                  │
//!                  ▼
//!   correction = G · pose25(best) · L⁻¹ · 0  (map←odom)
//!                  │
//!                  ▼
//!   fuse offset, raise confidence, broadcast map→odom
//! ```
//!
//! Every handler either commits its whole update or leaves the state
//! untouched and returns the reason.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::{debug, info, warn};
use nalgebra::{Isometry3, Vector4};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::frames::{TransformLookup, TransformSink};
use super::state::FusionState;
use crate::config::LocalizerConfig;
use crate::core::messages::{LaserScan, OccupancyGridMsg, PoseEstimate, StampedTransform};
use crate::core::pose::{Pose2D, Timestamped};
use crate::core::transform::{
    from_isometry_25, from_isometry_3, inverse25, origin_of, pose25, project, rotate3_z, Transform,
};
use crate::error::{ConfigError, LocalizeError, Result};
use crate::grid::MapSurface;
use crate::matching::{Hypothesis, HypothesisSearch, ScanPoint};

/// Outcome of an accepted scan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanUpdate {
    /// Fused map←odom offset after this scan
    pub offset: Timestamped<Pose2D>,
    /// Per-scan map←odom correction before fusion
    pub correction: Pose2D,
    /// Winning hypothesis in the grid frame
    pub best: Hypothesis,
    /// Trial that won (0 = prior)
    pub winner: usize,
    /// Scan points used
    pub points: usize,
    /// Confidence after this scan
    pub confidence: f64,
}

/// Snapshot of the localizer for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocalizerStatus {
    /// Current map←odom offset
    pub offset: Timestamped<Pose2D>,
    /// Localization confidence (0.0 - max_confidence)
    pub confidence: f64,
    /// Whether a map has been received
    pub has_map: bool,
    /// Surface cells per side
    pub map_size: usize,
    /// Surface resolution in metres (0 without a map)
    pub map_resolution: f64,
    /// Scans fused
    pub scans_accepted: u64,
    /// Scans dropped by any failure
    pub scans_rejected: u64,
    /// Residual norm of the last accepted scan
    pub last_r_norm: Option<f64>,
}

struct Inner {
    fusion: FusionState,
    search: HypothesisSearch,
    scans_accepted: u64,
    scans_rejected: u64,
    last_r_norm: Option<f64>,
}

/// Map-frame localizer.
///
/// All three handlers take `&self` and serialize on one internal mutex, so
/// a `Localizer` can be shared as `Arc<Localizer>` between threads.
pub struct Localizer {
    config: LocalizerConfig,
    lookup: Arc<dyn TransformLookup>,
    sink: Arc<dyn TransformSink>,
    inner: Mutex<Inner>,
    map_sequence: AtomicU64,
}

impl Localizer {
    /// Create a localizer with no map and zero confidence.
    pub fn new(
        config: LocalizerConfig,
        lookup: Arc<dyn TransformLookup>,
        sink: Arc<dyn TransformSink>,
    ) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        let search = HypothesisSearch::new(config.solver_config(), config.search_config());
        Ok(Self::with_search(config, lookup, sink, search))
    }

    /// Create a localizer around an explicit search (e.g. a seeded generator).
    pub fn with_search(
        config: LocalizerConfig,
        lookup: Arc<dyn TransformLookup>,
        sink: Arc<dyn TransformSink>,
        search: HypothesisSearch,
    ) -> Self {
        let inner = Inner {
            fusion: FusionState::new(config.fusion_params()),
            search,
            scans_accepted: 0,
            scans_rejected: 0,
            last_r_norm: None,
        };
        Self {
            config,
            lookup,
            sink,
            inner: Mutex::new(inner),
            map_sequence: AtomicU64::new(0),
        }
    }

    /// Active configuration.
    #[inline]
    pub fn config(&self) -> &LocalizerConfig {
        &self.config
    }

    /// Current map←odom offset.
    pub fn offset(&self) -> Timestamped<Pose2D> {
        self.inner.lock().fusion.offset()
    }

    /// Current confidence.
    pub fn confidence(&self) -> f64 {
        self.inner.lock().fusion.confidence()
    }

    /// Diagnostic snapshot.
    pub fn status(&self) -> LocalizerStatus {
        let inner = self.inner.lock();
        let (map_size, map_resolution) = inner
            .fusion
            .map()
            .map(|m| (m.grid().size(), m.grid().resolution()))
            .unwrap_or((0, 0.0));

        LocalizerStatus {
            offset: inner.fusion.offset(),
            confidence: inner.fusion.confidence(),
            has_map: inner.fusion.map().is_some(),
            map_size,
            map_resolution,
            scans_accepted: inner.scans_accepted,
            scans_rejected: inner.scans_rejected,
            last_r_norm: inner.last_r_norm,
        }
    }

    /// Match a scan against the map and fuse the correction.
    pub fn on_scan(&self, scan: &LaserScan) -> Result<ScanUpdate> {
        let mut inner = self.inner.lock();
        let result = self.update(&mut inner, scan);

        match &result {
            Ok(update) => {
                inner.scans_accepted += 1;
                inner.last_r_norm = Some(update.best.r_norm);
                self.broadcast(&update.offset);
                info!(
                    "[Localizer] r_norm={:.4} confidence={:.3} offset=({:.3}, {:.3}, {:.3})",
                    update.best.r_norm,
                    update.confidence,
                    update.offset.data.x,
                    update.offset.data.y,
                    update.offset.data.yaw
                );
            }
            Err(LocalizeError::NoMap) => {
                inner.scans_rejected += 1;
                debug!("[Localizer] Scan at {}us ignored: no map", scan.stamp_us);
            }
            Err(e) => {
                inner.scans_rejected += 1;
                warn!("[Localizer] Scan at {}us dropped: {}", scan.stamp_us, e);
            }
        }

        result
    }

    fn update(&self, inner: &mut Inner, scan: &LaserScan) -> Result<ScanUpdate> {
        let surface = inner.fusion.map().cloned().ok_or(LocalizeError::NoMap)?;
        let frames = &self.config.frames;

        let sensor_to_base =
            self.lookup_at(&frames.base_frame, &scan.frame_id, Some(scan.stamp_us))?;
        let base_to_odom =
            self.lookup_at(&frames.odom_frame, &frames.base_frame, Some(scan.stamp_us))?;

        let s = from_isometry_3(&sensor_to_base);
        let l = from_isometry_25(&base_to_odom);
        let t = pose25(&inner.fusion.offset().data);

        let prior = origin_of(&(surface.map_to_grid() * t * l));

        let points = scan_points(scan, &s);
        let min_points = self.config.fusion.min_points;
        if points.len() < min_points {
            return Err(LocalizeError::TooFewPoints {
                count: points.len(),
                min: min_points,
            });
        }

        let confidence = inner.fusion.confidence();
        let outcome = inner.search.run(&surface, &points, prior, confidence);

        let correction =
            origin_of(&(surface.grid_to_map() * pose25(&outcome.best.pose) * inverse25(&l)));
        inner.fusion.fuse(&correction, scan.stamp_us);

        Ok(ScanUpdate {
            offset: inner.fusion.offset(),
            correction,
            best: outcome.best,
            winner: outcome.winner,
            points: points.len(),
            confidence: inner.fusion.confidence(),
        })
    }

    /// Replace the map. Preprocessing runs before the lock is taken.
    ///
    /// Calls are ordered by arrival: if a later call installs its map first,
    /// the earlier map is discarded once it finishes preprocessing.
    pub fn on_map(&self, msg: &OccupancyGridMsg) -> Result<()> {
        let sequence = self.map_sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let surface = MapSurface::build(msg, self.config.map.downscale, self.config.map.num_smooth)
            .map_err(|e| {
                warn!("[Localizer] Map rejected: {}", e);
                LocalizeError::from(e)
            })?;
        self.install_map(surface, sequence, msg);
        Ok(())
    }

    fn install_map(&self, surface: MapSurface, sequence: u64, msg: &OccupancyGridMsg) {
        let (size, resolution) = (surface.grid().size(), surface.grid().resolution());

        let installed = self
            .inner
            .lock()
            .fusion
            .set_map(Arc::new(surface), sequence);
        if !installed {
            debug!("[Localizer] Map #{} superseded by a newer map", sequence);
            return;
        }

        info!(
            "[Localizer] Map #{} {}x{} @ {:.3}m installed ({}x{} @ {:.3}m input)",
            sequence, size, size, resolution, msg.width, msg.height, msg.resolution
        );
    }

    /// Reset the offset so the body sits at the given map pose.
    pub fn on_pose_estimate(&self, estimate: &PoseEstimate) -> Result<Pose2D> {
        let frames = &self.config.frames;
        if estimate.frame_id != frames.map_frame {
            let e = LocalizeError::InvalidFrame {
                expected: frames.map_frame.clone(),
                got: estimate.frame_id.clone(),
            };
            warn!("[Localizer] Pose estimate rejected: {}", e);
            return Err(e);
        }

        let mut inner = self.inner.lock();

        let base_to_odom = self
            .lookup_at(&frames.odom_frame, &frames.base_frame, None)
            .map_err(|e| {
                warn!("[Localizer] Pose estimate rejected: {}", e);
                e
            })?;
        let l = from_isometry_25(&base_to_odom);
        let p = from_isometry_25(&estimate.pose);

        let offset = origin_of(&(p * inverse25(&l)));
        inner.fusion.reset(offset, estimate.stamp_us);
        let stamped = inner.fusion.offset();
        self.broadcast(&stamped);

        info!(
            "[Localizer] Pose estimate applied: offset=({:.3}, {:.3}, {:.3})",
            offset.x, offset.y, offset.yaw
        );
        Ok(offset)
    }

    fn lookup_at(
        &self,
        target: &str,
        source: &str,
        stamp_us: Option<u64>,
    ) -> Result<Isometry3<f64>> {
        self.lookup
            .lookup(target, source, stamp_us)
            .map_err(|cause| LocalizeError::Lookup {
                target: target.to_string(),
                source_frame: source.to_string(),
                cause,
            })
    }

    fn broadcast(&self, offset: &Timestamped<Pose2D>) {
        if !self.config.broadcast_tf {
            return;
        }
        let frames = &self.config.frames;
        self.sink.send(&StampedTransform::planar(
            offset.timestamp_us,
            frames.map_frame.as_str(),
            frames.odom_frame.as_str(),
            &offset.data,
        ));
    }
}

/// Body-frame points of a scan; `sensor_to_base` is a 3-d transform.
///
/// Readings that are non-positive or non-finite are skipped.
pub fn scan_points(scan: &LaserScan, sensor_to_base: &Transform) -> Vec<ScanPoint> {
    let mut points = Vec::with_capacity(scan.ranges.len());
    for (i, &range) in scan.ranges.iter().enumerate() {
        let range = range as f64;
        if !(range.is_finite() && range > 0.0) {
            continue;
        }
        let beam = rotate3_z(scan.angle(i)) * Vector4::new(range, 0.0, 0.0, 1.0);
        let p = project(&(sensor_to_base * beam));
        points.push(ScanPoint::new(p.x, p.y));
    }
    points
}
