//! Frame-transform lookup and transform broadcast.
//!
//! [`TransformLookup`] resolves `(target, source, time)` to the pose of
//! `source` expressed in `target`, i.e. the transform that maps points from
//! `source` coordinates into `target` coordinates. [`TransformSink`]
//! receives the published map→odom transform.
//!
//! [`TransformBuffer`] is an in-memory directory of direct edges:
//!
//! ```text
//! parent ──(static | time series)──> child
//! lookup(parent, child) = edge         lookup(child, parent) = edge⁻¹
//! ```

use std::collections::{HashMap, VecDeque};

use crossbeam_channel::{Sender, TrySendError};
use nalgebra::{Isometry3, Translation3};
use parking_lot::{Mutex, RwLock};

use crate::core::messages::StampedTransform;
use crate::error::LookupError;

/// Source of frame transforms.
pub trait TransformLookup: Send + Sync {
    /// Pose of `source` in `target` at `stamp_us` (`None` = latest).
    fn lookup(
        &self,
        target: &str,
        source: &str,
        stamp_us: Option<u64>,
    ) -> Result<Isometry3<f64>, LookupError>;
}

/// Destination for published transforms.
pub trait TransformSink: Send + Sync {
    /// Publish one transform. Must not block.
    fn send(&self, transform: &StampedTransform);
}

#[derive(Debug, Clone)]
enum Edge {
    Static(Isometry3<f64>),
    Dynamic(VecDeque<(u64, Isometry3<f64>)>),
}

/// In-memory transform directory with bounded history per edge.
#[derive(Debug)]
pub struct TransformBuffer {
    edges: RwLock<HashMap<(String, String), Edge>>,
    tolerance_us: u64,
    history_len: usize,
}

impl TransformBuffer {
    /// Create an empty buffer.
    ///
    /// Lookups up to `tolerance_us` outside an edge's history clamp to the
    /// nearest sample; further out they fail with
    /// [`LookupError::Extrapolation`].
    pub fn new(tolerance_us: u64, history_len: usize) -> Self {
        Self {
            edges: RwLock::new(HashMap::new()),
            tolerance_us,
            history_len: history_len.max(1),
        }
    }

    /// Register a time-invariant transform.
    pub fn set_static(&self, parent: &str, child: &str, transform: Isometry3<f64>) {
        self.edges
            .write()
            .insert((parent.to_string(), child.to_string()), Edge::Static(transform));
    }

    /// Record a time-stamped transform.
    ///
    /// Samples older than the newest stored one are ignored.
    pub fn set_transform(&self, parent: &str, child: &str, stamp_us: u64, transform: Isometry3<f64>) {
        let mut edges = self.edges.write();
        let edge = edges
            .entry((parent.to_string(), child.to_string()))
            .or_insert_with(|| Edge::Dynamic(VecDeque::with_capacity(self.history_len)));

        match edge {
            Edge::Static(_) => {
                log::warn!(
                    "[Frames] Ignoring stamped update of static edge {} -> {}",
                    parent,
                    child
                );
            }
            Edge::Dynamic(history) => {
                if let Some(&(newest, _)) = history.back() {
                    if stamp_us < newest {
                        return;
                    }
                    if stamp_us == newest {
                        history.pop_back();
                    }
                }
                history.push_back((stamp_us, transform));
                while history.len() > self.history_len {
                    history.pop_front();
                }
            }
        }
    }

    /// Record a [`StampedTransform`].
    pub fn insert(&self, transform: &StampedTransform) {
        let iso = Isometry3::from_parts(Translation3::from(transform.translation), transform.rotation);
        self.set_transform(
            &transform.parent_frame,
            &transform.child_frame,
            transform.stamp_us,
            iso,
        );
    }

    fn sample(
        &self,
        parent: &str,
        child: &str,
        edge: &Edge,
        stamp_us: Option<u64>,
    ) -> Result<Isometry3<f64>, LookupError> {
        let history = match edge {
            Edge::Static(t) => return Ok(*t),
            Edge::Dynamic(history) => history,
        };

        let (Some(&(oldest, first)), Some(&(newest, last))) = (history.front(), history.back())
        else {
            return Err(LookupError::UnknownFrame {
                target: parent.to_string(),
                source_frame: child.to_string(),
            });
        };

        let Some(t) = stamp_us else {
            return Ok(last);
        };

        if t <= oldest {
            if oldest - t <= self.tolerance_us {
                return Ok(first);
            }
        } else if t >= newest {
            if t - newest <= self.tolerance_us {
                return Ok(last);
            }
        } else {
            // Strictly inside the history: interpolate between neighbours
            let upper = history.partition_point(|&(s, _)| s < t);
            let (t0, a) = history[upper - 1];
            let (t1, b) = history[upper];
            let ratio = (t - t0) as f64 / (t1 - t0) as f64;
            return Ok(a.lerp_slerp(&b, ratio));
        }

        Err(LookupError::Extrapolation {
            parent: parent.to_string(),
            child: child.to_string(),
            stamp_us: t,
            oldest_us: oldest,
            newest_us: newest,
        })
    }
}

impl TransformLookup for TransformBuffer {
    fn lookup(
        &self,
        target: &str,
        source: &str,
        stamp_us: Option<u64>,
    ) -> Result<Isometry3<f64>, LookupError> {
        if target == source {
            return Ok(Isometry3::identity());
        }

        let edges = self.edges.read();
        if let Some(edge) = edges.get(&(target.to_string(), source.to_string())) {
            return self.sample(target, source, edge, stamp_us);
        }
        if let Some(edge) = edges.get(&(source.to_string(), target.to_string())) {
            return self
                .sample(source, target, edge, stamp_us)
                .map(|t| t.inverse());
        }

        Err(LookupError::UnknownFrame {
            target: target.to_string(),
            source_frame: source.to_string(),
        })
    }
}

/// Forwards transforms into a channel; drops them when the receiver lags.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: Sender<StampedTransform>,
}

impl ChannelSink {
    /// Wrap the sending half of a bounded or unbounded channel.
    pub fn new(tx: Sender<StampedTransform>) -> Self {
        Self { tx }
    }
}

impl TransformSink for ChannelSink {
    fn send(&self, transform: &StampedTransform) {
        match self.tx.try_send(transform.clone()) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => log::debug!("[Frames] Transform channel full, dropped"),
            Err(TrySendError::Disconnected(_)) => {
                log::debug!("[Frames] Transform receiver gone")
            }
        }
    }
}

/// Keeps every published transform in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<StampedTransform>>,
}

impl RecordingSink {
    /// Empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// All transforms sent so far.
    pub fn transforms(&self) -> Vec<StampedTransform> {
        self.sent.lock().clone()
    }

    /// Most recent transform.
    pub fn last(&self) -> Option<StampedTransform> {
        self.sent.lock().last().cloned()
    }

    /// Number of transforms sent.
    pub fn len(&self) -> usize {
        self.sent.lock().len()
    }

    /// Whether nothing was sent yet.
    pub fn is_empty(&self) -> bool {
        self.sent.lock().is_empty()
    }
}

impl TransformSink for RecordingSink {
    fn send(&self, transform: &StampedTransform) {
        self.sent.lock().push(transform.clone());
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl TransformSink for NullSink {
    fn send(&self, _transform: &StampedTransform) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::pose::Pose2D;
    use crate::core::transform::isometry_from_pose;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    fn planar(x: f64, y: f64, yaw: f64) -> Isometry3<f64> {
        isometry_from_pose(&Pose2D::new(x, y, yaw))
    }

    #[test]
    fn test_identity_for_same_frame() {
        let buffer = TransformBuffer::new(0, 8);
        let t = buffer.lookup("odom", "odom", Some(5)).unwrap();
        assert_eq!(t, Isometry3::identity());
    }

    #[test]
    fn test_unknown_frame() {
        let buffer = TransformBuffer::new(0, 8);
        assert!(matches!(
            buffer.lookup("odom", "base_link", None),
            Err(LookupError::UnknownFrame { .. })
        ));
    }

    #[test]
    fn test_static_and_inverse() {
        let buffer = TransformBuffer::new(0, 8);
        buffer.set_static("base_link", "laser", planar(0.2, 0.0, 0.0));

        let t = buffer.lookup("base_link", "laser", Some(123)).unwrap();
        assert_relative_eq!(t.translation.vector.x, 0.2);

        let inv = buffer.lookup("laser", "base_link", None).unwrap();
        assert_relative_eq!(inv.translation.vector.x, -0.2);
    }

    #[test]
    fn test_interpolation_between_samples() {
        let buffer = TransformBuffer::new(0, 8);
        buffer.set_transform("odom", "base_link", 1_000, planar(0.0, 0.0, 0.0));
        buffer.set_transform("odom", "base_link", 2_000, planar(1.0, 2.0, 0.4));

        let t = buffer.lookup("odom", "base_link", Some(1_500)).unwrap();
        assert_relative_eq!(t.translation.vector, Vector3::new(0.5, 1.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(t.rotation.euler_angles().2, 0.2, epsilon = 1e-9);

        let latest = buffer.lookup("odom", "base_link", None).unwrap();
        assert_relative_eq!(latest.translation.vector.x, 1.0);
    }

    #[test]
    fn test_extrapolation_bounded_by_tolerance() {
        let buffer = TransformBuffer::new(100, 8);
        buffer.set_transform("odom", "base_link", 1_000, planar(0.0, 0.0, 0.0));
        buffer.set_transform("odom", "base_link", 2_000, planar(1.0, 0.0, 0.0));

        let t = buffer.lookup("odom", "base_link", Some(2_050)).unwrap();
        assert_relative_eq!(t.translation.vector.x, 1.0);
        let t = buffer.lookup("odom", "base_link", Some(950)).unwrap();
        assert_relative_eq!(t.translation.vector.x, 0.0);

        assert!(matches!(
            buffer.lookup("odom", "base_link", Some(2_101)),
            Err(LookupError::Extrapolation { .. })
        ));
        assert!(matches!(
            buffer.lookup("base_link", "odom", Some(10)),
            Err(LookupError::Extrapolation { .. })
        ));
    }

    #[test]
    fn test_history_is_bounded_and_ordered() {
        let buffer = TransformBuffer::new(0, 3);
        for i in 0..5u64 {
            buffer.set_transform("odom", "base_link", i * 10, planar(i as f64, 0.0, 0.0));
        }
        // Stale sample ignored
        buffer.set_transform("odom", "base_link", 5, planar(-1.0, 0.0, 0.0));

        assert!(buffer.lookup("odom", "base_link", Some(10)).is_err());
        let t = buffer.lookup("odom", "base_link", Some(35)).unwrap();
        assert_relative_eq!(t.translation.vector.x, 3.5, epsilon = 1e-12);
    }

    #[test]
    fn test_insert_stamped_transform() {
        let buffer = TransformBuffer::new(0, 4);
        let tf = StampedTransform::planar(77, "map", "odom", &Pose2D::new(1.0, 2.0, 0.5));
        buffer.insert(&tf);

        let t = buffer.lookup("map", "odom", Some(77)).unwrap();
        assert_relative_eq!(t.translation.vector.y, 2.0);
        assert_relative_eq!(t.rotation.euler_angles().2, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_sinks() {
        let recording = RecordingSink::new();
        let tf = StampedTransform::planar(1, "map", "odom", &Pose2D::identity());
        recording.send(&tf);
        assert_eq!(recording.len(), 1);
        assert_eq!(recording.last(), Some(tf.clone()));

        let (tx, rx) = crossbeam_channel::bounded(1);
        let channel = ChannelSink::new(tx);
        channel.send(&tf);
        channel.send(&tf); // full, dropped
        assert_eq!(rx.try_recv().unwrap(), tf);
        assert!(rx.try_recv().is_err());

        drop(rx);
        channel.send(&tf);
    }
}
