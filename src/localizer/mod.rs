//! Localizer: fusion state, frame seams and the update handlers.
//!
//! - [`state`]: offset, confidence and the active map surface
//! - [`frames`]: transform lookup / broadcast traits and in-memory impls
//! - [`node`]: [`Localizer`] with `on_scan`, `on_map`, `on_pose_estimate`

pub mod frames;
pub mod node;
pub mod state;

pub use frames::{
    ChannelSink, NullSink, RecordingSink, TransformBuffer, TransformLookup, TransformSink,
};
pub use node::{scan_points, Localizer, LocalizerStatus, ScanUpdate};
pub use state::{FusionParams, FusionState};
