//! End-to-end localization on simulated drives.
//!
//! A drifting odometry source and a ray-cast lidar drive an arc through a
//! small room; the localizer must keep the map←odom offset close to truth.

mod common;

use std::io::Write;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use sthiti::config::LocalizerConfig;
use sthiti::threads::{create_event_channel, LocalizerEvent, LocalizerThread};
use sthiti::{LocalizeError, Pose2D};

/// Loose bound: ray-cast hits land on wall faces, not wall centres.
const MAX_TRANS_ERROR_M: f64 = 0.1;
const MAX_ROT_ERROR_RAD: f64 = 0.05;

#[test]
fn test_tracks_drifting_odometry() {
    let harness = common::Harness::new(common::seeded_config(11));
    let mut drive = common::arc_drive(common::room(), 5);
    harness
        .localizer
        .on_map(&drive.world().to_message())
        .unwrap();

    let start = drive.current();
    harness.publish_odom(&start);
    harness.set_pose(&start, &start.truth);

    let mut last = start;
    for frame in drive.take(150) {
        harness.publish_odom(&frame);
        harness.localizer.on_scan(&frame.scan).unwrap();
        last = frame;
    }

    let offset = harness.localizer.offset().data;
    let (trans, rot) = common::offset_error(&offset, &last.true_offset());
    assert!(trans < MAX_TRANS_ERROR_M, "translation error {}", trans);
    assert!(rot < MAX_ROT_ERROR_RAD, "rotation error {}", rot);

    let status = harness.localizer.status();
    assert_eq!(status.scans_accepted, 150);
    assert_eq!(status.scans_rejected, 0);
    assert!(status.confidence > 0.5);
    assert!(status.confidence <= 0.95);
    // Pose estimate plus one broadcast per scan
    assert_eq!(harness.sink.len(), 151);
}

#[test]
fn test_recovers_from_initial_pose_error() {
    let harness = common::Harness::new(common::seeded_config(3));
    let mut drive = common::arc_drive(common::room(), 9);
    harness
        .localizer
        .on_map(&drive.world().to_message())
        .unwrap();

    let start = drive.current();
    harness.publish_odom(&start);
    let guess = Pose2D::new(start.truth.x + 0.15, start.truth.y - 0.1, start.truth.yaw + 0.05);
    harness.set_pose(&start, &guess);

    let (initial, _) = common::offset_error(&harness.localizer.offset().data, &start.true_offset());

    let mut last = start;
    for frame in drive.take(80) {
        harness.publish_odom(&frame);
        harness.localizer.on_scan(&frame.scan).unwrap();
        last = frame;
    }

    let (trans, rot) = common::offset_error(&harness.localizer.offset().data, &last.true_offset());
    assert!(trans < initial, "{} !< {}", trans, initial);
    assert!(trans < MAX_TRANS_ERROR_M, "translation error {}", trans);
    assert!(rot < MAX_ROT_ERROR_RAD, "rotation error {}", rot);
}

#[test]
fn test_scans_before_map_are_rejected() {
    let harness = common::Harness::new(common::seeded_config(1));
    let mut drive = common::arc_drive(common::room(), 1);
    let start = drive.current();
    harness.publish_odom(&start);

    let frame = drive.step();
    harness.publish_odom(&frame);
    assert_eq!(
        harness.localizer.on_scan(&frame.scan).unwrap_err(),
        LocalizeError::NoMap
    );

    harness
        .localizer
        .on_map(&drive.world().to_message())
        .unwrap();
    let frame = drive.step();
    harness.publish_odom(&frame);
    assert!(harness.localizer.on_scan(&frame.scan).is_ok());

    let status = harness.localizer.status();
    assert_eq!(status.scans_rejected, 1);
    assert_eq!(status.scans_accepted, 1);
}

#[test]
fn test_map_swap_resets_confidence() {
    let harness = common::Harness::new(common::seeded_config(2));
    let mut drive = common::arc_drive(common::room(), 2);
    harness
        .localizer
        .on_map(&drive.world().to_message())
        .unwrap();
    let start = drive.current();
    harness.publish_odom(&start);
    harness.set_pose(&start, &start.truth);

    for frame in drive.by_ref().take(10) {
        harness.publish_odom(&frame);
        harness.localizer.on_scan(&frame.scan).unwrap();
    }
    assert!(harness.localizer.confidence() > 0.0);
    let offset = harness.localizer.offset();

    harness
        .localizer
        .on_map(&drive.world().to_message())
        .unwrap();
    assert_eq!(harness.localizer.confidence(), 0.0);
    // Offset survives the swap
    assert_eq!(harness.localizer.offset(), offset);
}

#[test]
fn test_config_file_frames_and_broadcast() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
broadcast_tf = false

[frames]
base_frame = "base_footprint"
odom_frame = "wheel_odom"

[search]
sample_rate = 4
seed = 21

[map]
downscale = 1
num_smooth = 3
"#
    )
    .unwrap();

    let config = LocalizerConfig::load(file.path()).unwrap();
    assert_eq!(config.frames.base_frame, "base_footprint");
    assert_eq!(config.frames.map_frame, "map");

    let harness = common::Harness::new(config);
    let mut drive = common::arc_drive(common::room(), 4);
    harness
        .localizer
        .on_map(&drive.world().to_message())
        .unwrap();
    assert_eq!(harness.localizer.status().map_size, 40);

    let start = drive.current();
    harness.publish_odom(&start);
    harness.set_pose(&start, &start.truth);
    for frame in drive.by_ref().take(5) {
        harness.publish_odom(&frame);
        harness.localizer.on_scan(&frame.scan).unwrap();
    }

    assert_eq!(harness.localizer.status().scans_accepted, 5);
    assert!(harness.sink.is_empty());
}

#[test]
fn test_threaded_pipeline() {
    let harness = common::Harness::new(common::seeded_config(8));
    let mut drive = common::arc_drive(common::room(), 8);

    let start = drive.current();
    harness.publish_odom(&start);
    harness.set_pose(&start, &start.truth);

    let (tx, rx) = create_event_channel();
    tx.send(LocalizerEvent::Map(drive.world().to_message()))
        .unwrap();
    let mut sent = 0;
    for frame in drive.by_ref().take(20) {
        harness.publish_odom(&frame);
        tx.send(LocalizerEvent::Scan(frame.scan)).unwrap();
        sent += 1;
    }
    drop(tx);

    let running = Arc::new(AtomicBool::new(true));
    let worker = LocalizerThread::spawn(harness.localizer.clone(), rx, running).unwrap();
    let stats = worker.join().unwrap();

    assert_eq!(stats.maps_applied, 1);
    assert_eq!(stats.scans_processed + stats.scans_dropped, sent);
    assert_eq!(stats.scans_failed, 0);
    assert!(stats.scans_processed >= 1);
    assert_eq!(
        harness.localizer.status().scans_accepted,
        stats.scans_processed
    );
    // Pose estimate plus one broadcast per processed scan
    assert_eq!(harness.sink.len() as u64, stats.scans_processed + 1);
}
