//! Sthiti demo daemon
//!
//! Replays a simulated drive through a synthetic room and localizes it
//! against the room's map on a dedicated thread.
//!
//! # Usage
//!
//! ```bash
//! # With default config
//! cargo run --release
//!
//! # With a config file and a longer drive
//! cargo run --release -- --config configs/sthiti.toml --scans 1000
//! ```

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use nalgebra::Isometry3;

use sthiti::config::LocalizerConfig;
use sthiti::core::math::shortest_angular_distance;
use sthiti::core::transform::isometry_from_pose;
use sthiti::localizer::{ChannelSink, Localizer, TransformBuffer};
use sthiti::sim::{LidarModel, OdometryDrift, SimDrive, SimWorld};
use sthiti::threads::{create_event_channel, LocalizerEvent, LocalizerThread};
use sthiti::{Pose2D, PoseEstimate};

const DEFAULT_CONFIG_PATHS: [&str; 2] = ["sthiti.toml", "/etc/sthiti.toml"];
const LASER_FRAME: &str = "laser";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path (defaults: ./sthiti.toml, /etc/sthiti.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of scans to replay
    #[arg(short, long, default_value = "300")]
    scans: usize,

    /// Simulation seed (noise, odometry drift)
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Scan period in milliseconds
    #[arg(long, default_value = "100")]
    period_ms: u64,

    /// Replay speed factor (0 = as fast as possible)
    #[arg(long, default_value = "10.0")]
    speed: f64,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {} - {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => match LocalizerConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                log::error!("Failed to load {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => LocalizerConfig::load_or_default(&DEFAULT_CONFIG_PATHS),
    };

    log::info!("sthiti starting");
    log::info!(
        "  Map: downscale {} smooth {}",
        config.map.downscale,
        config.map.num_smooth
    );
    log::info!(
        "  Search: {} samples, {} solver iterations",
        config.search.sample_rate,
        config.solver.iterations
    );
    log::info!("  Drive: {} scans, seed {}", args.scans, args.seed);

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        r.store(false, Ordering::Relaxed);
    }) {
        log::error!("Error setting Ctrl-C handler: {}", e);
    }

    match run(&config, &args, running) {
        Ok(()) => {
            log::info!("sthiti shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("Daemon error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(
    config: &LocalizerConfig,
    args: &Args,
    running: Arc<AtomicBool>,
) -> Result<(), Box<dyn std::error::Error>> {
    let frames = &config.frames;

    // 1. World: a room with one box so the scene is not rotationally symmetric
    let mut world = SimWorld::room(80, 0.05, 3);
    world.add_box((0.6, 2.6), (1.0, 3.2));
    let map_msg = world.to_message();

    // 2. Frame seams
    let buffer = Arc::new(TransformBuffer::new(
        config.transforms.tolerance_ms * 1000,
        config.transforms.history_len,
    ));
    buffer.set_static(&frames.base_frame, LASER_FRAME, Isometry3::identity());
    let (tf_tx, tf_rx) = crossbeam_channel::bounded(64);
    let sink = Arc::new(ChannelSink::new(tf_tx));

    let localizer = Arc::new(Localizer::new(config.clone(), buffer.clone(), sink)?);

    // 3. Drive
    let start = Pose2D::new(2.0, 1.2, 0.0);
    let mut drive = SimDrive::new(
        world,
        LidarModel {
            range_stddev: 0.01,
            miss_rate: 0.02,
            ..LidarModel::default()
        },
        OdometryDrift::default(),
        start,
        Pose2D::new(0.02, 0.0, 0.025),
        args.period_ms * 1000,
        LASER_FRAME,
        args.seed,
    );

    let first = drive.current();
    buffer.set_transform(
        &frames.odom_frame,
        &frames.base_frame,
        first.stamp_us,
        isometry_from_pose(&first.odom),
    );

    // The initial pose is applied before any odometry moves, so the offset
    // is anchored at tick 0.
    localizer.on_pose_estimate(&PoseEstimate::planar(
        first.stamp_us,
        frames.map_frame.as_str(),
        &first.truth,
    ))?;

    // 4. Worker
    let (events_tx, events_rx) = create_event_channel();
    let worker = LocalizerThread::spawn(localizer.clone(), events_rx, running.clone())?;
    events_tx.send(LocalizerEvent::Map(map_msg))?;

    let tick = if args.speed > 0.0 {
        Some(Duration::from_secs_f64(
            args.period_ms as f64 / 1000.0 / args.speed,
        ))
    } else {
        None
    };

    let mut last = first;
    for frame in drive.take(args.scans) {
        if !running.load(Ordering::Relaxed) {
            break;
        }
        buffer.set_transform(
            &frames.odom_frame,
            &frames.base_frame,
            frame.stamp_us,
            isometry_from_pose(&frame.odom),
        );
        events_tx.send(LocalizerEvent::Scan(frame.scan.clone()))?;

        for tf in tf_rx.try_iter() {
            log::debug!(
                "map->odom @{}us: ({:.3}, {:.3})",
                tf.stamp_us,
                tf.translation.x,
                tf.translation.y
            );
        }
        if let Some(tick) = tick {
            std::thread::sleep(tick);
        }
        last = frame;
    }

    // 5. Shutdown
    drop(events_tx);
    let stats = worker
        .join()
        .map_err(|_| "localizer thread panicked".to_string())?;

    let status = localizer.status();
    let offset = status.offset.data;
    let truth = last.true_offset();
    let dx = offset.x - truth.x;
    let dy = offset.y - truth.y;

    log::info!(
        "Scans: {} processed, {} dropped, {} failed",
        stats.scans_processed,
        stats.scans_dropped,
        stats.scans_failed
    );
    log::info!(
        "Final offset ({:.3}, {:.3}, {:.3}), truth ({:.3}, {:.3}, {:.3})",
        offset.x,
        offset.y,
        offset.yaw,
        truth.x,
        truth.y,
        truth.yaw
    );
    log::info!(
        "Error: {:.3}m / {:.2}deg, confidence {:.3}",
        dx.hypot(dy),
        shortest_angular_distance(truth.yaw, offset.yaw)
            .abs()
            .to_degrees(),
        status.confidence
    );
    Ok(())
}
