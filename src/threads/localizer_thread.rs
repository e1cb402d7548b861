//! Localizer thread: drains events from a channel into a [`Localizer`].
//!
//! Scans are handled newest-first: when several scans are queued, only the
//! latest one is matched and the rest are counted as dropped. Map and pose
//! events are never dropped and keep their arrival order.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{select, Receiver, Sender};

use crate::core::messages::{LaserScan, OccupancyGridMsg, PoseEstimate};
use crate::localizer::Localizer;

/// Input event for the localizer thread.
#[derive(Debug, Clone)]
pub enum LocalizerEvent {
    /// Range scan to match
    Scan(LaserScan),
    /// Replacement map
    Map(OccupancyGridMsg),
    /// External pose reset
    PoseEstimate(PoseEstimate),
}

/// Sender half for localizer events.
pub type EventSender = Sender<LocalizerEvent>;

/// Create the event channel.
pub fn create_event_channel() -> (EventSender, Receiver<LocalizerEvent>) {
    crossbeam_channel::unbounded()
}

/// Counters reported when the thread exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ThreadStats {
    /// Scans handed to the localizer
    pub scans_processed: u64,
    /// Scans superseded by a newer queued scan
    pub scans_dropped: u64,
    /// Scans the localizer rejected
    pub scans_failed: u64,
    /// Map messages applied
    pub maps_applied: u64,
    /// Pose estimates applied
    pub poses_applied: u64,
}

/// Handle to the localizer worker thread.
pub struct LocalizerThread {
    handle: JoinHandle<ThreadStats>,
}

impl LocalizerThread {
    /// Spawn the worker.
    ///
    /// It stops when `running` clears or every sender has been dropped.
    pub fn spawn(
        localizer: Arc<Localizer>,
        events: Receiver<LocalizerEvent>,
        running: Arc<AtomicBool>,
    ) -> std::io::Result<Self> {
        let handle = thread::Builder::new()
            .name("localizer".into())
            .spawn(move || run_loop(&localizer, &events, &running))?;
        Ok(Self { handle })
    }

    /// Wait for the thread to finish.
    pub fn join(self) -> thread::Result<ThreadStats> {
        self.handle.join()
    }
}

fn run_loop(
    localizer: &Localizer,
    events: &Receiver<LocalizerEvent>,
    running: &AtomicBool,
) -> ThreadStats {
    log::info!("Localizer thread starting");
    let mut stats = ThreadStats::default();

    while running.load(Ordering::Relaxed) {
        select! {
            recv(events) -> msg => {
                let Ok(first) = msg else {
                    log::info!("Event channel closed");
                    break;
                };
                let mut batch = vec![first];
                batch.extend(events.try_iter());

                let (batch, dropped) = coalesce(batch);
                stats.scans_dropped += dropped;
                if dropped > 0 {
                    log::debug!("Dropped {} stale scans", dropped);
                }
                for event in batch {
                    dispatch(localizer, event, &mut stats);
                }
            }
            default(Duration::from_millis(10)) => {}
        }
    }

    log::info!(
        "Localizer thread stopped: {} scans processed, {} dropped, {} failed",
        stats.scans_processed,
        stats.scans_dropped,
        stats.scans_failed
    );
    stats
}

/// Keep only the newest scan of a batch; other events pass through in order.
pub fn coalesce(batch: Vec<LocalizerEvent>) -> (Vec<LocalizerEvent>, u64) {
    let last_scan = batch
        .iter()
        .rposition(|e| matches!(e, LocalizerEvent::Scan(_)));

    let mut dropped = 0;
    let kept = batch
        .into_iter()
        .enumerate()
        .filter_map(|(i, event)| match event {
            LocalizerEvent::Scan(_) if Some(i) != last_scan => {
                dropped += 1;
                None
            }
            other => Some(other),
        })
        .collect();

    (kept, dropped)
}

fn dispatch(localizer: &Localizer, event: LocalizerEvent, stats: &mut ThreadStats) {
    match event {
        LocalizerEvent::Scan(scan) => {
            stats.scans_processed += 1;
            if localizer.on_scan(&scan).is_err() {
                stats.scans_failed += 1;
            }
        }
        LocalizerEvent::Map(map) => {
            if localizer.on_map(&map).is_ok() {
                stats.maps_applied += 1;
            }
        }
        LocalizerEvent::PoseEstimate(estimate) => {
            if localizer.on_pose_estimate(&estimate).is_ok() {
                stats.poses_applied += 1;
            }
        }
    }
}
