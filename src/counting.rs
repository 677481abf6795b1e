//! Unique-count accumulator: turns per-frame active tracks into a running
//! total of objects ever seen.

use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::info;

use crate::tracker::{ActiveTrack, TrackId};

/// Shared, read-only view of the running total.
///
/// Cloning is cheap and every clone observes the same value. Only the
/// [`UniqueCounter`] that created the handle can change it.
#[derive(Debug, Clone, Default)]
pub struct RunningTotal {
    inner: Arc<AtomicU64>,
}

impl RunningTotal {
    #[inline]
    pub fn get(&self) -> u64 {
        self.inner.load(Ordering::SeqCst)
    }

    fn increment(&self) -> u64 {
        self.inner.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn reset(&self) {
        self.inner.store(0, Ordering::SeqCst);
    }
}

/// When a track starts counting toward the total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CountPolicy {
    /// Count the first frame a track appears, tentative or not.
    #[default]
    FirstSight,
    /// Count only once the track is confirmed.
    Confirmed,
}

impl FromStr for CountPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "first-sight" | "first_sight" | "firstsight" => Ok(Self::FirstSight),
            "confirmed" => Ok(Self::Confirmed),
            other => Err(format!(
                "unknown count policy '{other}', expected 'first-sight' or 'confirmed'"
            )),
        }
    }
}

/// Emitted the frame a track is counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountEvent {
    pub track_id: TrackId,
    pub new_total: u64,
}

#[derive(Debug, Default)]
pub struct UniqueCounter {
    counted: HashSet<TrackId>,
    total: RunningTotal,
    policy: CountPolicy,
}

impl UniqueCounter {
    pub fn new(policy: CountPolicy) -> Self {
        Self {
            counted: HashSet::new(),
            total: RunningTotal::default(),
            policy,
        }
    }

    /// Count every track not seen before. A track id is counted at most once
    /// over the lifetime of the counter, resets included.
    pub fn observe(&mut self, tracks: &[ActiveTrack]) -> Vec<CountEvent> {
        let mut events = Vec::new();
        for track in tracks {
            if self.policy == CountPolicy::Confirmed && !track.is_confirmed() {
                continue;
            }
            if self.counted.insert(track.track_id) {
                let new_total = self.total.increment();
                info!(
                    track_id = track.track_id,
                    total = new_total,
                    "Detection: Track ID {}, Total Trash Detected: {}",
                    track.track_id,
                    new_total
                );
                events.push(CountEvent {
                    track_id: track.track_id,
                    new_total,
                });
            }
        }
        events
    }

    /// Start a new counting epoch: the total drops to 0, counted ids are kept.
    pub fn reset(&mut self) {
        self.total.reset();
    }

    pub fn total(&self) -> u64 {
        self.total.get()
    }

    /// Handle for readers on other threads.
    pub fn handle(&self) -> RunningTotal {
        self.total.clone()
    }

    /// Number of distinct ids counted since start-up.
    pub fn counted_ids(&self) -> usize {
        self.counted.len()
    }

    pub fn has_counted(&self, track_id: TrackId) -> bool {
        self.counted.contains(&track_id)
    }
}
