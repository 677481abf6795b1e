//! DeepSORT-style tracking engine: predicts, associates, ages and spawns tracks.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::error::Result;
use crate::frame::Frame;
use crate::tracker::appearance::{self, Descriptor};
use crate::tracker::detection::{Detection, non_max_suppression};
use crate::tracker::kalman_filter::KalmanFilter;
use crate::tracker::matching::{self, GateParams};
use crate::tracker::track::{ActiveTrack, Lifecycle, Track, TrackId};

/// Configuration for the [`Tracker`].
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Misses a confirmed track survives; deleted once `time_since_update > max_age`.
    pub max_age: u32,
    /// Consecutive matched frames before a tentative track is confirmed.
    pub n_init: u32,
    pub max_cosine_distance: f32,
    /// Acceptance threshold of the IoU fallback association.
    pub max_iou_distance: f32,
    /// IoU above which weaker detections are suppressed; `1.0` disables NMS.
    pub nms_max_overlap: f32,
    /// Descriptors kept per track; `None` keeps all of them.
    pub nn_budget: Option<usize>,
    /// Share of the normalised Mahalanobis distance in the association cost.
    pub motion_weight: f32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            max_age: 30,
            n_init: 3,
            max_cosine_distance: 0.4,
            max_iou_distance: 0.7,
            nms_max_overlap: 1.0,
            nn_budget: Some(100),
            motion_weight: 0.1,
        }
    }
}

impl TrackerConfig {
    fn lifecycle(&self) -> Lifecycle {
        Lifecycle {
            n_init: self.n_init,
            max_age: self.max_age,
            nn_budget: self.nn_budget,
        }
    }

    fn gate(&self) -> GateParams {
        GateParams {
            max_cosine_distance: self.max_cosine_distance,
            motion_weight: self.motion_weight,
        }
    }
}

/// Association of track ids with detection indices for one frame.
#[derive(Debug, Default)]
struct Association {
    matches: Vec<(TrackId, usize)>,
    unmatched_tracks: Vec<TrackId>,
    unmatched_detections: Vec<usize>,
}

/// The tracking engine. Owns the track store exclusively.
pub struct Tracker {
    /// Track store, keyed and therefore ordered by creation.
    tracks: BTreeMap<TrackId, Track>,
    next_id: TrackId,
    frame_count: u64,
    config: TrackerConfig,
    kalman_filter: KalmanFilter,
}

impl Tracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            tracks: BTreeMap::new(),
            next_id: 1,
            frame_count: 0,
            config,
            kalman_filter: KalmanFilter::default(),
        }
    }

    /// Frames processed so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Number of tracks currently in the store.
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn track(&self, track_id: TrackId) -> Option<&Track> {
        self.tracks.get(&track_id)
    }

    /// Process one frame. `detections` may be empty; every frame must be fed
    /// so that missed tracks age. Returns the surviving tracks in creation order.
    pub fn update(&mut self, detections: &[Detection], frame: &Frame) -> Vec<ActiveTrack> {
        self.frame_count += 1;

        let detections = self.sanitize(detections);
        let descriptors: Vec<Option<Descriptor>> = detections
            .iter()
            .map(|d| appearance::describe(frame, &d.bbox))
            .collect();

        for track in self.tracks.values_mut() {
            track.predict(&self.kalman_filter);
        }

        let association = match self.associate(&detections, &descriptors) {
            Ok(association) => association,
            Err(e) => {
                warn!(
                    frame = self.frame_count,
                    error = %e,
                    dropped = detections.len(),
                    "Association failed; dropping this frame's detections"
                );
                Association {
                    unmatched_tracks: self.tracks.keys().copied().collect(),
                    ..Association::default()
                }
            }
        };

        for (track_id, det_idx) in association.matches {
            if let Some(track) = self.tracks.get_mut(&track_id) {
                let descriptor = descriptors[det_idx].clone();
                if let Err(e) = track.update(&self.kalman_filter, &detections[det_idx], descriptor) {
                    warn!(track_id, error = %e, "Track update failed; treating as a miss");
                    track.mark_missed();
                }
            }
        }

        for track_id in association.unmatched_tracks {
            if let Some(track) = self.tracks.get_mut(&track_id) {
                track.mark_missed();
            }
        }

        for det_idx in association.unmatched_detections {
            self.initiate(&detections[det_idx], descriptors[det_idx].clone());
        }

        self.tracks.retain(|track_id, track| {
            if track.is_deleted() {
                debug!(track_id = *track_id, age = track.age, hits = track.hits, "Track deleted");
            }
            !track.is_deleted()
        });

        self.tracks.values().map(Track::snapshot).collect()
    }

    /// Drop malformed detections and apply non-maximum suppression.
    fn sanitize(&self, detections: &[Detection]) -> Vec<Detection> {
        let valid = detections
            .iter()
            .filter(|d| match d.validate() {
                Ok(()) => true,
                Err(e) => {
                    warn!(frame = self.frame_count, error = %e, "Dropping detection");
                    false
                }
            })
            .copied()
            .collect();
        non_max_suppression(valid, self.config.nms_max_overlap)
    }

    /// Two-stage association: gated motion/appearance assignment over every
    /// track, then IoU assignment for tracks that were matched last frame.
    fn associate(
        &self,
        detections: &[Detection],
        descriptors: &[Option<Descriptor>],
    ) -> Result<Association> {
        let ids: Vec<TrackId> = self.tracks.keys().copied().collect();
        let tracks: Vec<&Track> = self.tracks.values().collect();

        let gate = self.config.gate();
        let cost = matching::gated_cost(&self.kalman_filter, &tracks, detections, descriptors, &gate)?;
        let first = matching::linear_assignment(&cost, gate.max_cost())?;

        let mut association = Association {
            matches: first.matches.iter().map(|&(i, j)| (ids[i], j)).collect(),
            ..Association::default()
        };

        let (recent, stale): (Vec<usize>, Vec<usize>) = first
            .unmatched_tracks
            .iter()
            .copied()
            .partition(|&i| tracks[i].time_since_update == 1);
        association.unmatched_tracks.extend(stale.iter().map(|&i| ids[i]));

        let candidates: Vec<&Track> = recent.iter().map(|&i| tracks[i]).collect();
        let remaining: Vec<Detection> = first
            .unmatched_detections
            .iter()
            .map(|&j| detections[j])
            .collect();
        let second = matching::linear_assignment(
            &matching::iou_cost(&candidates, &remaining),
            f64::from(self.config.max_iou_distance),
        )?;

        association.matches.extend(
            second
                .matches
                .iter()
                .map(|&(i, j)| (ids[recent[i]], first.unmatched_detections[j])),
        );
        association
            .unmatched_tracks
            .extend(second.unmatched_tracks.iter().map(|&i| ids[recent[i]]));
        association.unmatched_detections = second
            .unmatched_detections
            .iter()
            .map(|&j| first.unmatched_detections[j])
            .collect();

        Ok(association)
    }

    fn initiate(&mut self, detection: &Detection, descriptor: Option<Descriptor>) {
        let track_id = self.next_id;
        self.next_id += 1;
        debug!(track_id, frame = self.frame_count, "Track created");
        let track = Track::new(
            track_id,
            detection,
            descriptor,
            &self.kalman_filter,
            self.config.lifecycle(),
        );
        self.tracks.insert(track_id, track);
    }
}

impl Default for Tracker {
    fn default() -> Self {
        Self::new(TrackerConfig::default())
    }
}
