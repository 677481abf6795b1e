//! A single tracked identity and its kinematic/appearance state.

use ndarray::{Array1, Array2};

use crate::error::Result;
use crate::tracker::appearance::{Descriptor, Gallery};
use crate::tracker::detection::Detection;
use crate::tracker::kalman_filter::KalmanFilter;
use crate::tracker::rect::Rect;
use crate::tracker::track_state::TrackState;

/// Track identifiers are allocated from 1 upwards and never reused within a tracker.
pub type TrackId = u64;

/// Lifecycle thresholds copied into every track.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Lifecycle {
    pub n_init: u32,
    pub max_age: u32,
    pub nn_budget: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct Track {
    pub track_id: TrackId,
    pub state: TrackState,
    /// Frames since creation.
    pub age: u32,
    /// Frames with a matched detection, creation included.
    pub hits: u32,
    /// Frames since the last matched detection.
    pub time_since_update: u32,
    /// Confidence of the last matched detection.
    pub confidence: f32,
    /// Class of the last matched detection.
    pub class_id: u32,
    mean: Array1<f64>,
    covariance: Array2<f64>,
    gallery: Gallery,
    lifecycle: Lifecycle,
}

/// Read-only view of a track emitted once per frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActiveTrack {
    pub track_id: TrackId,
    pub state: TrackState,
    pub bbox: Rect,
    pub confidence: f32,
    pub class_id: u32,
    pub age: u32,
    pub hits: u32,
    pub time_since_update: u32,
}

impl ActiveTrack {
    pub fn is_confirmed(&self) -> bool {
        self.state == TrackState::Confirmed
    }
}

impl Track {
    pub(crate) fn new(
        track_id: TrackId,
        detection: &Detection,
        descriptor: Option<Descriptor>,
        kalman_filter: &KalmanFilter,
        lifecycle: Lifecycle,
    ) -> Self {
        let (mean, covariance) = kalman_filter.initiate(detection.bbox.to_xyah_f64());
        let mut gallery = Gallery::new(lifecycle.nn_budget);
        if let Some(d) = descriptor {
            gallery.push(d);
        }

        let mut track = Self {
            track_id,
            state: TrackState::Tentative,
            age: 1,
            hits: 1,
            time_since_update: 0,
            confidence: detection.confidence,
            class_id: detection.class_id,
            mean,
            covariance,
            gallery,
            lifecycle,
        };
        track.promote_if_ready();
        track
    }

    /// Current filtered bounding box.
    pub fn bbox(&self) -> Rect {
        Rect::from_xyah(
            self.mean[0] as f32,
            self.mean[1] as f32,
            self.mean[2] as f32,
            self.mean[3] as f32,
        )
    }

    pub fn is_tentative(&self) -> bool {
        self.state == TrackState::Tentative
    }

    pub fn is_confirmed(&self) -> bool {
        self.state == TrackState::Confirmed
    }

    pub fn is_deleted(&self) -> bool {
        self.state == TrackState::Deleted
    }

    /// Propagate the motion state one frame ahead.
    pub fn predict(&mut self, kalman_filter: &KalmanFilter) {
        let (mean, covariance) = kalman_filter.predict(&self.mean, &self.covariance);
        self.mean = mean;
        self.covariance = covariance;
        self.age += 1;
        self.time_since_update += 1;
    }

    /// Fold a matched detection into the track.
    pub fn update(
        &mut self,
        kalman_filter: &KalmanFilter,
        detection: &Detection,
        descriptor: Option<Descriptor>,
    ) -> Result<()> {
        let (mean, covariance) =
            kalman_filter.update(&self.mean, &self.covariance, detection.bbox.to_xyah_f64())?;
        self.mean = mean;
        self.covariance = covariance;
        if let Some(d) = descriptor {
            self.gallery.push(d);
        }
        self.confidence = detection.confidence;
        self.class_id = detection.class_id;
        self.hits += 1;
        self.time_since_update = 0;
        self.promote_if_ready();
        Ok(())
    }

    /// Record a frame without a match.
    pub fn mark_missed(&mut self) {
        if self.is_tentative() || self.time_since_update > self.lifecycle.max_age {
            self.state = TrackState::Deleted;
        }
    }

    pub fn gating_distance(&self, kalman_filter: &KalmanFilter, detection: &Detection) -> Result<f64> {
        kalman_filter.gating_distance(&self.mean, &self.covariance, detection.bbox.to_xyah_f64())
    }

    /// Smallest cosine distance to the gallery, or `None` when either side
    /// has no descriptor.
    pub fn appearance_distance(&self, descriptor: Option<&Descriptor>) -> Option<f32> {
        descriptor.and_then(|d| self.gallery.min_distance(d))
    }

    pub fn snapshot(&self) -> ActiveTrack {
        ActiveTrack {
            track_id: self.track_id,
            state: self.state,
            bbox: self.bbox(),
            confidence: self.confidence,
            class_id: self.class_id,
            age: self.age,
            hits: self.hits,
            time_since_update: self.time_since_update,
        }
    }

    fn promote_if_ready(&mut self) {
        if self.is_tentative() && self.hits >= self.lifecycle.n_init {
            self.state = TrackState::Confirmed;
        }
    }

    /// Zero height, zero velocity, zero uncertainty: the next projected
    /// covariance is singular.
    #[cfg(test)]
    pub(crate) fn collapse(&mut self) {
        self.mean.fill(0.0);
        self.covariance.fill(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lifecycle() -> Lifecycle {
        Lifecycle {
            n_init: 3,
            max_age: 2,
            nn_budget: Some(10),
        }
    }

    fn det() -> Detection {
        Detection::new(100.0, 100.0, 150.0, 200.0, 0.9, 0)
    }

    #[test]
    fn test_new_track_is_tentative() {
        let kf = KalmanFilter::new();
        let track = Track::new(7, &det(), None, &kf, lifecycle());
        assert_eq!(track.track_id, 7);
        assert!(track.is_tentative());
        assert_eq!((track.age, track.hits, track.time_since_update), (1, 1, 0));
        let bbox = track.bbox();
        assert!((bbox.x - 100.0).abs() < 1e-3 && (bbox.height - 100.0).abs() < 1e-3);
    }

    #[test]
    fn test_confirmed_after_n_init_hits() {
        let kf = KalmanFilter::new();
        let mut track = Track::new(1, &det(), None, &kf, lifecycle());
        for _ in 0..2 {
            track.predict(&kf);
            track.update(&kf, &det(), None).unwrap();
        }
        assert!(track.is_confirmed());
        assert_eq!(track.hits, 3);
    }

    #[test]
    fn test_n_init_of_one_confirms_immediately() {
        let kf = KalmanFilter::new();
        let lifecycle = Lifecycle {
            n_init: 1,
            ..lifecycle()
        };
        assert!(Track::new(1, &det(), None, &kf, lifecycle).is_confirmed());
    }

    #[test]
    fn test_tentative_deleted_on_first_miss() {
        let kf = KalmanFilter::new();
        let mut track = Track::new(1, &det(), None, &kf, lifecycle());
        track.predict(&kf);
        track.mark_missed();
        assert!(track.is_deleted());
    }

    #[test]
    fn test_confirmed_survives_up_to_max_age() {
        let kf = KalmanFilter::new();
        let mut track = Track::new(1, &det(), None, &kf, lifecycle());
        for _ in 0..2 {
            track.predict(&kf);
            track.update(&kf, &det(), None).unwrap();
        }
        for _ in 0..2 {
            track.predict(&kf);
            track.mark_missed();
            assert!(track.is_confirmed());
        }
        assert_eq!(track.time_since_update, 2);
        track.predict(&kf);
        track.mark_missed();
        assert!(track.is_deleted());
    }
}
