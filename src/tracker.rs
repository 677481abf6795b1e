//! Tracking engine: turns per-frame detections into persistent track identities.

pub mod appearance;
mod deep_sort;
mod detection;
mod kalman_filter;
mod matching;
mod rect;
mod track;
mod track_state;

pub use deep_sort::{Tracker, TrackerConfig};
pub use detection::{Detection, non_max_suppression};
pub use kalman_filter::{CHI2_INV95_4DOF, KalmanFilter};
pub use rect::Rect;
pub use track::{ActiveTrack, Track, TrackId};
pub use track_state::TrackState;
