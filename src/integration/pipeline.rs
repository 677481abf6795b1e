//! TrackerPipeline: detection, tracking and unique counting for one frame.

use crate::counting::{CountEvent, CountPolicy, RunningTotal, UniqueCounter};
use crate::error::Result;
use crate::frame::Frame;
use crate::tracker::{ActiveTrack, Tracker, TrackerConfig};

use super::Detector;

/// Outcome of one processed frame.
#[derive(Debug, Clone)]
pub struct FrameReport {
    /// 1-based index of the frame within this pipeline.
    pub frame_index: u64,
    pub tracks: Vec<ActiveTrack>,
    /// Tracks counted for the first time on this frame.
    pub events: Vec<CountEvent>,
    /// Running total after counting this frame.
    pub total: u64,
}

/// Bundles a [`Detector`] with the [`Tracker`] and the [`UniqueCounter`].
pub struct TrackerPipeline<D: Detector> {
    detector: D,
    tracker: Tracker,
    counter: UniqueCounter,
}

impl<D: Detector> TrackerPipeline<D> {
    pub fn new(detector: D, config: TrackerConfig, policy: CountPolicy) -> Self {
        Self {
            detector,
            tracker: Tracker::new(config),
            counter: UniqueCounter::new(policy),
        }
    }

    pub fn with_default_config(detector: D) -> Self {
        Self::new(detector, TrackerConfig::default(), CountPolicy::default())
    }

    /// Detect, track and count one frame. Only detector failures propagate;
    /// tracking never fails the frame.
    pub fn process_frame(&mut self, frame: &Frame) -> Result<FrameReport> {
        let detections = self.detector.detect(frame)?;
        let tracks = self.tracker.update(&detections, frame);
        let events = self.counter.observe(&tracks);
        Ok(FrameReport {
            frame_index: self.tracker.frame_count(),
            tracks,
            events,
            total: self.counter.total(),
        })
    }

    /// Handle for readers of the running total.
    pub fn total(&self) -> RunningTotal {
        self.counter.handle()
    }

    pub fn detector(&self) -> &D {
        &self.detector
    }

    pub fn tracker(&self) -> &Tracker {
        &self.tracker
    }

    pub fn counter_mut(&mut self) -> &mut UniqueCounter {
        &mut self.counter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MonitorError;
    use crate::integration::ScriptedDetector;
    use crate::tracker::Detection;

    struct FailingDetector;

    impl Detector for FailingDetector {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn detect(&mut self, _frame: &Frame) -> Result<Vec<Detection>> {
            Err(MonitorError::Inference("model crashed".into()))
        }
    }

    #[test]
    fn test_tracker_pipeline() {
        let a = Detection::new(10.0, 20.0, 50.0, 80.0, 0.9, 0);
        let detector = ScriptedDetector::new([vec![a], vec![a]]);
        let mut pipeline = TrackerPipeline::with_default_config(detector);
        let frame = Frame::default();

        let first = pipeline.process_frame(&frame).unwrap();
        assert_eq!(first.frame_index, 1);
        assert_eq!(first.tracks.len(), 1);
        assert_eq!(first.events.len(), 1);
        assert_eq!(first.total, 1);

        let second = pipeline.process_frame(&frame).unwrap();
        assert_eq!(second.tracks[0].track_id, first.tracks[0].track_id);
        assert!(second.events.is_empty());
        assert_eq!(pipeline.total().get(), 1);
    }

    #[test]
    fn test_detector_failure_propagates() {
        let mut pipeline = TrackerPipeline::with_default_config(FailingDetector);
        let err = pipeline.process_frame(&Frame::default()).unwrap_err();
        assert!(matches!(err, MonitorError::Inference(_)));
        assert_eq!(pipeline.tracker().frame_count(), 0);
    }
}
