use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use trashwatch::alert::{AlertDispatcher, Notifier, ThresholdPolicy};
use trashwatch::error::Result;
use trashwatch::integration::ScriptedDetector;
use trashwatch::{
    CountPolicy, Detection, Frame, TrackId, TrackState, Tracker, TrackerConfig, TrackerPipeline,
};

fn frame() -> Frame {
    Frame::filled(640, 480, [40, 40, 40])
}

fn config(n_init: u32, max_age: u32) -> TrackerConfig {
    TrackerConfig {
        n_init,
        max_age,
        ..TrackerConfig::default()
    }
}

/// Boxes in a row, far enough apart that they never compete for a track.
fn row(n: usize) -> Vec<Detection> {
    (0..n)
        .map(|i| {
            let x = 20.0 + 120.0 * i as f32;
            Detection::new(x, 100.0, x + 50.0, 200.0, 0.9, 0)
        })
        .collect()
}

#[test]
fn test_track_ids_are_never_reused() {
    let mut tracker = Tracker::new(config(3, 2));
    let far = Detection::new(500.0, 350.0, 560.0, 450.0, 0.8, 0);
    let script = vec![
        row(2),
        row(1),
        vec![row(1)[0], far],
        vec![],
        vec![far],
        row(3),
        vec![],
        row(3),
    ];

    let mut first_seen: Vec<TrackId> = Vec::new();
    let mut gone: HashSet<TrackId> = HashSet::new();
    let mut previous: HashSet<TrackId> = HashSet::new();

    for detections in &script {
        let current: HashSet<TrackId> = tracker
            .update(detections, &frame())
            .iter()
            .map(|t| t.track_id)
            .collect();

        for id in &current {
            assert!(!gone.contains(id), "track {id} came back after deletion");
            if !first_seen.contains(id) {
                first_seen.push(*id);
            }
        }
        gone.extend(previous.difference(&current));
        previous = current;
    }

    let expected: Vec<TrackId> = (1..=first_seen.len() as TrackId).collect();
    assert_eq!(first_seen, expected);
}

#[test]
fn test_tentative_track_deleted_on_first_miss() {
    let mut tracker = Tracker::new(config(3, 30));
    let a = row(1);

    let tracks = tracker.update(&a, &frame());
    assert_eq!(tracks.len(), 1);
    assert_eq!(tracks[0].state, TrackState::Tentative);

    assert!(tracker.update(&[], &frame()).is_empty());

    let tracks = tracker.update(&a, &frame());
    assert_eq!(tracks.len(), 1);
    assert_eq!(tracks[0].track_id, 2);
}

#[test]
fn test_confirmed_track_survives_exactly_max_age_misses() {
    let max_age = 3;
    let mut tracker = Tracker::new(config(2, max_age));
    let a = row(1);

    tracker.update(&a, &frame());
    let tracks = tracker.update(&a, &frame());
    assert_eq!(tracks[0].state, TrackState::Confirmed);

    for miss in 1..=max_age {
        let tracks = tracker.update(&[], &frame());
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].time_since_update, miss);
    }

    assert!(tracker.update(&[], &frame()).is_empty());
    assert!(tracker.is_empty());
}

#[test]
fn test_total_grows_once_per_new_track() {
    let detector = ScriptedDetector::new([row(1), row(1), row(2), row(2)]);
    let mut pipeline = TrackerPipeline::with_default_config(detector);

    let increments: Vec<usize> = (0..4)
        .map(|_| pipeline.process_frame(&frame()).unwrap().events.len())
        .collect();
    assert_eq!(increments, vec![1, 0, 1, 0]);
    assert_eq!(pipeline.total().get(), 2);
}

#[test]
fn test_reset_never_recounts() {
    let detector = ScriptedDetector::new([row(2), row(2), row(3)]);
    let mut pipeline = TrackerPipeline::with_default_config(detector);

    pipeline.process_frame(&frame()).unwrap();
    pipeline.counter_mut().reset();
    assert_eq!(pipeline.total().get(), 0);

    let report = pipeline.process_frame(&frame()).unwrap();
    assert!(report.events.is_empty());
    assert_eq!(report.total, 0);

    let report = pipeline.process_frame(&frame()).unwrap();
    assert_eq!(report.events.len(), 1);
    assert_eq!(report.total, 1);
}

#[test]
fn test_end_to_end_disappearance_and_new_object() {
    let a = Detection::new(100.0, 100.0, 150.0, 200.0, 0.9, 0);
    let b = Detection::new(450.0, 300.0, 500.0, 400.0, 0.9, 0);
    let mut script = vec![vec![a]; 3];
    script.extend(vec![vec![]; 3]);
    script.extend(vec![vec![b]; 4]);

    let mut pipeline = TrackerPipeline::new(
        ScriptedDetector::new(script),
        config(3, 2),
        CountPolicy::FirstSight,
    );

    let reports: Vec<_> = (0..10)
        .map(|_| pipeline.process_frame(&frame()).unwrap())
        .collect();

    let id_a = reports[0].tracks[0].track_id;
    assert_eq!(reports[2].tracks[0].state, TrackState::Confirmed);
    assert_eq!(reports[4].tracks.len(), 1, "still within max_age");
    assert!(reports[5].tracks.is_empty(), "deleted after max_age misses");

    let id_b = reports[6].tracks[0].track_id;
    assert_ne!(id_a, id_b);
    assert_eq!(reports[6].events.len(), 1);
    assert_eq!(reports[9].tracks[0].track_id, id_b);
    assert_eq!(reports[9].total, 2);
}

#[derive(Clone, Default)]
struct Outbox(Arc<Mutex<Vec<String>>>);

impl Notifier for Outbox {
    fn notify(&self, message: &str) -> Result<()> {
        self.0.lock().unwrap().push(message.to_string());
        Ok(())
    }
}

#[test]
fn test_threshold_alert_fires_once_and_resets() {
    let detector = ScriptedDetector::new([row(1), row(2), row(3), row(4), row(4)]);
    let mut pipeline = TrackerPipeline::with_default_config(detector);
    let outbox = Outbox::default();
    let alerts = AlertDispatcher::new(ThresholdPolicy::new(3), outbox.clone());

    let mut fired = Vec::new();
    let mut totals = Vec::new();
    for _ in 0..5 {
        pipeline.process_frame(&frame()).unwrap();
        fired.push(alerts.check(pipeline.counter_mut()));
        totals.push(pipeline.total().get());
    }

    assert_eq!(fired, vec![false, false, true, false, false]);
    assert_eq!(totals, vec![1, 2, 0, 1, 1]);
    assert_eq!(outbox.0.lock().unwrap().len(), 1);
}
