//! Alert policy, notification and log archival on threshold crossings.

mod archive;
mod notify;
mod policy;

use std::path::PathBuf;

use tracing::{error, info};

pub use archive::{Archiver, DirectoryArchiver, HttpArchiver, archive_key};
pub use notify::{LogNotifier, Notifier, TwilioCredentials, TwilioNotifier};
pub use policy::{AlertPolicy, ThresholdPolicy};

use crate::counting::UniqueCounter;

/// Applies the alert policy to the running total and, when it fires,
/// notifies, resets the counting epoch and archives the detection log.
pub struct AlertDispatcher {
    policy: Box<dyn AlertPolicy>,
    notifier: Box<dyn Notifier>,
    archiver: Option<Box<dyn Archiver>>,
    log_path: PathBuf,
}

impl AlertDispatcher {
    pub fn new(policy: impl AlertPolicy + 'static, notifier: impl Notifier + 'static) -> Self {
        Self {
            policy: Box::new(policy),
            notifier: Box::new(notifier),
            archiver: None,
            log_path: PathBuf::from("detection_log.log"),
        }
    }

    pub fn with_archiver(mut self, archiver: impl Archiver + 'static) -> Self {
        self.archiver = Some(Box::new(archiver));
        self
    }

    /// The file handed to the archiver.
    pub fn with_log_path(mut self, log_path: impl Into<PathBuf>) -> Self {
        self.log_path = log_path.into();
        self
    }

    /// Check the counter's total. On a crossing the total is reset to 0 before
    /// returning `true`. Notification and archival failures are logged only.
    pub fn check(&self, counter: &mut UniqueCounter) -> bool {
        let total = counter.total();
        if !self.policy.should_alert(total) {
            return false;
        }

        match self.policy.threshold() {
            Some(threshold) => info!(
                total,
                threshold,
                "Alert triggered: {} item(s) of trash detected, threshold was {}",
                total,
                threshold
            ),
            None => info!(total, "Alert triggered: {} item(s) of trash detected", total),
        }
        let message = format!("Alert: The trash collector has detected {total} item(s) of trash.");
        if let Err(e) = self.notifier.notify(&message) {
            error!(error = %e, "Failed to send alert");
        }

        counter.reset();
        self.archive();
        true
    }

    fn archive(&self) {
        let Some(archiver) = &self.archiver else {
            error!("Missing required parameters for log archival");
            return;
        };
        let key = archive_key(chrono::Local::now().naive_local());
        match archiver.archive(&self.log_path, &key) {
            Ok(()) => info!(
                "Successfully uploaded {} to {}",
                self.log_path.display(),
                archiver.destination(&key)
            ),
            Err(e) => error!(error = %e, "Failed to upload {}", self.log_path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{MonitorError, Result};
    use crate::tracker::{ActiveTrack, Rect, TrackState};
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<String>>>);

    impl Notifier for Recorder {
        fn notify(&self, message: &str) -> Result<()> {
            self.0.lock().unwrap().push(message.to_string());
            Ok(())
        }
    }

    struct Broken;

    impl Notifier for Broken {
        fn notify(&self, _message: &str) -> Result<()> {
            Err(MonitorError::Notification("gateway down".into()))
        }
    }

    impl Archiver for Broken {
        fn archive(&self, _local: &Path, _key: &str) -> Result<()> {
            Err(MonitorError::Archival("bucket gone".into()))
        }

        fn destination(&self, key: &str) -> String {
            key.to_string()
        }
    }

    fn seen(counter: &mut UniqueCounter, ids: std::ops::Range<u64>) {
        let tracks: Vec<ActiveTrack> = ids
            .map(|track_id| ActiveTrack {
                track_id,
                state: TrackState::Tentative,
                bbox: Rect::new(0.0, 0.0, 1.0, 1.0),
                confidence: 0.9,
                class_id: 0,
                age: 1,
                hits: 1,
                time_since_update: 0,
            })
            .collect();
        counter.observe(&tracks);
    }

    #[test]
    fn test_alert_notifies_and_resets() {
        let recorder = Recorder::default();
        let dispatcher = AlertDispatcher::new(ThresholdPolicy::new(3), recorder.clone());
        let mut counter = UniqueCounter::default();

        seen(&mut counter, 1..3);
        assert!(!dispatcher.check(&mut counter));
        assert_eq!(counter.total(), 2);

        seen(&mut counter, 3..4);
        assert!(dispatcher.check(&mut counter));
        assert_eq!(counter.total(), 0);
        assert!(!dispatcher.check(&mut counter));

        let messages = recorder.0.lock().unwrap();
        assert_eq!(
            messages.as_slice(),
            ["Alert: The trash collector has detected 3 item(s) of trash."]
        );
    }

    #[test]
    fn test_failures_are_not_fatal() {
        let dispatcher = AlertDispatcher::new(ThresholdPolicy::new(1), Broken).with_archiver(Broken);
        let mut counter = UniqueCounter::default();
        seen(&mut counter, 1..2);
        assert!(dispatcher.check(&mut counter));
        assert_eq!(counter.total(), 0);
    }

    #[test]
    fn test_log_archived_on_alert() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("detection_log.log");
        std::fs::write(&log, "log line\n").unwrap();

        let dispatcher = AlertDispatcher::new(ThresholdPolicy::new(1), LogNotifier)
            .with_archiver(DirectoryArchiver::new(dir.path().join("archive"), "bucket"))
            .with_log_path(&log);
        let mut counter = UniqueCounter::default();
        seen(&mut counter, 1..2);
        assert!(dispatcher.check(&mut counter));

        let logs = dir.path().join("archive/bucket/logs");
        let archived: Vec<_> = std::fs::read_dir(logs).unwrap().collect();
        assert_eq!(archived.len(), 1);
    }
}
