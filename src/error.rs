//! Error taxonomy shared by the detection loop and its collaborators.

use thiserror::Error;

/// Errors raised while acquiring frames, detecting, tracking or alerting.
///
/// Only [`MonitorError::Startup`] is fatal; every other variant is caught at
/// the detection loop boundary, logged, and the loop moves on to the next frame.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// Detector or frame source could not be brought up.
    #[error("startup failed: {0}")]
    Startup(String),

    /// A frame could not be read; transient.
    #[error("failed to read frame: {0}")]
    FrameRead(String),

    /// A finite frame source ran out of frames.
    #[error("frame source exhausted")]
    SourceExhausted,

    /// The detector failed on a single frame.
    #[error("inference failed: {0}")]
    Inference(String),

    /// A detection with a missing or invalid box or confidence.
    #[error("malformed detection: {0}")]
    MalformedDetection(String),

    /// Cost computation or the assignment solver failed.
    #[error("track assignment failed: {0}")]
    Assignment(String),

    #[error("notification failed: {0}")]
    Notification(String),

    #[error("archival failed: {0}")]
    Archival(String),
}

impl MonitorError {
    /// Whether this error must stop the detection loop from starting.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Startup(_))
    }
}

pub type Result<T> = std::result::Result<T, MonitorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_startup_is_fatal() {
        assert!(MonitorError::Startup("no model".into()).is_fatal());
        assert!(!MonitorError::FrameRead("timeout".into()).is_fatal());
        assert!(!MonitorError::Assignment("singular".into()).is_fatal());
        assert!(!MonitorError::SourceExhausted.is_fatal());
    }

    #[test]
    fn test_display_carries_detail() {
        let err = MonitorError::Archival("bucket missing".into());
        assert_eq!(err.to_string(), "archival failed: bucket missing");
    }
}
