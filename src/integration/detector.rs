//! Trait for object detection inference backends.

use crate::error::Result;
use crate::frame::Frame;
use crate::tracker::Detection;

/// An opaque object detector.
///
/// Implement this trait to connect any detection model to the tracker.
///
/// # Example
///
/// ```
/// use trashwatch::{Detection, Detector, Frame};
///
/// struct FixedDetector;
///
/// impl Detector for FixedDetector {
///     fn name(&self) -> &'static str {
///         "fixed"
///     }
///
///     fn detect(&mut self, _frame: &Frame) -> trashwatch::error::Result<Vec<Detection>> {
///         Ok(vec![Detection::new(10.0, 10.0, 50.0, 80.0, 0.9, 0)])
///     }
/// }
/// ```
pub trait Detector: Send {
    /// Backend identifier used in logs.
    fn name(&self) -> &'static str;

    /// Run inference on one frame. An empty result is a valid answer.
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>>;
}

impl<D: Detector + ?Sized> Detector for Box<D> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>> {
        (**self).detect(frame)
    }
}
