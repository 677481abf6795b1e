//! Builder for assembling detections from partial detector output.

use crate::error::{MonitorError, Result};
use crate::tracker::{Detection, Rect};

/// Collects the fields of one detection. Box and confidence are mandatory;
/// the class defaults to 0.
#[derive(Debug, Clone, Default)]
pub struct DetectionBuilder {
    bbox: Option<Rect>,
    confidence: Option<f32>,
    class_id: Option<u32>,
}

impl DetectionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set bounding box in TLBR format (x1, y1, x2, y2).
    pub fn tlbr(mut self, x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        self.bbox = Some(Rect::from_tlbr(x1, y1, x2, y2));
        self
    }

    /// Set bounding box in XYWH format (center_x, center_y, width, height).
    pub fn xywh(mut self, cx: f32, cy: f32, w: f32, h: f32) -> Self {
        self.bbox = Some(Rect::new(cx - w / 2.0, cy - h / 2.0, w, h));
        self
    }

    pub fn confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn class_id(mut self, class_id: u32) -> Self {
        self.class_id = Some(class_id);
        self
    }

    /// Build the final [`Detection`], failing with
    /// [`MonitorError::MalformedDetection`] if a mandatory field is missing
    /// or out of range.
    pub fn build(self) -> Result<Detection> {
        let bbox = self
            .bbox
            .ok_or_else(|| MonitorError::MalformedDetection("missing bounding box".into()))?;
        let confidence = self
            .confidence
            .ok_or_else(|| MonitorError::MalformedDetection("missing confidence".into()))?;
        let detection = Detection::from_rect(bbox, confidence, self.class_id.unwrap_or(0));
        detection.validate()?;
        Ok(detection)
    }
}
