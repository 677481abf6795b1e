//! Per-frame detector output as consumed by the tracker.

use crate::error::{MonitorError, Result};
use crate::tracker::rect::Rect;

/// One candidate object in one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    /// Bounding box, built from TLBR `(x1, y1, x2, y2)`.
    pub bbox: Rect,
    /// Detector confidence in `[0, 1]`.
    pub confidence: f32,
    pub class_id: u32,
}

impl Detection {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32, confidence: f32, class_id: u32) -> Self {
        Self {
            bbox: Rect::from_tlbr(x1, y1, x2, y2),
            confidence,
            class_id,
        }
    }

    pub fn from_rect(bbox: Rect, confidence: f32, class_id: u32) -> Self {
        Self {
            bbox,
            confidence,
            class_id,
        }
    }

    /// Reject boxes that are not finite or have no area, and confidences outside `[0, 1]`.
    pub fn validate(&self) -> Result<()> {
        if !self.bbox.is_valid() {
            return Err(MonitorError::MalformedDetection(format!(
                "invalid bounding box {:?}",
                self.bbox.to_tlbr()
            )));
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(MonitorError::MalformedDetection(format!(
                "confidence {} outside [0, 1]",
                self.confidence
            )));
        }
        Ok(())
    }
}

/// Greedy non-maximum suppression. Keeps the most confident box of every
/// group overlapping by more than `max_overlap` IoU. `max_overlap >= 1.0`
/// disables suppression. Surviving detections keep their input order.
pub fn non_max_suppression(detections: Vec<Detection>, max_overlap: f32) -> Vec<Detection> {
    if max_overlap >= 1.0 || detections.len() < 2 {
        return detections;
    }

    let mut order: Vec<usize> = (0..detections.len()).collect();
    order.sort_by(|&a, &b| {
        detections[b]
            .confidence
            .total_cmp(&detections[a].confidence)
            .then(a.cmp(&b))
    });

    let mut keep = vec![false; detections.len()];
    let mut suppressed = vec![false; detections.len()];
    for (pos, &i) in order.iter().enumerate() {
        if suppressed[i] {
            continue;
        }
        keep[i] = true;
        for &j in &order[pos + 1..] {
            if !suppressed[j] && detections[i].bbox.iou(&detections[j].bbox) > max_overlap {
                suppressed[j] = true;
            }
        }
    }

    detections
        .into_iter()
        .zip(keep)
        .filter_map(|(d, k)| k.then_some(d))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate() {
        assert!(Detection::new(0.0, 0.0, 10.0, 10.0, 0.5, 0).validate().is_ok());
        assert!(Detection::new(0.0, 0.0, 10.0, 10.0, 1.5, 0).validate().is_err());
        assert!(Detection::new(0.0, 0.0, 10.0, 10.0, f32::NAN, 0).validate().is_err());
        assert!(Detection::new(10.0, 0.0, 0.0, 10.0, 0.5, 0).validate().is_err());
    }

    #[test]
    fn test_nms_disabled_at_one() {
        let dets = vec![
            Detection::new(0.0, 0.0, 10.0, 10.0, 0.9, 0),
            Detection::new(0.0, 0.0, 10.0, 10.0, 0.8, 0),
        ];
        assert_eq!(non_max_suppression(dets, 1.0).len(), 2);
    }

    #[test]
    fn test_nms_keeps_most_confident() {
        let dets = vec![
            Detection::new(0.0, 0.0, 10.0, 10.0, 0.6, 0),
            Detection::new(1.0, 1.0, 11.0, 11.0, 0.9, 0),
            Detection::new(50.0, 50.0, 60.0, 60.0, 0.3, 0),
        ];
        let kept = non_max_suppression(dets, 0.5);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].confidence, 0.9);
        assert_eq!(kept[1].confidence, 0.3);
    }
}
