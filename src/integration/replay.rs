//! Detectors that replay precomputed detections instead of running a model.

use std::collections::VecDeque;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use super::{DetectionBuilder, Detector};
use crate::error::{MonitorError, Result};
use crate::frame::Frame;
use crate::tracker::Detection;

/// Detector output record as written by an offline inference run.
/// Every field is optional so that incomplete records surface as
/// malformed detections instead of parse failures.
#[derive(Debug, Clone, Deserialize)]
struct RawDetection {
    bbox: Option<[f32; 4]>,
    confidence: Option<f32>,
    class_id: Option<u32>,
}

impl RawDetection {
    fn build(&self) -> Result<Detection> {
        let mut builder = DetectionBuilder::new();
        if let Some([x1, y1, x2, y2]) = self.bbox {
            builder = builder.tlbr(x1, y1, x2, y2);
        }
        if let Some(confidence) = self.confidence {
            builder = builder.confidence(confidence);
        }
        if let Some(class_id) = self.class_id {
            builder = builder.class_id(class_id);
        }
        builder.build()
    }
}

/// Replays a JSON-lines detection log: line *n* is a JSON array with the
/// detections of frame *n*, e.g.
///
/// ```text
/// [{"bbox": [10, 20, 50, 80], "confidence": 0.91, "class_id": 0}]
/// []
/// ```
///
/// A blank line stands for a frame without detections.
#[derive(Debug)]
pub struct ReplayDetector {
    frames: Vec<Vec<RawDetection>>,
    cursor: usize,
    looping: bool,
}

impl ReplayDetector {
    /// Load a detection log. Any I/O or parse failure is a startup failure.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            MonitorError::Startup(format!("failed to load detector from {}: {e}", path.display()))
        })?;
        let detector = Self::parse(&text).map_err(|e| {
            MonitorError::Startup(format!("failed to load detector from {}: {e}", path.display()))
        })?;
        info!(path = %path.display(), frames = detector.frames.len(), "Replay detector loaded");
        Ok(detector)
    }

    fn parse(text: &str) -> std::result::Result<Self, String> {
        let frames = text
            .lines()
            .enumerate()
            .map(|(n, line)| {
                if line.trim().is_empty() {
                    return Ok(Vec::new());
                }
                serde_json::from_str::<Vec<RawDetection>>(line)
                    .map_err(|e| format!("line {}: {e}", n + 1))
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self {
            frames,
            cursor: 0,
            looping: false,
        })
    }

    /// Start over from the first frame once the log is exhausted.
    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn frames(&self) -> usize {
        self.frames.len()
    }
}

impl Detector for ReplayDetector {
    fn name(&self) -> &'static str {
        "replay"
    }

    fn detect(&mut self, _frame: &Frame) -> Result<Vec<Detection>> {
        if self.cursor >= self.frames.len() {
            if !self.looping || self.frames.is_empty() {
                return Ok(Vec::new());
            }
            self.cursor = 0;
        }
        let raw = &self.frames[self.cursor];
        let frame_no = self.cursor + 1;
        self.cursor += 1;

        Ok(raw
            .iter()
            .filter_map(|r| match r.build() {
                Ok(d) => Some(d),
                Err(e) => {
                    warn!(frame = frame_no, error = %e, "Dropping detection");
                    None
                }
            })
            .collect())
    }
}

/// In-memory detector fed with a fixed script of per-frame detections.
/// Returns no detections once the script runs out.
#[derive(Debug, Default)]
pub struct ScriptedDetector {
    frames: VecDeque<Vec<Detection>>,
}

impl ScriptedDetector {
    pub fn new(frames: impl IntoIterator<Item = Vec<Detection>>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }

    pub fn push(&mut self, detections: Vec<Detection>) {
        self.frames.push_back(detections);
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl Detector for ScriptedDetector {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn detect(&mut self, _frame: &Frame) -> Result<Vec<Detection>> {
        Ok(self.frames.pop_front().unwrap_or_default())
    }
}
