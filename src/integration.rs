//! Integration module for connecting detectors and frame sources with the tracker.
//!
//! This module provides the traits at the two external seams (the opaque
//! detector and the frame source), deterministic stand-ins for both, and the
//! pipeline that runs detection, tracking and counting for one frame.

mod builder;
mod detector;
mod pipeline;
mod replay;
mod source;

pub use builder::DetectionBuilder;
pub use detector::Detector;
pub use pipeline::{FrameReport, TrackerPipeline};
pub use replay::{ReplayDetector, ScriptedDetector};
pub use source::{DirectorySource, FrameSource, SourceGuard, SyntheticSource};
