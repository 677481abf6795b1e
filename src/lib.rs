//! Counts unique pieces of trash in a video feed.
//!
//! Frames flow through a [`Detector`], a DeepSORT-style [`Tracker`] and a
//! [`UniqueCounter`]; the running total drives threshold alerts and is served
//! over HTTP and WebSocket.

pub mod alert;
pub mod config;
pub mod counting;
pub mod error;
pub mod frame;
pub mod integration;
pub mod monitor;
pub mod server;
pub mod telemetry;
pub mod tracker;

pub use counting::{CountEvent, CountPolicy, RunningTotal, UniqueCounter};
pub use error::MonitorError;
pub use frame::Frame;
pub use integration::{Detector, FrameSource, TrackerPipeline};
pub use monitor::{Monitor, MonitorConfig, StopSignal};
pub use tracker::{ActiveTrack, Detection, Rect, TrackId, TrackState, Tracker, TrackerConfig};
