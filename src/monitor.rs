//! The detection loop: read, detect, track, count and alert, one frame at a time.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use rand::Rng;
use tracing::{error, info, warn};

use crate::alert::AlertDispatcher;
use crate::counting::RunningTotal;
use crate::error::{MonitorError, Result};
use crate::integration::{Detector, FrameReport, FrameSource, SourceGuard, TrackerPipeline};

/// Cooperative stop flag shared between the loop and whoever owns the process.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Pause after each iteration; zero runs flat out.
    pub frame_interval: Duration,
    /// Pause after a failed frame read.
    pub read_retry_delay: Duration,
    /// Log a simulated water pH reading every frame.
    pub mock_ph: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            frame_interval: Duration::from_millis(33),
            read_retry_delay: Duration::from_millis(100),
            mock_ph: false,
        }
    }
}

/// Result of one successful iteration.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub report: FrameReport,
    /// Whether the alert policy fired (and the total was reset) on this frame.
    pub alerted: bool,
    pub ph: Option<f64>,
}

pub struct Monitor<S: FrameSource, D: Detector> {
    source: SourceGuard<S>,
    pipeline: TrackerPipeline<D>,
    alerts: AlertDispatcher,
    config: MonitorConfig,
    stop: StopSignal,
}

impl<S: FrameSource, D: Detector> Monitor<S, D> {
    pub fn new(
        source: S,
        pipeline: TrackerPipeline<D>,
        alerts: AlertDispatcher,
        config: MonitorConfig,
    ) -> Self {
        Self {
            source: SourceGuard::new(source),
            pipeline,
            alerts,
            config,
            stop: StopSignal::new(),
        }
    }

    /// Handle to stop [`Monitor::run`] from another thread.
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    /// Read-only view of the running total for the serving layer.
    pub fn total(&self) -> RunningTotal {
        self.pipeline.total()
    }

    /// Run a single iteration of the loop.
    pub fn step(&mut self) -> Result<StepOutcome> {
        let frame = self.source.read()?;
        let report = self.pipeline.process_frame(&frame)?;

        let ph = self.config.mock_ph.then(|| {
            let ph = mock_ph(&mut rand::thread_rng());
            info!("pH data received: {}", ph);
            ph
        });

        let alerted = self.alerts.check(self.pipeline.counter_mut());
        Ok(StepOutcome {
            report,
            alerted,
            ph,
        })
    }

    /// Loop until stopped or the source runs dry. A single frame's failure
    /// never ends the loop. The source is released on return.
    pub fn run(mut self) -> u64 {
        info!(detector = self.pipeline.detector().name(), "Detection loop started");
        let mut frames = 0u64;

        while !self.stop.is_stopped() {
            match self.step() {
                Ok(_) => frames += 1,
                Err(MonitorError::FrameRead(reason)) => {
                    warn!(%reason, "Failed to read frame from camera");
                    thread::sleep(self.config.read_retry_delay);
                    continue;
                }
                Err(MonitorError::SourceExhausted) => {
                    info!("Frame source exhausted");
                    break;
                }
                Err(e) => error!(error = %e, "An error occurred in the detection loop"),
            }
            if !self.config.frame_interval.is_zero() {
                thread::sleep(self.config.frame_interval);
            }
        }

        info!(frames, total = self.pipeline.total().get(), "Detection loop stopped");
        frames
    }
}

/// Uniform reading in `[6.5, 8.5]`, rounded to two decimals.
pub fn mock_ph(rng: &mut impl Rng) -> f64 {
    let value: f64 = rng.gen_range(6.5..=8.5);
    (value * 100.0).round() / 100.0
}
