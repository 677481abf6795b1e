//! Command-line and environment configuration.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing::warn;

use crate::alert::{
    AlertDispatcher, DirectoryArchiver, HttpArchiver, LogNotifier, ThresholdPolicy,
    TwilioCredentials, TwilioNotifier,
};
use crate::counting::CountPolicy;
use crate::error::Result;
use crate::integration::{DirectorySource, FrameSource, ReplayDetector, SyntheticSource};
use crate::monitor::MonitorConfig;
use crate::tracker::TrackerConfig;

#[derive(Parser, Debug, Clone)]
#[command(
    author,
    version,
    about = "Count unique pieces of trash in a video feed and serve the count"
)]
pub struct Config {
    /// Detections to replay, one JSON array per frame.
    #[arg(long, env = "MODEL_PATH", default_value = "models/detections.jsonl")]
    pub model_path: PathBuf,

    /// Unique items counted before an alert is sent.
    #[arg(long, env = "TRASH_THRESHOLD", default_value_t = 5)]
    pub trash_threshold: u64,

    /// Bucket the detection log is archived into. Archival is skipped when unset.
    #[arg(long, env = "S3_BUCKET")]
    pub s3_bucket: Option<String>,

    /// HTTP endpoint accepting `PUT <endpoint>/<bucket>/<key>`. Without it the
    /// log is copied under `archive_dir`.
    #[arg(long, env = "ARCHIVE_ENDPOINT")]
    pub archive_endpoint: Option<String>,

    #[arg(long, env = "ARCHIVE_DIR", default_value = "archive")]
    pub archive_dir: PathBuf,

    #[arg(long, env = "TWILIO_ACCOUNT_SID")]
    pub twilio_account_sid: Option<String>,

    #[arg(long, env = "TWILIO_AUTH_TOKEN", hide_env_values = true)]
    pub twilio_auth_token: Option<String>,

    /// Sender, e.g. `whatsapp:+14155238886`.
    #[arg(long, env = "TWILIO_WHATSAPP_NUMBER")]
    pub twilio_whatsapp_number: Option<String>,

    #[arg(long, env = "RECIPIENT_NUMBER")]
    pub recipient_number: Option<String>,

    /// Directory of png/jpg frames. Blank frames are generated when unset.
    #[arg(long, env = "FRAME_DIR")]
    pub frame_dir: Option<PathBuf>,

    #[arg(long, env = "FRAME_WIDTH", default_value_t = 640)]
    pub frame_width: u32,

    #[arg(long, env = "FRAME_HEIGHT", default_value_t = 480)]
    pub frame_height: u32,

    /// Restart frames and detections from the beginning when they run out.
    #[arg(long, env = "LOOP_FRAMES")]
    pub loop_frames: bool,

    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:8000")]
    pub listen_addr: String,

    #[arg(long, env = "CORS_ORIGIN", default_value = "http://localhost:3000")]
    pub cors_origin: String,

    #[arg(long, env = "PUSH_INTERVAL_SECS", default_value_t = 5)]
    pub push_interval_secs: u64,

    #[arg(long, env = "FRAME_INTERVAL_MS", default_value_t = 33)]
    pub frame_interval_ms: u64,

    /// Log a simulated water pH reading with every frame.
    #[arg(long, env = "MOCK_PH")]
    pub mock_ph: bool,

    #[arg(long, env = "LOG_FILE", default_value = "detection_log.log")]
    pub log_file: PathBuf,

    #[arg(long, env = "MAX_AGE", default_value_t = 30)]
    pub max_age: u32,

    #[arg(long, env = "N_INIT", default_value_t = 3)]
    pub n_init: u32,

    #[arg(long, env = "MAX_COSINE_DISTANCE", default_value_t = 0.4)]
    pub max_cosine_distance: f32,

    #[arg(long, env = "MAX_IOU_DISTANCE", default_value_t = 0.7)]
    pub max_iou_distance: f32,

    #[arg(long, env = "NMS_MAX_OVERLAP", default_value_t = 1.0)]
    pub nms_max_overlap: f32,

    /// Appearance descriptors kept per track; 0 keeps all of them.
    #[arg(long, env = "NN_BUDGET", default_value_t = 100)]
    pub nn_budget: usize,

    #[arg(long, env = "MOTION_WEIGHT", default_value_t = 0.1)]
    pub motion_weight: f32,

    /// `first-sight` or `confirmed`.
    #[arg(long, env = "COUNT_POLICY", default_value = "first-sight")]
    pub count_policy: CountPolicy,
}

impl Config {
    pub fn tracker_config(&self) -> TrackerConfig {
        TrackerConfig {
            max_age: self.max_age,
            n_init: self.n_init.max(1),
            max_cosine_distance: self.max_cosine_distance,
            max_iou_distance: self.max_iou_distance,
            nms_max_overlap: self.nms_max_overlap,
            nn_budget: (self.nn_budget > 0).then_some(self.nn_budget),
            motion_weight: self.motion_weight.clamp(0.0, 1.0),
        }
    }

    pub fn monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            frame_interval: Duration::from_millis(self.frame_interval_ms),
            mock_ph: self.mock_ph,
            ..MonitorConfig::default()
        }
    }

    pub fn push_interval(&self) -> Duration {
        Duration::from_secs(self.push_interval_secs.max(1))
    }

    /// All four Twilio settings, or `None` if any is missing.
    pub fn twilio_credentials(&self) -> Option<TwilioCredentials> {
        Some(TwilioCredentials {
            account_sid: self.twilio_account_sid.clone()?,
            auth_token: self.twilio_auth_token.clone()?,
            from: self.twilio_whatsapp_number.clone()?,
            to: self.recipient_number.clone()?,
        })
    }

    pub fn alert_dispatcher(&self) -> AlertDispatcher {
        let policy = ThresholdPolicy::new(self.trash_threshold);
        let dispatcher = match self.twilio_credentials() {
            Some(credentials) => AlertDispatcher::new(policy, TwilioNotifier::new(credentials)),
            None => {
                warn!("Twilio credentials incomplete, alerts will only be logged");
                AlertDispatcher::new(policy, LogNotifier)
            }
        }
        .with_log_path(&self.log_file);

        match (&self.s3_bucket, &self.archive_endpoint) {
            (None, _) => dispatcher,
            (Some(bucket), Some(endpoint)) => {
                dispatcher.with_archiver(HttpArchiver::new(endpoint.clone(), bucket.clone()))
            }
            (Some(bucket), None) => {
                dispatcher.with_archiver(DirectoryArchiver::new(&self.archive_dir, bucket.clone()))
            }
        }
    }

    /// Load the detector. Failure is a startup error.
    pub fn detector(&self) -> Result<ReplayDetector> {
        Ok(ReplayDetector::load(&self.model_path)?.looping(self.loop_frames))
    }

    /// Open the frame source. Failure is a startup error.
    pub fn frame_source(&self) -> Result<Box<dyn FrameSource>> {
        match &self.frame_dir {
            Some(dir) => Ok(Box::new(DirectorySource::open(dir)?.looping(self.loop_frames))),
            None => Ok(Box::new(SyntheticSource::new(
                self.frame_width,
                self.frame_height,
            ))),
        }
    }
}
