//! Archival of the detection log when an alert fires.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

use crate::error::{MonitorError, Result};

/// Stores a local file under a key in a bucket.
pub trait Archiver: Send {
    fn archive(&self, local: &Path, key: &str) -> Result<()>;

    /// Human-readable destination for logs.
    fn destination(&self, key: &str) -> String;
}

/// Archive key for a log captured at `now`: `logs/YYYY-mm-dd_HH-MM-SS_log.log`.
pub fn archive_key(now: NaiveDateTime) -> String {
    format!("logs/{}_log.log", now.format("%Y-%m-%d_%H-%M-%S"))
}

/// Copies into `<root>/<bucket>/<key>` on the local filesystem.
#[derive(Debug, Clone)]
pub struct DirectoryArchiver {
    root: PathBuf,
    bucket: String,
}

impl DirectoryArchiver {
    pub fn new(root: impl Into<PathBuf>, bucket: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            bucket: bucket.into(),
        }
    }

    fn target(&self, key: &str) -> PathBuf {
        self.root.join(&self.bucket).join(key)
    }
}

impl Archiver for DirectoryArchiver {
    fn archive(&self, local: &Path, key: &str) -> Result<()> {
        let target = self.target(key);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| MonitorError::Archival(format!("{}: {e}", parent.display())))?;
        }
        fs::copy(local, &target)
            .map_err(|e| MonitorError::Archival(format!("{}: {e}", local.display())))?;
        Ok(())
    }

    fn destination(&self, key: &str) -> String {
        self.target(key).display().to_string()
    }
}

/// Uploads with an HTTP `PUT` to `<endpoint>/<bucket>/<key>` (S3-compatible
/// gateways, presigning proxies).
#[derive(Debug, Clone)]
pub struct HttpArchiver {
    endpoint: String,
    bucket: String,
    agent: ureq::Agent,
}

impl HttpArchiver {
    pub fn new(endpoint: impl Into<String>, bucket: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            bucket: bucket.into(),
            agent: ureq::AgentBuilder::new()
                .timeout(std::time::Duration::from_secs(30))
                .build(),
        }
    }

    fn url(&self, key: &str) -> String {
        format!(
            "{}/{}/{}",
            self.endpoint.trim_end_matches('/'),
            self.bucket,
            key.trim_start_matches('/')
        )
    }
}

impl Archiver for HttpArchiver {
    fn archive(&self, local: &Path, key: &str) -> Result<()> {
        let bytes = fs::read(local)
            .map_err(|e| MonitorError::Archival(format!("{}: {e}", local.display())))?;
        self.agent
            .put(&self.url(key))
            .set("Content-Type", "text/plain")
            .send_bytes(&bytes)
            .map_err(|e| MonitorError::Archival(e.to_string()))?;
        Ok(())
    }

    fn destination(&self, key: &str) -> String {
        self.url(key)
    }
}
