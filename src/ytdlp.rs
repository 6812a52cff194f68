use crate::types::MediaProbe;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

/// Contract with the command-line media extractor: dump full metadata and
/// the format list for a video without downloading any media.
#[async_trait]
pub trait MediaExtractor: Send + Sync {
    async fn probe(&self, video_id: &str) -> Result<MediaProbe>;
}

pub struct YtDlp {
    binary: String,
}

impl YtDlp {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait]
impl MediaExtractor for YtDlp {
    async fn probe(&self, video_id: &str) -> Result<MediaProbe> {
        let url = format!("https://www.youtube.com/watch?v={}", video_id);
        debug!("Probing media info: {} {}", self.binary, url);

        let output = Command::new(&self.binary)
            .arg("--dump-single-json")
            .arg("--skip-download")
            .arg("--no-warnings")
            .arg("--no-progress")
            .arg(&url)
            .output()
            .await
            .with_context(|| format!("spawning {} for {}", self.binary, url))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!(
                "{} exited with {}: {}",
                self.binary,
                output.status,
                stderr.trim()
            ));
        }

        serde_json::from_slice(&output.stdout).context("parsing media extractor output")
    }
}
