use std::time::{Duration, Instant};

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use super::{ForwardAck, Forwarder};
use crate::error::LinkError;
use crate::reading::Reading;

const UPLOAD_TIMEOUT: Duration = Duration::from_secs(2);
const HEARTBEAT_TIMEOUT: Duration = Duration::from_millis(1500);

#[derive(Debug, Deserialize)]
struct UploadResponse {
    success: bool,
    #[serde(default)]
    message: Option<String>,
}

/// Uploads readings as URL-encoded query parameters on a GET request.
pub struct HttpUploader {
    client: Client,
    url: String,
}

impl HttpUploader {
    pub fn new(url: impl Into<String>) -> Result<Self, LinkError> {
        Ok(Self {
            client: Client::builder().timeout(UPLOAD_TIMEOUT).build()?,
            url: url.into(),
        })
    }
}

impl Forwarder for HttpUploader {
    async fn forward(&mut self, reading: &Reading) -> Result<ForwardAck, LinkError> {
        let response: UploadResponse = self
            .client
            .get(&self.url)
            .query(reading)
            .send()
            .await?
            .json()
            .await?;

        if !response.success {
            return Err(LinkError::Forward(
                response
                    .message
                    .unwrap_or_else(|| "upload refused without a message".to_string()),
            ));
        }
        info!("Sent reading to upload endpoint");
        Ok(ForwardAck {
            sink: "upload",
            message: response.message,
        })
    }
}

/// Periodic HEAD request telling the receiving side this process is alive.
pub struct Heartbeat {
    client: Client,
    url: String,
    interval: Duration,
    last_sent: Option<Instant>,
}

impl Heartbeat {
    pub fn new(url: impl Into<String>, interval: Duration) -> Result<Self, LinkError> {
        Ok(Self {
            client: Client::builder().timeout(HEARTBEAT_TIMEOUT).build()?,
            url: url.into(),
            interval,
            last_sent: None,
        })
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.last_sent
            .is_none_or(|sent| now.duration_since(sent) >= self.interval)
    }

    pub async fn beat(&mut self) -> Result<(), LinkError> {
        self.client
            .head(&self.url)
            .send()
            .await?
            .error_for_status()?;
        self.last_sent = Some(Instant::now());
        debug!("Heartbeat sent");
        Ok(())
    }
}
