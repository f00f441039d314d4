use crate::error::LinkError;
use crate::reading::Reading;

pub mod http;
pub mod mqtt;

pub use http::{Heartbeat, HttpUploader};
pub use mqtt::MqttPublisher;

/// Acknowledgement from a sink that took a reading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardAck {
    pub sink: &'static str,
    pub message: Option<String>,
}

/// Somewhere an accepted reading can be sent. A failed forward drops the
/// reading; nothing is queued for a later attempt.
#[allow(async_fn_in_trait)]
pub trait Forwarder {
    async fn forward(&mut self, reading: &Reading) -> Result<ForwardAck, LinkError>;
}
