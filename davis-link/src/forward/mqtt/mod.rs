use std::io;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use super::{ForwardAck, Forwarder};
use crate::error::LinkError;
use crate::reading::Reading;

pub mod packets;

use packets::{CONNACK_LEN, build_connect_packet, build_publish_packet, parse_connack};

const CONNACK_TIMEOUT: Duration = Duration::from_secs(5);

/// Publishes readings to an MQTT broker at QoS 0.
///
/// The connection is opened on first use. After a failed publish the socket
/// is dropped and the next forward reconnects.
pub struct MqttPublisher {
    broker_addr: String,
    topic: String,
    id: String,
    stream: Option<TcpStream>,
}

impl MqttPublisher {
    pub fn new(
        broker_addr: impl Into<String>,
        topic: impl Into<String>,
        id: impl Into<String>,
    ) -> Self {
        Self {
            broker_addr: broker_addr.into(),
            topic: topic.into(),
            id: id.into(),
            stream: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    pub async fn connect(&mut self) -> Result<(), LinkError> {
        let mut stream = TcpStream::connect(&self.broker_addr).await?;
        debug!("Connected to {}", self.broker_addr);

        stream.write_all(&build_connect_packet(&self.id)?).await?;
        debug!("Connect sent - awaiting ack");

        let mut connack_buf = [0u8; CONNACK_LEN];
        tokio::time::timeout(CONNACK_TIMEOUT, stream.read_exact(&mut connack_buf))
            .await
            .map_err(|_| LinkError::Timeout)??;
        parse_connack(&connack_buf)?;

        info!("Connection to {} ACKed", self.broker_addr);
        self.stream = Some(stream);
        Ok(())
    }

    pub async fn publish(&mut self, payload: &[u8]) -> Result<(), LinkError> {
        if self.stream.as_ref().is_some_and(hung_up) {
            info!("Broker closed the connection, reconnecting");
            self.stream = None;
        }
        if self.stream.is_none() {
            self.connect().await?;
        }
        let packet = build_publish_packet(&self.topic, payload)?;
        let Some(stream) = self.stream.as_mut() else {
            return Err(LinkError::Forward("not connected".to_string()));
        };

        if let Err(e) = stream.write_all(&packet).await {
            warn!("Publish failed, dropping connection: {e}");
            self.stream = None;
            return Err(e.into());
        }
        Ok(())
    }
}

/// A QoS 0 publisher expects nothing from the broker after CONNACK, so a
/// zero-length read means the broker has sent FIN. Writes into such a socket
/// still succeed once, which would lose the reading.
fn hung_up(stream: &TcpStream) -> bool {
    let mut scratch = [0u8; 64];
    match stream.try_read(&mut scratch) {
        Ok(0) => true,
        Ok(n) => {
            debug!(n, "Ignoring unsolicited bytes from broker");
            false
        }
        Err(e) if e.kind() == io::ErrorKind::WouldBlock => false,
        Err(e) => {
            warn!("Broker connection is broken: {e}");
            true
        }
    }
}

impl Forwarder for MqttPublisher {
    async fn forward(&mut self, reading: &Reading) -> Result<ForwardAck, LinkError> {
        let payload = reading
            .to_live_payload()
            .map_err(|e| LinkError::Forward(e.to_string()))?;
        self.publish(&payload).await?;
        info!("Published reading to {}", self.topic);
        Ok(ForwardAck {
            sink: "mqtt",
            message: None,
        })
    }
}
