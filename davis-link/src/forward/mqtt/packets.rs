use mqttrs::{
    Connack, Connect, ConnectReturnCode, Packet, Protocol, Publish, QosPid, decode_slice,
    encode_slice,
};

use crate::error::LinkError;

/// CONNACK is small (2-byte fixed header + 2-byte variable header)
pub const CONNACK_LEN: usize = 4;

// fixed header, remaining length and the topic length prefix
const PUBLISH_OVERHEAD: usize = 8;

pub fn build_connect_packet(client_id: &str) -> Result<Vec<u8>, LinkError> {
    let packet: Packet = Connect {
        protocol: Protocol::MQTT311,
        keep_alive: 120,
        client_id,
        clean_session: true,
        last_will: None,
        username: None,
        password: None,
    }
    .into();

    let mut buf = vec![0u8; 64 + client_id.len()];
    let packet_length = encode_slice(&packet, &mut buf)?;
    buf.truncate(packet_length);
    Ok(buf)
}

pub fn parse_connack(buf: &[u8]) -> Result<(), LinkError> {
    match decode_slice(buf)? {
        Some(Packet::Connack(Connack { code, .. })) if code == ConnectReturnCode::Accepted => {
            Ok(())
        }
        Some(Packet::Connack(Connack { code, .. })) => Err(LinkError::Forward(format!(
            "broker refused connection: {code:?}"
        ))),
        other => Err(LinkError::Forward(format!(
            "expected CONNACK, got {other:?}"
        ))),
    }
}

pub fn build_publish_packet(topic: &str, payload: &[u8]) -> Result<Vec<u8>, LinkError> {
    let packet: Packet = Publish {
        dup: false,
        qospid: QosPid::AtMostOnce,
        retain: false,
        topic_name: topic,
        payload,
    }
    .into();

    let mut buf = vec![0u8; PUBLISH_OVERHEAD + topic.len() + payload.len()];
    let packet_length = encode_slice(&packet, &mut buf)?;
    buf.truncate(packet_length);
    Ok(buf)
}
