//! Outbound payload encoding.
//!
//! Without details the frame carries the raw record value. With details it
//! carries a JSON envelope whose `value` is shaped by the message type:
//!
//! | type     | `value` field                          |
//! |----------|----------------------------------------|
//! | `json`   | the record value embedded as JSON      |
//! | `text`   | the record value as a (lossy) string   |
//! | `binary` | the record value as base64             |
//!
//! A value that is not valid JSON under `json` falls back to the raw bytes.

use std::borrow::Cow;

use base64::Engine as _;
use serde::Serialize;
use serde_json::value::RawValue;

use crate::bridge::consumer::BrokerMessage;
use crate::observability::metrics;
use crate::routing::MessageType;

#[derive(Serialize)]
struct Envelope<'a, V: Serialize> {
    topic: &'a str,
    partition: i32,
    offset: i64,
    timestamp: Option<i64>,
    key: Option<Cow<'a, str>>,
    value: V,
}

/// Encode one record for the wire. Never fails.
pub fn encode(message: &BrokerMessage, details: bool, message_type: MessageType) -> Vec<u8> {
    if !details {
        return message.value.clone();
    }
    match encode_envelope(message, message_type) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::debug!(
                topic = %message.topic,
                partition = message.partition,
                offset = message.offset,
                error = %e,
                "Envelope encoding failed, sending raw value"
            );
            metrics::record_encode_fallback();
            message.value.clone()
        }
    }
}

/// Serialize the detailed envelope for `message`.
pub fn encode_envelope(
    message: &BrokerMessage,
    message_type: MessageType,
) -> Result<Vec<u8>, serde_json::Error> {
    match message_type {
        MessageType::Json => {
            let value: &RawValue = serde_json::from_slice(&message.value)?;
            serde_json::to_vec(&envelope(message, value))
        }
        MessageType::Text => {
            serde_json::to_vec(&envelope(message, String::from_utf8_lossy(&message.value)))
        }
        MessageType::Binary => {
            let value = base64::engine::general_purpose::STANDARD.encode(&message.value);
            serde_json::to_vec(&envelope(message, value))
        }
    }
}

fn envelope<V: Serialize>(message: &BrokerMessage, value: V) -> Envelope<'_, V> {
    Envelope {
        topic: &message.topic,
        partition: message.partition,
        offset: message.offset,
        timestamp: message.timestamp,
        key: message.key.as_deref().map(String::from_utf8_lossy),
        value,
    }
}
