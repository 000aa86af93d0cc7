//! Configuration schema definitions.
//!
//! This module defines the on-disk configuration document for the bridge.
//! Key names mirror librdkafka property names verbatim, so most of them are
//! quoted, dotted TOML keys.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Root configuration document.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConfigDocument {
    /// Schema version tag (informational).
    #[serde(rename = "schema.version", default = "default_schema_version")]
    pub schema_version: String,

    /// Path to certificate file (PEM), shared by every listener.
    #[serde(rename = "tls.cert.file", default)]
    pub tls_cert_file: Option<String>,

    /// Path to private key file (PEM), shared by every listener.
    #[serde(rename = "tls.key.file", default)]
    pub tls_key_file: Option<String>,

    /// Logging and metrics settings.
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Declared routes, one per exposed WebSocket endpoint.
    #[serde(rename = "kafka.to.websocket", default)]
    pub endpoints: Vec<EndpointDescription>,
}

impl Default for ConfigDocument {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            tls_cert_file: None,
            tls_key_file: None,
            observability: ObservabilityConfig::default(),
            endpoints: Vec::new(),
        }
    }
}

fn default_schema_version() -> String {
    "1.0".to_string()
}

/// One declared route from topics to a WebSocket path.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct EndpointDescription {
    /// librdkafka consumer properties (`metadata.broker.list`, `group.id`, ...).
    #[serde(rename = "kafka.consumer.config", default)]
    pub consumer: PropertyMap,

    /// librdkafka default topic properties (`auto.offset.reset`, ...).
    #[serde(rename = "kafka.default.topic.config", default)]
    pub default_topic: PropertyMap,

    /// Topics to stream. Empty means the client picks via `?topics=`.
    #[serde(rename = "kafka.topics", default)]
    pub topics: Vec<String>,

    /// Listen address, `host:port` or `:port`.
    #[serde(default)]
    pub address: String,

    #[serde(rename = "endpoint.prefix", default)]
    pub endpoint_prefix: String,

    #[serde(rename = "endpoint.test", default)]
    pub endpoint_test: String,

    #[serde(rename = "endpoint.websocket", default)]
    pub endpoint_websocket: String,

    /// Wrap each message in an envelope with its metadata.
    #[serde(rename = "message.details", default)]
    pub message_details: bool,

    /// Envelope payload shaping: `json`, `text` or `binary`.
    #[serde(rename = "message.type", default)]
    pub message_type: String,

    /// Allow per-message compression negotiation.
    #[serde(default)]
    pub compression: bool,
}

/// A single librdkafka property value.
///
/// The config document may use native TOML scalars; librdkafka only takes
/// strings, so every variant renders to its textual form.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Bool(b) => write!(f, "{}", b),
            PropertyValue::Integer(i) => write!(f, "{}", i),
            PropertyValue::Float(x) => write!(f, "{}", x),
            PropertyValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Text(value.to_string())
    }
}

/// Ordered librdkafka property table.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct PropertyMap(BTreeMap<String, PropertyValue>);

impl PropertyMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.0.get(key)
    }

    /// Returns the rendered value, treating an empty string as unset.
    pub fn non_empty(&self, key: &str) -> Option<String> {
        self.0
            .get(key)
            .map(ToString::to_string)
            .filter(|v| !v.is_empty())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<PropertyValue>) {
        self.0.insert(key.into(), value.into());
    }

    /// Iterate over `(key, rendered value)` pairs.
    pub fn rendered(&self) -> impl Iterator<Item = (&str, String)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.to_string()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<PropertyValue>> FromIterator<(K, V)> for PropertyMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Integer(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::Text(value)
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus scrape endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
