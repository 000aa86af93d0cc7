//! Routing table construction.
//!
//! # Responsibilities
//! - Check TLS material is all-or-nothing and present on disk
//! - Normalize every endpoint's test and websocket paths
//! - Reject endpoints without a broker list or consumer group
//! - Reject path collisions within one listener
//! - Merge endpoints sharing an address into one `ListenerDefinition`
//!
//! # Design Decisions
//! - First violation wins; the caller treats it as fatal
//! - Output is immutable and owned by exactly one listener task
//! - Listeners keep the order in which their address first appears

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;

use crate::config::{ConfigDocument, EndpointDescription, PropertyMap};
use crate::routing::paths::normalize_paths;

pub const BROKER_LIST_PROPERTY: &str = "metadata.broker.list";
pub const GROUP_ID_PROPERTY: &str = "group.id";

/// Errors raised while validating the configuration into listeners.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RoutingError {
    #[error("Both certificate and key file must be defined")]
    TlsIncomplete,

    #[error("{kind} file {path} does not exist")]
    TlsFileMissing { kind: &'static str, path: String },

    #[error("test path and websocket path can't be same [{0}]")]
    SamePath(String),

    #[error("{property} must be defined, address [{address}]")]
    MissingProperty {
        property: &'static str,
        address: String,
    },

    #[error("test path [{0}] already defined")]
    DuplicateTestPath(String),

    #[error("test path [{0}] already defined as websocket path")]
    TestPathIsWebSocket(String),

    #[error("websocket path [{0}] already defined")]
    DuplicateWebSocketPath(String),

    #[error("websocket path [{0}] already defined as test path")]
    WebSocketPathIsTest(String),

    #[error("invalid message.type [{0}]")]
    InvalidMessageType(String),
}

/// Payload shaping applied to detailed messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MessageType {
    #[default]
    Json,
    Text,
    Binary,
}

impl FromStr for MessageType {
    type Err = RoutingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "json" => Ok(MessageType::Json),
            "text" => Ok(MessageType::Text),
            "binary" => Ok(MessageType::Binary),
            other => Err(RoutingError::InvalidMessageType(other.to_string())),
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MessageType::Json => "json",
            MessageType::Text => "text",
            MessageType::Binary => "binary",
        })
    }
}

/// Certificate and key shared by every TLS listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsMaterial {
    pub cert_file: PathBuf,
    pub key_file: PathBuf,
}

/// Resolved settings for one websocket path.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointConfig {
    pub consumer: PropertyMap,
    pub default_topic: PropertyMap,
    pub topics: Vec<String>,
    pub message_details: bool,
    pub message_type: MessageType,
    pub compression: bool,
}

/// Everything one listener needs to serve its address.
#[derive(Debug, Clone)]
pub struct ListenerDefinition {
    pub address: String,
    pub tls: Option<TlsMaterial>,
    /// Test page path → paired websocket path.
    pub test_pages: BTreeMap<String, String>,
    /// Websocket path → endpoint settings.
    pub websockets: BTreeMap<String, Arc<EndpointConfig>>,
}

impl ListenerDefinition {
    fn new(address: &str, tls: Option<TlsMaterial>) -> Self {
        Self {
            address: address.to_string(),
            tls,
            test_pages: BTreeMap::new(),
            websockets: BTreeMap::new(),
        }
    }

    pub fn is_tls(&self) -> bool {
        self.tls.is_some()
    }

    /// Validate one endpoint against the paths accumulated so far and add it.
    fn add_endpoint(&mut self, desc: &EndpointDescription) -> Result<(), RoutingError> {
        let paths = normalize_paths(
            &desc.endpoint_prefix,
            &desc.endpoint_test,
            &desc.endpoint_websocket,
        );

        if paths.test == paths.websocket {
            return Err(RoutingError::SamePath(paths.test));
        }
        for property in [BROKER_LIST_PROPERTY, GROUP_ID_PROPERTY] {
            if desc.consumer.non_empty(property).is_none() {
                return Err(RoutingError::MissingProperty {
                    property,
                    address: desc.address.clone(),
                });
            }
        }
        if self.test_pages.contains_key(&paths.test) {
            return Err(RoutingError::DuplicateTestPath(paths.test));
        }
        if self.websockets.contains_key(&paths.test) {
            return Err(RoutingError::TestPathIsWebSocket(paths.test));
        }
        if self.websockets.contains_key(&paths.websocket) {
            return Err(RoutingError::DuplicateWebSocketPath(paths.websocket));
        }
        if self.test_pages.contains_key(&paths.websocket) {
            return Err(RoutingError::WebSocketPathIsTest(paths.websocket));
        }
        let message_type: MessageType = desc.message_type.parse()?;

        tracing::debug!(
            address = %self.address,
            test_path = %paths.test,
            websocket_path = %paths.websocket,
            topics = ?desc.topics,
            %message_type,
            "Endpoint registered"
        );

        self.test_pages.insert(paths.test, paths.websocket.clone());
        self.websockets.insert(
            paths.websocket,
            Arc::new(EndpointConfig {
                consumer: desc.consumer.clone(),
                default_topic: desc.default_topic.clone(),
                topics: desc.topics.clone(),
                message_details: desc.message_details,
                message_type,
                compression: desc.compression,
            }),
        );
        Ok(())
    }
}

/// Validate the document and group its endpoints into listeners.
pub fn build_listeners(doc: &ConfigDocument) -> Result<Vec<ListenerDefinition>, RoutingError> {
    let tls = resolve_tls(doc.tls_cert_file.as_deref(), doc.tls_key_file.as_deref())?;

    let mut listeners: Vec<ListenerDefinition> = Vec::new();
    let mut by_address: HashMap<&str, usize> = HashMap::new();

    for desc in &doc.endpoints {
        let idx = *by_address.entry(desc.address.as_str()).or_insert_with(|| {
            listeners.push(ListenerDefinition::new(&desc.address, tls.clone()));
            listeners.len() - 1
        });
        listeners[idx].add_endpoint(desc)?;
    }

    Ok(listeners)
}

fn resolve_tls(
    cert: Option<&str>,
    key: Option<&str>,
) -> Result<Option<TlsMaterial>, RoutingError> {
    let cert = cert.filter(|c| !c.is_empty());
    let key = key.filter(|k| !k.is_empty());

    match (cert, key) {
        (None, None) => Ok(None),
        (Some(cert), Some(key)) => {
            if !Path::new(cert).exists() {
                return Err(RoutingError::TlsFileMissing {
                    kind: "certificate",
                    path: cert.to_string(),
                });
            }
            if !Path::new(key).exists() {
                return Err(RoutingError::TlsFileMissing {
                    kind: "key",
                    path: key.to_string(),
                });
            }
            Ok(Some(TlsMaterial {
                cert_file: PathBuf::from(cert),
                key_file: PathBuf::from(key),
            }))
        }
        _ => Err(RoutingError::TlsIncomplete),
    }
}
