//! Kafka to websocket bridging subsystem.
//!
//! # Data Flow
//! ```text
//! Upgraded websocket + EndpointConfig + query overrides
//!     → settings.rs (effective consumer config, topic list)
//!     → consumer.rs (BrokerConsumer / ConsumerFactory seam)
//!         → kafka.rs (librdkafka StreamConsumer)
//!     → connection.rs (read-detector + event-pump, teardown)
//!         → encoder.rs (raw value or JSON envelope)
//!     → one binary frame per record
//! ```
//!
//! # Design Decisions
//! - One consumer per connection, never shared
//! - Topics are checked against cluster metadata before subscribing
//! - Frames are always binary; the message type only shapes the envelope
//! - Per-connection failures are logged and close that socket only

pub mod connection;
pub mod consumer;
pub mod encoder;
pub mod kafka;
pub mod settings;

pub use connection::{run_bridge, BridgeContext, CloseReason};
pub use consumer::{
    BrokerConsumer, BrokerError, BrokerEvent, BrokerMessage, ConsumerFactory, ConsumerSettings,
    TopicPartition,
};
pub use encoder::encode;
pub use kafka::KafkaConsumerFactory;
pub use settings::{ConnectionParams, METADATA_TIMEOUT, SESSION_TIMEOUT_MS};
