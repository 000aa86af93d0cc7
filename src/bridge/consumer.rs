//! Broker consumer abstraction.
//!
//! The bridge only talks to the broker through [`BrokerConsumer`], so a
//! connection can be driven by Kafka in production and by a scripted
//! consumer in tests.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::PropertyMap;

/// A single record pulled from a topic partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerMessage {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    /// Milliseconds since the Unix epoch, if the broker supplied one.
    pub timestamp: Option<i64>,
    pub key: Option<Vec<u8>>,
    pub value: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TopicPartition {
    pub topic: String,
    pub partition: i32,
}

/// Everything a consumer can report to the bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrokerEvent {
    /// The group coordinator handed us these partitions.
    Assigned(Vec<TopicPartition>),
    /// The group coordinator took these partitions away.
    Revoked(Vec<TopicPartition>),
    Message(BrokerMessage),
    /// Caught up with the tail of a partition.
    PartitionEof { partition: i32 },
    Error(String),
}

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("Can't create consumer: {0}")]
    Create(String),

    #[error("Can't get metadata: {0}")]
    Metadata(String),

    #[error("Can't subscribe consumer: {0}")]
    Subscribe(String),

    #[error("Can't change assignment: {0}")]
    Assignment(String),
}

/// Effective librdkafka configuration for one connection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConsumerSettings {
    pub consumer: PropertyMap,
    pub default_topic: PropertyMap,
}

/// A consumer owned by exactly one connection.
#[async_trait]
pub trait BrokerConsumer: Send {
    /// Names of every topic the cluster currently knows about.
    async fn topic_names(&mut self, timeout: Duration) -> Result<HashSet<String>, BrokerError>;

    fn subscribe(&mut self, topics: &[String]) -> Result<(), BrokerError>;

    /// Wait for the next event. Must be cancel safe: it is raced against
    /// the connection's shutdown signal.
    async fn next_event(&mut self) -> BrokerEvent;

    fn assign(&mut self, partitions: &[TopicPartition]) -> Result<(), BrokerError>;

    /// Release partitions the group coordinator revoked.
    fn unassign(&mut self, partitions: &[TopicPartition]) -> Result<(), BrokerError>;

    fn unsubscribe(&mut self);

    /// Leave the group and release the client. Taking the box guarantees
    /// this happens at most once.
    fn close(self: Box<Self>);
}

/// Creates one consumer per accepted connection.
pub trait ConsumerFactory: Send + Sync {
    fn create(&self, settings: &ConsumerSettings) -> Result<Box<dyn BrokerConsumer>, BrokerError>;
}
