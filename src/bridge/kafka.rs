//! Kafka-backed consumer built on librdkafka.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rdkafka::client::NativeClient;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, ConsumerContext, RebalanceProtocol, StreamConsumer};
use rdkafka::error::{KafkaError, RDKafkaErrorCode};
use rdkafka::message::Message as _;
use rdkafka::types::RDKafkaRespErr;
use rdkafka::{ClientContext, TopicPartitionList};
use tokio::sync::mpsc;

use crate::bridge::consumer::{
    BrokerConsumer, BrokerError, BrokerEvent, BrokerMessage, ConsumerFactory, ConsumerSettings,
    TopicPartition,
};

/// Hands rebalance notifications to the bridge instead of applying them.
///
/// librdkafka keeps the group rebalance pending until the assignment is
/// changed, which happens when the bridge handles the forwarded event
/// through [`BrokerConsumer::assign`] / [`BrokerConsumer::unassign`].
struct RebalanceForwarder {
    events: mpsc::UnboundedSender<BrokerEvent>,
}

impl ClientContext for RebalanceForwarder {}

impl ConsumerContext for RebalanceForwarder {
    fn rebalance(
        &self,
        _native_client: &NativeClient,
        err: RDKafkaRespErr,
        tpl: &mut TopicPartitionList,
    ) {
        let event = match err {
            RDKafkaRespErr::RD_KAFKA_RESP_ERR__ASSIGN_PARTITIONS => {
                BrokerEvent::Assigned(partitions(tpl))
            }
            RDKafkaRespErr::RD_KAFKA_RESP_ERR__REVOKE_PARTITIONS => {
                BrokerEvent::Revoked(partitions(tpl))
            }
            other => BrokerEvent::Error(format!(
                "rebalance failed: {}",
                RDKafkaErrorCode::from(other)
            )),
        };
        // Receiver gone means the connection is already tearing down.
        let _ = self.events.send(event);
    }
}

fn partitions(tpl: &TopicPartitionList) -> Vec<TopicPartition> {
    tpl.elements()
        .iter()
        .map(|e| TopicPartition {
            topic: e.topic().to_string(),
            partition: e.partition(),
        })
        .collect()
}

fn partition_list(partitions: &[TopicPartition]) -> TopicPartitionList {
    let mut tpl = TopicPartitionList::with_capacity(partitions.len());
    for p in partitions {
        tpl.add_partition(&p.topic, p.partition);
    }
    tpl
}

/// Builds a [`KafkaConsumer`] per connection.
#[derive(Debug, Clone, Copy, Default)]
pub struct KafkaConsumerFactory;

impl ConsumerFactory for KafkaConsumerFactory {
    fn create(&self, settings: &ConsumerSettings) -> Result<Box<dyn BrokerConsumer>, BrokerError> {
        Ok(Box::new(KafkaConsumer::connect(settings)?))
    }
}

pub struct KafkaConsumer {
    consumer: Arc<StreamConsumer<RebalanceForwarder>>,
    rebalances: mpsc::UnboundedReceiver<BrokerEvent>,
}

impl KafkaConsumer {
    fn connect(settings: &ConsumerSettings) -> Result<Self, BrokerError> {
        let mut config = ClientConfig::new();
        // librdkafka applies topic-level properties set on the global
        // config to its default topic config.
        for (key, value) in settings
            .consumer
            .rendered()
            .chain(settings.default_topic.rendered())
        {
            config.set(key, value);
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let consumer: StreamConsumer<RebalanceForwarder> = config
            .create_with_context(RebalanceForwarder { events: tx })
            .map_err(|e| BrokerError::Create(e.to_string()))?;

        Ok(Self {
            consumer: Arc::new(consumer),
            rebalances: rx,
        })
    }
}

#[async_trait]
impl BrokerConsumer for KafkaConsumer {
    async fn topic_names(&mut self, timeout: Duration) -> Result<HashSet<String>, BrokerError> {
        let consumer = Arc::clone(&self.consumer);
        tokio::task::spawn_blocking(move || {
            consumer.fetch_metadata(None, timeout).map(|metadata| {
                metadata
                    .topics()
                    .iter()
                    .filter(|t| t.error().is_none())
                    .map(|t| t.name().to_string())
                    .collect()
            })
        })
        .await
        .map_err(|e| BrokerError::Metadata(e.to_string()))?
        .map_err(|e| BrokerError::Metadata(e.to_string()))
    }

    fn subscribe(&mut self, topics: &[String]) -> Result<(), BrokerError> {
        let topics: Vec<&str> = topics.iter().map(String::as_str).collect();
        self.consumer
            .subscribe(&topics)
            .map_err(|e| BrokerError::Subscribe(e.to_string()))
    }

    async fn next_event(&mut self) -> BrokerEvent {
        tokio::select! {
            biased;
            Some(event) = self.rebalances.recv() => event,
            received = self.consumer.recv() => match received {
                Ok(msg) => BrokerEvent::Message(BrokerMessage {
                    topic: msg.topic().to_string(),
                    partition: msg.partition(),
                    offset: msg.offset(),
                    timestamp: msg.timestamp().to_millis(),
                    key: msg.key().map(<[u8]>::to_vec),
                    value: msg.payload().map(<[u8]>::to_vec).unwrap_or_default(),
                }),
                Err(KafkaError::PartitionEOF(partition)) => BrokerEvent::PartitionEof { partition },
                Err(e) => BrokerEvent::Error(e.to_string()),
            },
        }
    }

    fn assign(&mut self, partitions: &[TopicPartition]) -> Result<(), BrokerError> {
        let tpl = partition_list(partitions);
        let applied = match self.consumer.rebalance_protocol() {
            RebalanceProtocol::Cooperative => self.consumer.incremental_assign(&tpl),
            _ => self.consumer.assign(&tpl),
        };
        applied.map_err(|e| BrokerError::Assignment(e.to_string()))
    }

    fn unassign(&mut self, partitions: &[TopicPartition]) -> Result<(), BrokerError> {
        let released = match self.consumer.rebalance_protocol() {
            RebalanceProtocol::Cooperative => self
                .consumer
                .incremental_unassign(&partition_list(partitions)),
            _ => self.consumer.unassign(),
        };
        released.map_err(|e| BrokerError::Assignment(e.to_string()))
    }

    fn unsubscribe(&mut self) {
        self.consumer.unsubscribe();
    }

    fn close(self: Box<Self>) {
        let consumer = self.consumer;
        // Dropping the client blocks while it leaves the group.
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(move || drop(consumer));
            }
            Err(_) => drop(consumer),
        }
    }
}
