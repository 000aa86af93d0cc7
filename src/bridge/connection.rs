//! Per-connection bridge between one consumer and one websocket.
//!
//! # Lifecycle
//! ```text
//! resolve topics → create consumer → check topics exist
//!     → spawn read-detector → subscribe → event-pump
//!     → unsubscribe → close consumer → close socket
//! ```
//!
//! The read-detector and the event-pump share a [`ShutdownSignal`]; whichever
//! side stops first triggers it and the pump tears everything down. The
//! socket is closed in exactly one place, after the consumer is gone.

use std::fmt::{self, Display};
use std::sync::Arc;

use axum::extract::ws::Message;
use futures_util::{Sink, SinkExt, Stream, StreamExt};

use crate::bridge::consumer::{BrokerConsumer, BrokerEvent, ConsumerFactory};
use crate::bridge::encoder::encode;
use crate::bridge::settings::{ConnectionParams, METADATA_TIMEOUT};
use crate::lifecycle::ShutdownSignal;
use crate::net::connection::ConnectionId;
use crate::observability::metrics;
use crate::routing::EndpointConfig;

/// Why a bridged connection ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    NoTopics,
    ConsumerFailed(String),
    MetadataFailed(String),
    MissingTopic(String),
    SubscribeFailed(String),
    ClientClosed,
    WriteFailed(String),
    BrokerError(String),
}

impl CloseReason {
    /// Short label used for metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            CloseReason::NoTopics => "no_topics",
            CloseReason::ConsumerFailed(_) => "consumer_failed",
            CloseReason::MetadataFailed(_) => "metadata_failed",
            CloseReason::MissingTopic(_) => "missing_topic",
            CloseReason::SubscribeFailed(_) => "subscribe_failed",
            CloseReason::ClientClosed => "client_closed",
            CloseReason::WriteFailed(_) => "write_failed",
            CloseReason::BrokerError(_) => "broker_error",
        }
    }
}

impl Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseReason::NoTopics => write!(f, "no topic(s)"),
            CloseReason::ConsumerFailed(e) => write!(f, "{}", e),
            CloseReason::MetadataFailed(e) => write!(f, "{}", e),
            CloseReason::MissingTopic(t) => write!(f, "topic [{}] doesn't exist", t),
            CloseReason::SubscribeFailed(e) => write!(f, "{}", e),
            CloseReason::ClientClosed => write!(f, "client closed"),
            CloseReason::WriteFailed(e) => write!(f, "websocket write error: {}", e),
            CloseReason::BrokerError(e) => write!(f, "broker error: {}", e),
        }
    }
}

/// What the listener knows about an upgraded connection.
#[derive(Debug, Clone)]
pub struct BridgeContext {
    pub id: ConnectionId,
    pub peer: String,
    pub endpoint: Arc<EndpointConfig>,
    pub params: ConnectionParams,
}

/// Bridge one upgraded websocket, split into its read and write halves,
/// until either side ends. Always closes the write half exactly once.
pub async fn run_bridge<R, RE, W, WE>(
    ctx: BridgeContext,
    factory: &dyn ConsumerFactory,
    reader: R,
    mut writer: W,
) -> CloseReason
where
    R: Stream<Item = Result<Message, RE>> + Unpin + Send + 'static,
    RE: Display + Send + 'static,
    W: Sink<Message, Error = WE> + Unpin + Send,
    WE: Display,
{
    let reason = match prepare(&ctx, factory).await {
        Ok((consumer, topics)) => stream(&ctx, consumer, &topics, reader, &mut writer).await,
        Err(reason) => reason,
    };

    if let Err(e) = writer.close().await {
        tracing::debug!(connection_id = %ctx.id, error = %e, "WebSocket close after teardown");
    }

    match &reason {
        CloseReason::ClientClosed => {
            tracing::info!(connection_id = %ctx.id, peer = %ctx.peer, "Websocket closed")
        }
        other => tracing::warn!(
            connection_id = %ctx.id,
            peer = %ctx.peer,
            reason = %other,
            "Websocket closed"
        ),
    }
    metrics::connection_closed(reason.as_str());
    reason
}

/// Resolve topics, create the consumer and confirm every topic exists.
/// Nothing is subscribed yet.
async fn prepare(
    ctx: &BridgeContext,
    factory: &dyn ConsumerFactory,
) -> Result<(Box<dyn BrokerConsumer>, Vec<String>), CloseReason> {
    let topics = ctx.endpoint.resolve_topics(&ctx.params);
    if topics.is_empty() {
        return Err(CloseReason::NoTopics);
    }

    let settings = ctx.endpoint.consumer_settings(&ctx.params);
    let mut consumer = factory
        .create(&settings)
        .map_err(|e| CloseReason::ConsumerFailed(e.to_string()))?;

    let known = match consumer.topic_names(METADATA_TIMEOUT).await {
        Ok(known) => known,
        Err(e) => {
            consumer.close();
            return Err(CloseReason::MetadataFailed(e.to_string()));
        }
    };
    if let Some(missing) = topics.iter().find(|t| !known.contains(*t)) {
        let missing = missing.clone();
        consumer.close();
        return Err(CloseReason::MissingTopic(missing));
    }

    Ok((consumer, topics))
}

async fn stream<R, RE, W, WE>(
    ctx: &BridgeContext,
    mut consumer: Box<dyn BrokerConsumer>,
    topics: &[String],
    reader: R,
    writer: &mut W,
) -> CloseReason
where
    R: Stream<Item = Result<Message, RE>> + Unpin + Send + 'static,
    RE: Display + Send + 'static,
    W: Sink<Message, Error = WE> + Unpin + Send,
    WE: Display,
{
    let shutdown = ShutdownSignal::new();
    let detector = tokio::spawn(read_detector(ctx.id, reader, shutdown.clone()));

    let reason = match consumer.subscribe(topics) {
        Ok(()) => {
            tracing::info!(
                connection_id = %ctx.id,
                peer = %ctx.peer,
                topics = ?topics,
                "Websocket opened"
            );
            let reason = pump(ctx, consumer.as_mut(), writer, &shutdown).await;
            consumer.unsubscribe();
            reason
        }
        Err(e) => CloseReason::SubscribeFailed(e.to_string()),
    };

    consumer.close();
    shutdown.trigger();
    detector.abort();
    reason
}

/// Watch the client side. No application messages are expected, so data
/// frames are ignored; a close frame, read error or end of stream stops
/// the connection.
async fn read_detector<R, RE>(id: ConnectionId, mut reader: R, shutdown: ShutdownSignal)
where
    R: Stream<Item = Result<Message, RE>> + Unpin,
    RE: Display,
{
    while let Some(frame) = reader.next().await {
        match frame {
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                tracing::warn!(connection_id = %id, error = %e, "WebSocket read error");
                break;
            }
        }
    }
    shutdown.trigger();
}

async fn pump<W, WE>(
    ctx: &BridgeContext,
    consumer: &mut dyn BrokerConsumer,
    writer: &mut W,
    shutdown: &ShutdownSignal,
) -> CloseReason
where
    W: Sink<Message, Error = WE> + Unpin + Send,
    WE: Display,
{
    let endpoint = &ctx.endpoint;
    loop {
        let event = tokio::select! {
            biased;
            _ = shutdown.triggered() => return CloseReason::ClientClosed,
            event = consumer.next_event() => event,
        };

        match event {
            BrokerEvent::Assigned(partitions) => {
                tracing::debug!(connection_id = %ctx.id, ?partitions, "Partitions assigned");
                if let Err(e) = consumer.assign(&partitions) {
                    tracing::warn!(connection_id = %ctx.id, error = %e, "Assign failed");
                }
            }
            BrokerEvent::Revoked(partitions) => {
                tracing::debug!(connection_id = %ctx.id, ?partitions, "Partitions revoked");
                if let Err(e) = consumer.unassign(&partitions) {
                    tracing::warn!(connection_id = %ctx.id, error = %e, "Unassign failed");
                }
            }
            BrokerEvent::Message(message) => {
                let payload = encode(&message, endpoint.message_details, endpoint.message_type);
                tracing::trace!(
                    connection_id = %ctx.id,
                    topic = %message.topic,
                    partition = message.partition,
                    offset = message.offset,
                    bytes = payload.len(),
                    "Forwarding message"
                );
                if let Err(e) = writer.send(Message::Binary(payload.into())).await {
                    shutdown.trigger();
                    return CloseReason::WriteFailed(e.to_string());
                }
                metrics::message_forwarded();
            }
            BrokerEvent::PartitionEof { .. } => {}
            BrokerEvent::Error(e) => return CloseReason::BrokerError(e),
        }
    }
}
