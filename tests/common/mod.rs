//! Shared utilities for bridge and listener integration tests.
#![allow(dead_code)]

use std::collections::HashSet;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::ws::Message;
use futures::Sink;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use kws::bridge::{
    BridgeContext, BrokerConsumer, BrokerError, BrokerEvent, BrokerMessage, ConnectionParams,
    ConsumerFactory, ConsumerSettings, TopicPartition,
};
use kws::config::{ConfigDocument, EndpointDescription};
use kws::http::AssetSource;
use kws::net::{ConnectionId, ConnectionTracker};
use kws::routing::{EndpointConfig, MessageType};
use kws::{build_listeners, ListenerServer};

/// Consumer calls observed by the scripted broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Subscribe(Vec<String>),
    Assign(Vec<TopicPartition>),
    Unassign(Vec<TopicPartition>),
    Unsubscribe,
    Close,
}

/// Broker call a scripted consumer refuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fault {
    None,
    Subscribe,
    Metadata,
}

/// Broker stand-in that replays events pushed through a channel.
pub struct ScriptedFactory {
    known: HashSet<String>,
    calls: Arc<Mutex<Vec<Call>>>,
    settings: Arc<Mutex<Vec<ConsumerSettings>>>,
    events: Mutex<Option<mpsc::UnboundedReceiver<BrokerEvent>>>,
    fault: Fault,
}

impl ScriptedFactory {
    /// A broker knowing `topics`, plus the sender that feeds its events.
    pub fn new(topics: &[&str]) -> (Arc<Self>, mpsc::UnboundedSender<BrokerEvent>) {
        Self::build(topics, Fault::None)
    }

    /// Like [`ScriptedFactory::new`] but every subscribe is refused.
    pub fn refusing_subscribe(topics: &[&str]) -> (Arc<Self>, mpsc::UnboundedSender<BrokerEvent>) {
        Self::build(topics, Fault::Subscribe)
    }

    /// Like [`ScriptedFactory::new`] but the cluster metadata is unreachable.
    pub fn failing_metadata(topics: &[&str]) -> (Arc<Self>, mpsc::UnboundedSender<BrokerEvent>) {
        Self::build(topics, Fault::Metadata)
    }

    fn build(topics: &[&str], fault: Fault) -> (Arc<Self>, mpsc::UnboundedSender<BrokerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let factory = Arc::new(Self {
            known: topics.iter().map(|t| t.to_string()).collect(),
            calls: Arc::new(Mutex::new(Vec::new())),
            settings: Arc::new(Mutex::new(Vec::new())),
            events: Mutex::new(Some(rx)),
            fault,
        });
        (factory, tx)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Settings passed to every `create`, in order.
    pub fn created(&self) -> Vec<ConsumerSettings> {
        self.settings.lock().unwrap().clone()
    }
}

impl ConsumerFactory for ScriptedFactory {
    fn create(&self, settings: &ConsumerSettings) -> Result<Box<dyn BrokerConsumer>, BrokerError> {
        self.settings.lock().unwrap().push(settings.clone());
        let events = self
            .events
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| BrokerError::Create("scripted broker already in use".into()))?;
        Ok(Box::new(ScriptedConsumer {
            known: self.known.clone(),
            calls: Arc::clone(&self.calls),
            events,
            fault: self.fault,
        }))
    }
}

pub struct ScriptedConsumer {
    known: HashSet<String>,
    calls: Arc<Mutex<Vec<Call>>>,
    events: mpsc::UnboundedReceiver<BrokerEvent>,
    fault: Fault,
}

impl ScriptedConsumer {
    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl BrokerConsumer for ScriptedConsumer {
    async fn topic_names(&mut self, _timeout: Duration) -> Result<HashSet<String>, BrokerError> {
        if self.fault == Fault::Metadata {
            return Err(BrokerError::Metadata("broker unreachable".into()));
        }
        Ok(self.known.clone())
    }

    fn subscribe(&mut self, topics: &[String]) -> Result<(), BrokerError> {
        self.record(Call::Subscribe(topics.to_vec()));
        if self.fault == Fault::Subscribe {
            return Err(BrokerError::Subscribe("refused".into()));
        }
        Ok(())
    }

    async fn next_event(&mut self) -> BrokerEvent {
        match self.events.recv().await {
            Some(event) => event,
            None => std::future::pending().await,
        }
    }

    fn assign(&mut self, partitions: &[TopicPartition]) -> Result<(), BrokerError> {
        self.record(Call::Assign(partitions.to_vec()));
        Ok(())
    }

    fn unassign(&mut self, partitions: &[TopicPartition]) -> Result<(), BrokerError> {
        self.record(Call::Unassign(partitions.to_vec()));
        Ok(())
    }

    fn unsubscribe(&mut self) {
        self.record(Call::Unsubscribe);
    }

    fn close(self: Box<Self>) {
        self.record(Call::Close);
    }
}

/// Write half of a fake websocket. Frames go to a channel, closes are
/// counted.
pub struct RecordingSink {
    frames: mpsc::UnboundedSender<Message>,
    closes: Arc<AtomicUsize>,
    fail_writes: bool,
}

impl RecordingSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Message>, Arc<AtomicUsize>) {
        Self::build(false)
    }

    /// A sink whose every write fails, as if the peer vanished.
    pub fn broken() -> (Self, mpsc::UnboundedReceiver<Message>, Arc<AtomicUsize>) {
        Self::build(true)
    }

    fn build(fail_writes: bool) -> (Self, mpsc::UnboundedReceiver<Message>, Arc<AtomicUsize>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let closes = Arc::new(AtomicUsize::new(0));
        let sink = Self {
            frames: tx,
            closes: Arc::clone(&closes),
            fail_writes,
        };
        (sink, rx, closes)
    }
}

impl Sink<Message> for RecordingSink {
    type Error = String;

    fn poll_ready(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), String>> {
        Poll::Ready(Ok(()))
    }

    fn start_send(self: Pin<&mut Self>, item: Message) -> Result<(), String> {
        if self.fail_writes {
            return Err("broken pipe".into());
        }
        self.frames.send(item).map_err(|e| e.to_string())
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), String>> {
        Poll::Ready(Ok(()))
    }

    fn poll_close(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), String>> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Poll::Ready(Ok(()))
    }
}

/// Read half of a fake websocket, driven by the returned sender.
pub type ClientFrames = futures::channel::mpsc::UnboundedReceiver<Result<Message, String>>;

pub fn client() -> (
    futures::channel::mpsc::UnboundedSender<Result<Message, String>>,
    ClientFrames,
) {
    futures::channel::mpsc::unbounded()
}

pub fn endpoint(
    topics: &[&str],
    message_details: bool,
    message_type: MessageType,
) -> Arc<EndpointConfig> {
    Arc::new(EndpointConfig {
        consumer: [
            ("metadata.broker.list", "localhost:9092"),
            ("group.id", "bridge-tests"),
        ]
        .into_iter()
        .collect(),
        default_topic: Default::default(),
        topics: topics.iter().map(|t| t.to_string()).collect(),
        message_details,
        message_type,
        compression: false,
    })
}

pub fn context(endpoint: Arc<EndpointConfig>, params: ConnectionParams) -> BridgeContext {
    BridgeContext {
        id: ConnectionId::next(),
        peer: "127.0.0.1:50000".into(),
        endpoint,
        params,
    }
}

pub fn record(topic: &str, offset: i64, value: &[u8]) -> BrokerEvent {
    BrokerEvent::Message(BrokerMessage {
        topic: topic.into(),
        partition: 0,
        offset,
        timestamp: Some(1_700_000_000_000),
        key: None,
        value: value.to_vec(),
    })
}

/// Endpoint description as it would appear in a config file.
pub fn description(address: &str, prefix: &str, topics: &[&str]) -> EndpointDescription {
    EndpointDescription {
        consumer: [
            ("metadata.broker.list", "localhost:9092"),
            ("group.id", "listener-tests"),
        ]
        .into_iter()
        .collect(),
        topics: topics.iter().map(|t| t.to_string()).collect(),
        address: address.into(),
        endpoint_prefix: prefix.into(),
        ..Default::default()
    }
}

/// Build the first listener of `endpoints` and serve it on an ephemeral
/// local port.
pub async fn start_listener(
    endpoints: Vec<EndpointDescription>,
    factory: Arc<dyn ConsumerFactory>,
) -> SocketAddr {
    start_tracked_listener(endpoints, factory).await.0
}

/// Like [`start_listener`], also returning the listener's connection tracker.
pub async fn start_tracked_listener(
    endpoints: Vec<EndpointDescription>,
    factory: Arc<dyn ConsumerFactory>,
) -> (SocketAddr, ConnectionTracker) {
    let doc = ConfigDocument {
        endpoints,
        ..Default::default()
    };
    start_document(&doc, factory).await
}

/// Serve the first listener of a whole config document over plain HTTP,
/// whatever its TLS settings.
pub async fn start_document(
    doc: &ConfigDocument,
    factory: Arc<dyn ConsumerFactory>,
) -> (SocketAddr, ConnectionTracker) {
    let definition = build_listeners(doc)
        .unwrap()
        .into_iter()
        .next()
        .expect("at least one listener");

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = ListenerServer::new(definition, factory, AssetSource::Embedded);
    let tracker = server.tracker();
    tokio::spawn(server.serve(listener));
    (addr, tracker)
}
