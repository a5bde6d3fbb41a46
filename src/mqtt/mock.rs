//! In-memory stand-ins for the rumqttc client halves

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use rumqttc::{ConnAck, ConnectReturnCode, QoS};
use tokio::sync::mpsc;

use crate::error::MqttError;

use super::handler::Message;
use super::transport::{ClientEvent, EventSource, Transport};

/// A request recorded by [`MockTransport`]
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Publish {
        topic: String,
        qos: QoS,
        retain: bool,
        payload: Vec<u8>,
    },
    Subscribe {
        topic: String,
        qos: QoS,
    },
    Disconnect,
}

type EventResult = Result<ClientEvent, MqttError>;

#[derive(Clone, Copy, Default, PartialEq)]
enum Behavior {
    #[default]
    Record,
    Fail,
    Stall,
}

/// Records every request; a DISCONNECT is echoed to the paired event source
#[derive(Clone, Default)]
pub struct MockTransport {
    calls: Arc<Mutex<Vec<Call>>>,
    events: Option<mpsc::UnboundedSender<EventResult>>,
    behavior: Behavior,
}

impl MockTransport {
    /// Every request fails with the variant matching the request
    pub fn failing() -> Self {
        Self {
            behavior: Behavior::Fail,
            ..Default::default()
        }
    }

    /// Every request hangs, like a client whose outbound buffer is full
    pub fn stalled() -> Self {
        Self {
            behavior: Behavior::Stall,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| matches(*c)).count()
    }

    async fn record(&self, call: Call) -> Result<(), MqttError> {
        match self.behavior {
            Behavior::Record => {
                self.calls.lock().unwrap().push(call);
                Ok(())
            }
            Behavior::Fail => {
                let reason = "mock failure".to_string();
                Err(match call {
                    Call::Publish { .. } => MqttError::PublishFailed(reason),
                    Call::Subscribe { .. } => MqttError::SubscribeFailed(reason),
                    Call::Disconnect => MqttError::DisconnectFailed(reason),
                })
            }
            Behavior::Stall => std::future::pending().await,
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn publish(
        &self,
        topic: &str,
        qos: QoS,
        retain: bool,
        payload: Vec<u8>,
    ) -> Result<(), MqttError> {
        self.record(Call::Publish {
            topic: topic.to_string(),
            qos,
            retain,
            payload,
        })
        .await
    }

    async fn subscribe(&self, topic: &str, qos: QoS) -> Result<(), MqttError> {
        self.record(Call::Subscribe {
            topic: topic.to_string(),
            qos,
        })
        .await
    }

    async fn disconnect(&self) -> Result<(), MqttError> {
        self.record(Call::Disconnect).await?;
        if let Some(tx) = &self.events {
            let _ = tx.send(Ok(ClientEvent::Disconnected));
        }
        Ok(())
    }
}

/// Yields whatever the paired [`MockBroker`] injects, idles when empty
pub struct MockEvents {
    rx: mpsc::UnboundedReceiver<EventResult>,
}

#[async_trait]
impl EventSource for MockEvents {
    async fn poll(&mut self) -> Result<ClientEvent, MqttError> {
        match self.rx.recv().await {
            Some(event) => event,
            None => std::future::pending().await,
        }
    }
}

/// Test-side handle feeding the event source
#[derive(Clone)]
pub struct MockBroker {
    tx: mpsc::UnboundedSender<EventResult>,
}

impl MockBroker {
    pub fn connack(&self) {
        self.connack_with(ConnectReturnCode::Success);
    }

    pub fn connack_with(&self, code: ConnectReturnCode) {
        let ack = ConnAck {
            session_present: false,
            code,
        };
        let _ = self.tx.send(Ok(ClientEvent::Connected(ack)));
    }

    pub fn message(&self, topic: &str, payload: &'static [u8]) {
        let _ = self.tx.send(Ok(ClientEvent::Message(Message {
            topic: topic.to_string(),
            payload: Bytes::from_static(payload),
            qos: QoS::AtMostOnce,
            retain: false,
        })));
    }

    pub fn error(&self, reason: &str) {
        let _ = self
            .tx
            .send(Err(MqttError::ConnectionFailed(reason.to_string())));
    }
}

/// Build a connected transport, event source and broker handle
pub fn pair() -> (MockTransport, MockEvents, MockBroker) {
    let (tx, rx) = mpsc::unbounded_channel();
    let transport = MockTransport {
        events: Some(tx.clone()),
        ..Default::default()
    };
    (transport, MockEvents { rx }, MockBroker { tx })
}
