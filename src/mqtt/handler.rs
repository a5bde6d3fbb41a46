//! Message handler hooks
//!
//! A [`MessageHandler`] receives the two callbacks the network loop emits:
//! connection established and message received. Both have default bodies
//! that only log, so an implementation overrides what it cares about.

use std::borrow::Cow;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use rumqttc::{ConnAck, QoS};
use tracing::{debug, info};

use crate::error::MqttError;

use super::transport::Transport;

/// Message received from a subscription
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub topic: String,
    pub payload: Bytes,
    pub qos: QoS,
    pub retain: bool,
}

impl Message {
    /// Payload as text, invalid UTF-8 replaced
    pub fn payload_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }
}

/// Request handle shared by the client and its handler hooks
#[derive(Clone)]
pub struct Session {
    transport: Arc<dyn Transport>,
}

impl Session {
    pub(crate) fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Publish `payload` to `topic`
    pub async fn publish(
        &self,
        topic: &str,
        payload: impl Into<Vec<u8>>,
        qos: QoS,
        retain: bool,
    ) -> Result<(), MqttError> {
        let payload = payload.into();
        debug!("Publishing {} bytes to {}", payload.len(), topic);
        self.transport.publish(topic, qos, retain, payload).await
    }

    /// Subscribe to `topic`
    pub async fn subscribe(&self, topic: &str, qos: QoS) -> Result<(), MqttError> {
        debug!("Subscribing to {} ({:?})", topic, qos);
        self.transport.subscribe(topic, qos).await
    }

    pub(crate) async fn disconnect(&self) -> Result<(), MqttError> {
        self.transport.disconnect().await
    }
}

/// Callbacks invoked from the network loop
///
/// Hooks run on the loop task: while one is running no further events are
/// polled, so a hook should not wait on anything that needs the loop.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Called for every CONNACK, including after automatic reconnects
    async fn on_connect(&self, _session: &Session, ack: &ConnAck) {
        info!("Connected to broker with result code {:?}", ack.code);
    }

    /// Called for every PUBLISH received
    async fn on_message(&self, _session: &Session, message: &Message) {
        info!(
            "Received message on {}: {}",
            message.topic,
            message.payload_str()
        );
    }
}

/// Handler that keeps the default hooks
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultHandler;

impl MessageHandler for DefaultHandler {}
