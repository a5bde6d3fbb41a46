//! Seam between the wrapper and rumqttc
//!
//! rumqttc splits a client into a request handle (`AsyncClient`) and a
//! network loop (`EventLoop`). The wrapper only talks to them through the
//! two traits below, so any other implementation can stand in.

use async_trait::async_trait;
use rumqttc::{AsyncClient, ConnAck, Event, EventLoop, Incoming, Outgoing, QoS};

use crate::error::MqttError;

use super::handler::Message;

/// Request side of an MQTT client
#[async_trait]
pub trait Transport: Send + Sync {
    /// Queue a PUBLISH
    async fn publish(
        &self,
        topic: &str,
        qos: QoS,
        retain: bool,
        payload: Vec<u8>,
    ) -> Result<(), MqttError>;

    /// Queue a SUBSCRIBE
    async fn subscribe(&self, topic: &str, qos: QoS) -> Result<(), MqttError>;

    /// Queue a DISCONNECT
    async fn disconnect(&self) -> Result<(), MqttError>;
}

/// Network side of an MQTT client
///
/// Polling drives the connection: the first poll opens the socket and sends
/// CONNECT, later polls reconnect after a failure.
#[async_trait]
pub trait EventSource: Send {
    async fn poll(&mut self) -> Result<ClientEvent, MqttError>;
}

/// Events the wrapper reacts to
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// CONNACK received
    Connected(ConnAck),
    /// PUBLISH received
    Message(Message),
    /// DISCONNECT sent or received
    Disconnected,
    /// Anything else (acks, pings, outgoing traffic)
    Other,
}

impl From<Event> for ClientEvent {
    fn from(event: Event) -> Self {
        match event {
            Event::Incoming(Incoming::ConnAck(ack)) => ClientEvent::Connected(ack),
            Event::Incoming(Incoming::Publish(publish)) => ClientEvent::Message(Message {
                topic: publish.topic,
                payload: publish.payload,
                qos: publish.qos,
                retain: publish.retain,
            }),
            Event::Incoming(Incoming::Disconnect) | Event::Outgoing(Outgoing::Disconnect) => {
                ClientEvent::Disconnected
            }
            _ => ClientEvent::Other,
        }
    }
}

#[async_trait]
impl Transport for AsyncClient {
    async fn publish(
        &self,
        topic: &str,
        qos: QoS,
        retain: bool,
        payload: Vec<u8>,
    ) -> Result<(), MqttError> {
        AsyncClient::publish(self, topic, qos, retain, payload)
            .await
            .map_err(|e| MqttError::PublishFailed(e.to_string()))
    }

    async fn subscribe(&self, topic: &str, qos: QoS) -> Result<(), MqttError> {
        AsyncClient::subscribe(self, topic, qos)
            .await
            .map_err(|e| MqttError::SubscribeFailed(e.to_string()))
    }

    async fn disconnect(&self) -> Result<(), MqttError> {
        AsyncClient::disconnect(self)
            .await
            .map_err(|e| MqttError::DisconnectFailed(e.to_string()))
    }
}

#[async_trait]
impl EventSource for EventLoop {
    async fn poll(&mut self) -> Result<ClientEvent, MqttError> {
        EventLoop::poll(self)
            .await
            .map(ClientEvent::from)
            .map_err(|e| MqttError::ConnectionFailed(e.to_string()))
    }
}
