//! Printing subscriber
//!
//! Subscribes on every CONNACK, so the subscription survives reconnects
//! with a clean session, and prints each received message to stdout.

use std::borrow::Cow;

use async_trait::async_trait;
use rumqttc::{ConnAck, QoS};
use serde::Serialize;
use tracing::{error, info};

use super::handler::{Message, MessageHandler, Session};

/// How received messages are written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// `<topic> -> <payload>`
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

#[derive(Serialize)]
struct JsonLine<'a> {
    topic: &'a str,
    payload: Cow<'a, str>,
    qos: u8,
    retain: bool,
}

/// Render a message as one output line
pub fn format_line(message: &Message, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => format!("{} -> {}", message.topic, message.payload_str()),
        OutputFormat::Json => {
            let line = JsonLine {
                topic: &message.topic,
                payload: message.payload_str(),
                qos: message.qos as u8,
                retain: message.retain,
            };
            serde_json::to_string(&line).unwrap_or_else(|e| {
                error!("Failed to encode message on {}: {}", message.topic, e);
                String::new()
            })
        }
    }
}

/// Handler that subscribes on connect and prints what arrives
pub struct PrintHandler {
    topic: String,
    qos: QoS,
    format: OutputFormat,
}

impl PrintHandler {
    pub fn new(topic: impl Into<String>, qos: QoS, format: OutputFormat) -> Self {
        Self {
            topic: topic.into(),
            qos,
            format,
        }
    }
}

#[async_trait]
impl MessageHandler for PrintHandler {
    async fn on_connect(&self, session: &Session, ack: &ConnAck) {
        info!(
            "Connected to broker with result code {:?}, subscribing to {}",
            ack.code, self.topic
        );
        if let Err(e) = session.subscribe(&self.topic, self.qos).await {
            error!("Failed to subscribe to {}: {}", self.topic, e);
        }
    }

    async fn on_message(&self, _session: &Session, message: &Message) {
        println!("{}", format_line(message, self.format));
    }
}
