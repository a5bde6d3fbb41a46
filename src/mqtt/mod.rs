//! MQTT module - client wrapper, handler hooks, publisher and subscriber

mod client;
mod handler;
#[cfg(test)]
mod mock;
mod publisher;
mod subscriber;
mod transport;

pub use client::{LinkState, MqttClient};
pub use handler::{DefaultHandler, Message, MessageHandler, Session};
pub use publisher::{format_payload, run_publisher, PublishOptions};
pub use subscriber::{format_line, OutputFormat, PrintHandler};
pub use transport::{ClientEvent, EventSource, Transport};
