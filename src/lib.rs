//! mqttlink - a thin wrapper around rumqttc
//!
//! Provides:
//! - [`MqttConfig`]: broker address, port, client ID and keepalive
//! - [`MessageHandler`]: connect/message hooks with logging defaults
//! - [`MqttClient`]: connect, disconnect, publish, subscribe and loop control
//!   forwarded to rumqttc, with `connect()` waiting for the real CONNACK
//! - the pieces behind the `mqtt-publish` and `mqtt-subscribe` tools

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod mqtt;

pub use config::MqttConfig;
pub use error::{Error, MqttError, Result};
pub use mqtt::{DefaultHandler, LinkState, Message, MessageHandler, MqttClient, Session};
pub use rumqttc::{ConnAck, ConnectReturnCode, QoS};
