//! Error types for mqttlink

use std::time::Duration;

use thiserror::Error;

/// Main error type for the crate
#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("MQTT error: {0}")]
    Mqtt(#[from] MqttError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to MQTT operations
#[derive(Error, Debug)]
pub enum MqttError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("no connection acknowledgement within {0:?}")]
    ConnectTimeout(Duration),

    #[error("publish failed: {0}")]
    PublishFailed(String),

    #[error("subscribe failed: {0}")]
    SubscribeFailed(String),

    #[error("disconnect failed: {0}")]
    DisconnectFailed(String),

    #[error("event loop unavailable: {0}")]
    EventLoop(String),
}

pub type Result<T> = std::result::Result<T, Error>;
