//! Connection configuration
//!
//! Holds everything needed to reach a broker. A config is validated once and
//! then only read when the underlying client is built.

use std::time::Duration;

use rumqttc::MqttOptions;

/// Default MQTT broker TCP port
pub const DEFAULT_PORT: u16 = 1883;

/// Default keepalive interval
pub const DEFAULT_KEEPALIVE: Duration = Duration::from_secs(60);

/// Default time to wait for the broker's CONNACK
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default capacity of the outbound request buffer
pub const DEFAULT_CHANNEL_CAPACITY: usize = 100;

/// Prefix for generated client IDs
const CLIENT_ID_PREFIX: &str = "mqttlink";

/// MQTT connection configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MqttConfig {
    /// Broker hostname/IP
    pub broker: String,
    /// Broker TCP port
    pub port: u16,
    /// Client identifier (generated when unset)
    pub client_id: Option<String>,
    /// Keepalive interval, zero disables pings
    pub keepalive: Duration,
    /// Upper bound for `connect()` waiting on the broker
    pub connect_timeout: Duration,
    /// Start a clean session on every connect
    pub clean_session: bool,
    /// Number of requests the underlying client buffers before publish blocks
    pub channel_capacity: usize,
}

/// Configuration error type
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required setting: {0}")]
    MissingRequired(&'static str),
    #[error("invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}

impl MqttConfig {
    /// Create a configuration for `broker` with default settings
    pub fn new(broker: impl Into<String>) -> Self {
        Self {
            broker: broker.into(),
            port: DEFAULT_PORT,
            client_id: None,
            keepalive: DEFAULT_KEEPALIVE,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            clean_session: true,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn with_keepalive(mut self, keepalive: Duration) -> Self {
        self.keepalive = keepalive;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_clean_session(mut self, clean_session: bool) -> Self {
        self.clean_session = clean_session;
        self
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// Check the settings rumqttc would otherwise reject with a panic
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.broker.trim().is_empty() {
            return Err(ConfigError::MissingRequired("broker"));
        }
        if self.port == 0 {
            return Err(ConfigError::InvalidValue("port", "0".to_string()));
        }
        // rumqttc accepts zero or whole seconds and sends them as a u16
        let keepalive_ok = self.keepalive.is_zero()
            || (self.keepalive >= Duration::from_secs(1)
                && self.keepalive.subsec_nanos() == 0
                && self.keepalive.as_secs() <= u64::from(u16::MAX));
        if !keepalive_ok {
            return Err(ConfigError::InvalidValue(
                "keepalive",
                format!("{:?}", self.keepalive),
            ));
        }
        if self.connect_timeout.is_zero() {
            return Err(ConfigError::InvalidValue(
                "connect_timeout",
                "0s".to_string(),
            ));
        }
        if let Some(id) = &self.client_id {
            if id.is_empty() || id.starts_with(char::is_whitespace) {
                return Err(ConfigError::InvalidValue("client_id", id.clone()));
            }
        }
        if self.channel_capacity == 0 {
            return Err(ConfigError::InvalidValue(
                "channel_capacity",
                "0".to_string(),
            ));
        }
        Ok(())
    }

    /// The configured client ID, or a generated one unique to this process
    pub fn client_id(&self) -> String {
        match &self.client_id {
            Some(id) => id.clone(),
            None => generated_client_id(),
        }
    }

    /// Build rumqttc options from this configuration
    pub fn mqtt_options(&self) -> MqttOptions {
        let mut options = MqttOptions::new(self.client_id(), &self.broker, self.port);
        options.set_keep_alive(self.keepalive);
        options.set_clean_session(self.clean_session);
        options
    }
}

fn generated_client_id() -> String {
    let hostname = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    format!("{}-{}-{}", CLIENT_ID_PREFIX, hostname, std::process::id())
}
