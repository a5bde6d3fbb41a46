//! Command-line arguments for the publisher and subscriber tools
//!
//! Every connection flag can also come from the environment (`MQTT_HOST`,
//! `MQTT_PORT`, ...); flags win over variables.

use std::time::Duration;

use clap::{Args, Parser};
use rumqttc::QoS;

use crate::config::{ConfigError, MqttConfig, DEFAULT_PORT};
use crate::mqtt::{OutputFormat, PublishOptions};

/// Broker connection flags shared by both tools
#[derive(Debug, Clone, Args)]
pub struct ConnectionArgs {
    /// Broker IP or hostname
    #[arg(long, env = "MQTT_HOST")]
    pub broker: String,

    /// Topic to publish to or subscribe to
    #[arg(long, env = "MQTT_TOPIC", default_value = "test/topic")]
    pub topic: String,

    /// Broker port
    #[arg(long, env = "MQTT_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Client identifier (generated from hostname and PID when omitted)
    #[arg(long, env = "MQTT_CLIENT_ID")]
    pub client_id: Option<String>,

    /// Keepalive interval in seconds, 0 disables pings
    #[arg(long, env = "MQTT_KEEPALIVE", default_value_t = 60)]
    pub keepalive: u64,

    /// Seconds to wait for the broker to acknowledge the connection
    #[arg(long, env = "MQTT_CONNECT_TIMEOUT", default_value_t = 5)]
    pub connect_timeout: u64,
}

impl ConnectionArgs {
    /// Validated client configuration
    pub fn to_config(&self) -> Result<MqttConfig, ConfigError> {
        let mut config = MqttConfig::new(&self.broker)
            .with_port(self.port)
            .with_keepalive(Duration::from_secs(self.keepalive))
            .with_connect_timeout(Duration::from_secs(self.connect_timeout));
        if let Some(id) = &self.client_id {
            config = config.with_client_id(id);
        }
        config.validate()?;
        Ok(config)
    }
}

/// Simple MQTT publisher
#[derive(Debug, Parser)]
#[command(name = "mqtt-publish", version, about)]
pub struct PublishArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Text published before the counter
    #[arg(long, default_value = "hello")]
    pub message: String,

    /// Seconds between messages
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..))]
    pub interval: u64,

    /// Quality of service (0, 1 or 2)
    #[arg(long, default_value = "0", value_parser = parse_qos)]
    pub qos: QoS,

    /// Ask the broker to retain each message
    #[arg(long)]
    pub retain: bool,

    /// Stop after this many messages
    #[arg(long)]
    pub count: Option<u64>,
}

impl PublishArgs {
    pub fn publish_options(&self) -> PublishOptions {
        PublishOptions {
            topic: self.connection.topic.clone(),
            message: self.message.clone(),
            interval: Duration::from_secs(self.interval),
            qos: self.qos,
            retain: self.retain,
            count: self.count,
        }
    }
}

/// Simple MQTT subscriber
#[derive(Debug, Parser)]
#[command(name = "mqtt-subscribe", version, about)]
pub struct SubscribeArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Quality of service (0, 1 or 2)
    #[arg(long, default_value = "0", value_parser = parse_qos)]
    pub qos: QoS,

    /// Output format for received messages
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

/// Parse a numeric QoS level
pub fn parse_qos(value: &str) -> Result<QoS, String> {
    match value.trim() {
        "0" => Ok(QoS::AtMostOnce),
        "1" => Ok(QoS::AtLeastOnce),
        "2" => Ok(QoS::ExactlyOnce),
        other => Err(format!("invalid QoS {other:?}, expected 0, 1 or 2")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_qos() {
        assert_eq!(parse_qos("0"), Ok(QoS::AtMostOnce));
        assert_eq!(parse_qos("1"), Ok(QoS::AtLeastOnce));
        assert_eq!(parse_qos(" 2 "), Ok(QoS::ExactlyOnce));
        assert!(parse_qos("3").is_err());
        assert!(parse_qos("one").is_err());
    }

    #[test]
    fn test_publish_defaults() {
        let args = PublishArgs::try_parse_from(["mqtt-publish", "--broker", "192.168.1.10"]).unwrap();
        assert_eq!(args.connection.broker, "192.168.1.10");
        assert_eq!(args.connection.topic, "test/topic");
        assert_eq!(args.connection.port, 1883);
        assert_eq!(args.qos, QoS::AtMostOnce);

        let options = args.publish_options();
        assert_eq!(options.topic, "test/topic");
        assert_eq!(options.message, "hello");
        assert_eq!(options.interval, Duration::from_secs(1));
        assert_eq!(options.count, None);

        let config = args.connection.to_config().unwrap();
        assert_eq!(config.broker, "192.168.1.10");
        assert_eq!(config.port, 1883);
        assert_eq!(config.keepalive, Duration::from_secs(60));
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_publish_flags() {
        let args = PublishArgs::try_parse_from([
            "mqtt-publish",
            "--broker",
            "broker.local",
            "--topic",
            "home/kitchen",
            "--port",
            "1884",
            "--client-id",
            "laptop",
            "--qos",
            "1",
            "--retain",
            "--count",
            "10",
            "--interval",
            "2",
        ])
        .unwrap();

        let config = args.connection.to_config().unwrap();
        assert_eq!(config.port, 1884);
        assert_eq!(config.client_id.as_deref(), Some("laptop"));

        let options = args.publish_options();
        assert_eq!(options.topic, "home/kitchen");
        assert_eq!(options.qos, QoS::AtLeastOnce);
        assert!(options.retain);
        assert_eq!(options.count, Some(10));
        assert_eq!(options.interval, Duration::from_secs(2));
    }

    #[test]
    fn test_subscribe_flags() {
        let args = SubscribeArgs::try_parse_from([
            "mqtt-subscribe",
            "--broker",
            "10.0.0.2",
            "--format",
            "json",
            "--qos",
            "2",
        ])
        .unwrap();
        assert_eq!(args.format, OutputFormat::Json);
        assert_eq!(args.qos, QoS::ExactlyOnce);
        assert_eq!(args.connection.topic, "test/topic");
    }

    #[test]
    fn test_invalid_port_rejected() {
        let args = SubscribeArgs::try_parse_from(["mqtt-subscribe", "--broker", "h", "--port", "0"])
            .unwrap();
        assert!(matches!(
            args.connection.to_config(),
            Err(ConfigError::InvalidValue("port", _))
        ));
    }

    #[test]
    fn test_zero_interval_rejected_by_parser() {
        let result =
            PublishArgs::try_parse_from(["mqtt-publish", "--broker", "h", "--interval", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_out_of_range_timings_rejected() {
        let args = PublishArgs::try_parse_from([
            "mqtt-publish",
            "--broker",
            "h",
            "--keepalive",
            "70000",
        ])
        .unwrap();
        assert!(matches!(
            args.connection.to_config(),
            Err(ConfigError::InvalidValue("keepalive", _))
        ));

        let args = PublishArgs::try_parse_from([
            "mqtt-publish",
            "--broker",
            "h",
            "--connect-timeout",
            "0",
        ])
        .unwrap();
        assert!(matches!(
            args.connection.to_config(),
            Err(ConfigError::InvalidValue("connect_timeout", _))
        ));
    }

    #[test]
    fn test_invalid_qos_rejected_by_parser() {
        let result =
            SubscribeArgs::try_parse_from(["mqtt-subscribe", "--broker", "h", "--qos", "5"]);
        assert!(result.is_err());
    }
}
