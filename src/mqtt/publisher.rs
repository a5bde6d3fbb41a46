//! Counter publisher
//!
//! Publishes `"<message> #<n>"` on a fixed interval.

use std::time::Duration;

use rumqttc::QoS;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::client::MqttClient;

/// Timeout for individual MQTT publish operations.
///
/// Prevents the loop from blocking indefinitely when the client's outbound
/// buffer is full (e.g. during a broker outage).
const PUBLISH_TIMEOUT: Duration = Duration::from_secs(5);

/// What and how often to publish
#[derive(Debug, Clone)]
pub struct PublishOptions {
    pub topic: String,
    /// Text before the counter
    pub message: String,
    pub interval: Duration,
    pub qos: QoS,
    pub retain: bool,
    /// Stop after this many messages, run forever when unset
    pub count: Option<u64>,
}

impl PublishOptions {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            message: "hello".to_string(),
            interval: Duration::from_secs(1),
            qos: QoS::AtMostOnce,
            retain: false,
            count: None,
        }
    }
}

/// Payload for the `n`th message
pub fn format_payload(message: &str, n: u64) -> String {
    format!("{} #{}", message, n)
}

/// Run the publish loop
///
/// The counter advances on every tick whether or not the publish went
/// through. Returns the number of messages actually handed to the client.
pub async fn run_publisher(client: &MqttClient, options: &PublishOptions) -> u64 {
    if options.interval.is_zero() {
        warn!("Publish interval must be greater than zero, not publishing");
        return 0;
    }

    let mut ticker = interval(options.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut published = 0;
    let mut n = 0;
    while options.count.map_or(true, |count| n < count) {
        ticker.tick().await;

        let payload = format_payload(&options.message, n);
        n += 1;

        let publish = client.publish(&options.topic, payload.as_str(), options.qos, options.retain);
        match timeout(PUBLISH_TIMEOUT, publish).await {
            Ok(Ok(())) => {
                info!("Published: {}", payload);
                published += 1;
            }
            Ok(Err(e)) => warn!("Failed to publish {:?}: {}", payload, e),
            Err(_) => warn!(
                "Publish timeout for {} after {}s - MQTT client may be stalled",
                options.topic,
                PUBLISH_TIMEOUT.as_secs()
            ),
        }
    }

    debug!("Publisher finished after {} messages", n);
    published
}
