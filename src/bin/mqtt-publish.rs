//! mqtt-publish - publish an incrementing counter message once per interval

use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

use mqttlink::cli::PublishArgs;
use mqttlink::mqtt::run_publisher;
use mqttlink::{DefaultHandler, MqttClient, Result};

#[tokio::main]
async fn main() {
    let args = PublishArgs::parse();
    mqttlink::logging::init();

    if let Err(e) = run(args).await {
        error!("Fatal error: {}", e);
        std::process::exit(1);
    }
}

async fn run(args: PublishArgs) -> Result<()> {
    let config = args.connection.to_config()?;
    let options = args.publish_options();

    let client = MqttClient::new(config, Arc::new(DefaultHandler))?;
    client.connect().await?;

    info!(
        "Publishing to broker {} on topic {}",
        args.connection.broker, options.topic
    );

    tokio::select! {
        published = run_publisher(&client, &options) => {
            info!("Published {} messages", published);
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Stopping publisher");
        }
    }

    client.disconnect().await?;
    Ok(())
}
