//! mqtt-subscribe - print every message received on a topic

use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

use mqttlink::cli::SubscribeArgs;
use mqttlink::mqtt::PrintHandler;
use mqttlink::{MqttClient, Result};

#[tokio::main]
async fn main() {
    let args = SubscribeArgs::parse();
    mqttlink::logging::init();

    if let Err(e) = run(args).await {
        error!("Fatal error: {}", e);
        std::process::exit(1);
    }
}

async fn run(args: SubscribeArgs) -> Result<()> {
    let config = args.connection.to_config()?;
    let handler = PrintHandler::new(&args.connection.topic, args.qos, args.format);

    let client = MqttClient::new(config, Arc::new(handler))?;
    client.connect().await?;

    info!(
        "Subscribed to {} on broker {}. Ctrl-C to quit.",
        args.connection.topic, args.connection.broker
    );

    // Messages are printed from the event loop task
    let interrupted = tokio::signal::ctrl_c().await;
    info!("Stopping subscriber");

    client.disconnect().await?;
    interrupted?;
    Ok(())
}
