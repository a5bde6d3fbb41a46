//! MQTT client wrapper for rumqttc
//!
//! Owns the network loop task and forwards connect, disconnect, publish,
//! subscribe and loop control to the underlying client. Incoming events are
//! dispatched to a [`MessageHandler`] on the loop task.

use std::sync::Arc;
use std::time::Duration;

use rumqttc::{AsyncClient, ConnectReturnCode, QoS};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

use crate::config::MqttConfig;
use crate::error::MqttError;

use super::handler::{MessageHandler, Session};
use super::transport::{ClientEvent, EventSource, Transport};

/// Pause after a loop error before polling again (rumqttc reconnects on poll)
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// How long `disconnect()` lets the loop flush the DISCONNECT packet
const DISCONNECT_GRACE: Duration = Duration::from_secs(1);

/// Broker link as seen by the network loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    Connecting,
    Connected,
    Failed(String),
}

impl LinkState {
    pub fn is_connected(&self) -> bool {
        matches!(self, LinkState::Connected)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, LinkState::Failed(_))
    }
}

struct RunningLoop {
    handle: JoinHandle<Box<dyn EventSource>>,
    shutdown_tx: watch::Sender<bool>,
}

struct Lifecycle {
    connected: bool,
    /// Parked here while no loop task owns it
    events: Option<Box<dyn EventSource>>,
    running: Option<RunningLoop>,
}

/// MQTT client wrapper
pub struct MqttClient {
    config: MqttConfig,
    session: Session,
    handler: Arc<dyn MessageHandler>,
    lifecycle: Mutex<Lifecycle>,
    link_tx: Arc<watch::Sender<LinkState>>,
}

impl MqttClient {
    /// Create a rumqttc-backed client and register `handler` for its events
    pub fn new(config: MqttConfig, handler: Arc<dyn MessageHandler>) -> crate::error::Result<Self> {
        config.validate()?;
        let (client, eventloop) = AsyncClient::new(config.mqtt_options(), config.channel_capacity);
        debug!(
            "Created MQTT client for {}:{} (capacity {})",
            config.broker, config.port, config.channel_capacity
        );
        Ok(Self::with_transport(config, handler, client, eventloop))
    }

    /// Create a client on top of an existing transport and event source
    pub fn with_transport(
        config: MqttConfig,
        handler: Arc<dyn MessageHandler>,
        transport: impl Transport + 'static,
        events: impl EventSource + 'static,
    ) -> Self {
        let (link_tx, _) = watch::channel(LinkState::Disconnected);
        Self {
            config,
            session: Session::new(Arc::new(transport)),
            handler,
            lifecycle: Mutex::new(Lifecycle {
                connected: false,
                events: Some(Box::new(events)),
                running: None,
            }),
            link_tx: Arc::new(link_tx),
        }
    }

    pub fn config(&self) -> &MqttConfig {
        &self.config
    }

    /// Request handle usable from other tasks
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Current state reported by the network loop
    pub fn link_state(&self) -> LinkState {
        self.link_tx.borrow().clone()
    }

    /// Whether `connect()` succeeded and `disconnect()` has not been called since
    pub async fn is_connected(&self) -> bool {
        self.lifecycle.lock().await.connected
    }

    /// Connect using the configured timeout
    pub async fn connect(&self) -> Result<(), MqttError> {
        self.connect_with_timeout(self.config.connect_timeout).await
    }

    /// Start the network loop and wait for the broker's CONNACK
    ///
    /// Does nothing when already connected. A loop already running from
    /// `loop_start()` is reused, and its current failure is reported as
    /// `ConnectionFailed`. On refusal, loop error or timeout a loop started
    /// here is stopped again.
    pub async fn connect_with_timeout(
        &self,
        limit: Duration,
    ) -> Result<(), MqttError> {
        let mut lifecycle = self.lifecycle.lock().await;
        if lifecycle.connected {
            debug!("Already connected, ignoring connect()");
            return Ok(());
        }

        info!(
            "Connecting to MQTT broker at {}:{}",
            self.config.broker, self.config.port
        );
        let started = self.start_loop(&mut lifecycle).await?;

        let result = {
            let mut link_rx = self.link_tx.subscribe();
            let waited = timeout(
                limit,
                link_rx.wait_for(|state| state.is_connected() || state.is_failed()),
            )
            .await;
            match waited {
                Ok(Ok(state)) => match &*state {
                    LinkState::Failed(reason) => Err(MqttError::ConnectionFailed(reason.clone())),
                    _ => Ok(()),
                },
                Ok(Err(_)) => Err(MqttError::EventLoop("link state channel closed".to_string())),
                Err(_) => Err(MqttError::ConnectTimeout(limit)),
            }
        };

        match result {
            Ok(()) => {
                lifecycle.connected = true;
                info!("Connected to MQTT broker");
                Ok(())
            }
            Err(e) => {
                error!("Failed to connect to MQTT broker: {}", e);
                if started {
                    if let Err(stop_err) = self.stop_loop(&mut lifecycle).await {
                        warn!("Failed to stop event loop: {}", stop_err);
                    }
                }
                Err(e)
            }
        }
    }

    /// Send DISCONNECT and stop the network loop
    ///
    /// Does nothing when not connected.
    pub async fn disconnect(&self) -> Result<(), MqttError> {
        let mut lifecycle = self.lifecycle.lock().await;
        if !lifecycle.connected {
            debug!("Not connected, ignoring disconnect()");
            return Ok(());
        }

        let requested = self.session.disconnect().await;
        if requested.is_ok() {
            let mut link_rx = self.link_tx.subscribe();
            let flushed = timeout(
                DISCONNECT_GRACE,
                link_rx.wait_for(|state| !state.is_connected()),
            )
            .await
            .map(|changed| changed.is_ok())
            .unwrap_or(false);
            if !flushed {
                warn!(
                    "Broker link still up after {}ms, stopping event loop anyway",
                    DISCONNECT_GRACE.as_millis()
                );
            }
        }

        let stopped = self.stop_loop(&mut lifecycle).await;
        lifecycle.connected = false;
        info!("Disconnected from MQTT broker");
        requested.and(stopped)
    }

    /// Publish a message
    pub async fn publish(
        &self,
        topic: &str,
        payload: impl Into<Vec<u8>>,
        qos: QoS,
        retain: bool,
    ) -> Result<(), MqttError> {
        self.session.publish(topic, payload, qos, retain).await
    }

    /// Subscribe to a topic filter
    pub async fn subscribe(&self, topic: &str, qos: QoS) -> Result<(), MqttError> {
        self.session.subscribe(topic, qos).await
    }

    /// Start the network loop if it is not already running
    pub async fn loop_start(&self) -> Result<(), MqttError> {
        let mut lifecycle = self.lifecycle.lock().await;
        self.start_loop(&mut lifecycle).await.map(|_| ())
    }

    /// Stop the network loop if it is running
    pub async fn loop_stop(&self) -> Result<(), MqttError> {
        let mut lifecycle = self.lifecycle.lock().await;
        self.stop_loop(&mut lifecycle).await
    }

    /// Returns true when a new loop task was spawned
    async fn start_loop(&self, lifecycle: &mut Lifecycle) -> Result<bool, MqttError> {
        if let Some(running) = &lifecycle.running {
            if !running.handle.is_finished() {
                return Ok(false);
            }
            // Reclaim the event source from a loop that ended on its own
            self.stop_loop(lifecycle).await?;
        }

        let events = lifecycle.events.take().ok_or_else(|| {
            MqttError::EventLoop("event source lost when the loop task failed".to_string())
        })?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        self.link_tx.send_replace(LinkState::Connecting);
        let handle = tokio::spawn(run_event_loop(
            events,
            self.session.clone(),
            Arc::clone(&self.handler),
            Arc::clone(&self.link_tx),
            shutdown_rx,
        ));
        lifecycle.running = Some(RunningLoop {
            handle,
            shutdown_tx,
        });
        debug!("MQTT event loop task spawned");
        Ok(true)
    }

    async fn stop_loop(&self, lifecycle: &mut Lifecycle) -> Result<(), MqttError> {
        let Some(running) = lifecycle.running.take() else {
            return Ok(());
        };

        running.shutdown_tx.send_replace(true);
        let joined = running.handle.await;
        self.link_tx.send_replace(LinkState::Disconnected);

        match joined {
            Ok(events) => {
                lifecycle.events = Some(events);
                debug!("MQTT event loop task stopped");
                Ok(())
            }
            Err(e) => Err(MqttError::EventLoop(e.to_string())),
        }
    }
}

/// Poll the event source and dispatch to the handler until shutdown
///
/// Hands the event source back so the loop can be started again. Dropping
/// the shutdown sender also ends the loop.
async fn run_event_loop(
    mut events: Box<dyn EventSource>,
    session: Session,
    handler: Arc<dyn MessageHandler>,
    link_tx: Arc<watch::Sender<LinkState>>,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Box<dyn EventSource> {
    loop {
        tokio::select! {
            biased;

            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    break;
                }
            }

            polled = events.poll() => {
                match polled {
                    Ok(ClientEvent::Connected(ack)) => {
                        if ack.code == ConnectReturnCode::Success {
                            handler.on_connect(&session, &ack).await;
                            link_tx.send_replace(LinkState::Connected);
                        } else {
                            warn!("Broker refused connection: {:?}", ack.code);
                            link_tx.send_replace(LinkState::Failed(format!(
                                "broker refused connection: {:?}",
                                ack.code
                            )));
                        }
                    }
                    Ok(ClientEvent::Message(message)) => {
                        debug!("Received message on {}", message.topic);
                        handler.on_message(&session, &message).await;
                    }
                    Ok(ClientEvent::Disconnected) => {
                        warn!("Disconnected from MQTT broker");
                        link_tx.send_replace(LinkState::Disconnected);
                    }
                    Ok(ClientEvent::Other) => {}
                    Err(e) => {
                        error!("MQTT event loop error: {}", e);
                        link_tx.send_replace(LinkState::Failed(e.to_string()));
                        if interruptible_sleep(&mut shutdown_rx, RECONNECT_DELAY).await {
                            break;
                        }
                    }
                }
            }
        }
    }
    events
}

/// Sleep for `delay`; returns true if shutdown was requested meanwhile
async fn interruptible_sleep(shutdown_rx: &mut watch::Receiver<bool>, delay: Duration) -> bool {
    tokio::select! {
        _ = sleep(delay) => false,
        changed = shutdown_rx.changed() => changed.is_err() || *shutdown_rx.borrow(),
    }
}
