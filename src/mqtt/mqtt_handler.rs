use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS, Transport};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::config::{MqttConfig, TlsMaterial};
use super::message_manager::{raw_edge_filter, raw_edge_from, MqttMessage};
use crate::events::{EventSink, GestureEvent, PublishError};
use crate::gateway::RawEdge;
use crate::shutdown::ShutdownSignal;

const REQUEST_CAPACITY: usize = 100;

/// Broker connection shared by the gesture publisher and the raw edge relay.
pub struct MqttHandler {
    client: AsyncClient,
    topic_prefix: String,
}

impl MqttHandler {
    /// Builds the client, over TLS when `tls` is given. Nothing is sent until
    /// the returned event loop is driven by [`MqttHandler::spawn_event_loop`].
    pub fn new(config: &MqttConfig, tls: Option<TlsMaterial>) -> (Self, EventLoop) {
        let mut options = MqttOptions::new(config.client_id.clone(), config.host.clone(), config.port);
        options.set_keep_alive(config.keep_alive());
        if let Some(username) = &config.username {
            options.set_credentials(username.clone(), config.password.clone().unwrap_or_default());
        }
        if let Some(tls) = tls {
            info!(
                "Using TLS for {}:{} (client auth: {})",
                config.host,
                config.port,
                tls.client_auth.is_some()
            );
            options.set_transport(Transport::tls(tls.ca, tls.client_auth, None));
        }

        let (client, eventloop) = AsyncClient::new(options, REQUEST_CAPACITY);
        (
            MqttHandler {
                client,
                topic_prefix: config.topic_prefix.clone(),
            },
            eventloop,
        )
    }

    /// Drives the connection. Raw edges published under `<prefix>/raw/<id>`
    /// are forwarded to `edges`. A connection error is fatal and signals
    /// shutdown.
    pub fn spawn_event_loop(
        &self,
        mut eventloop: EventLoop,
        edges: mpsc::Sender<RawEdge>,
        shutdown: ShutdownSignal,
    ) -> JoinHandle<()> {
        let client = self.client.clone();
        let prefix = self.topic_prefix.clone();
        let filter = raw_edge_filter(&prefix);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.requested() => {
                        info!("Shutdown requested, disconnecting from broker");
                        if let Err(e) = client.try_disconnect() {
                            debug!("Disconnect not sent: {}", e);
                        }
                        break;
                    }

                    event = eventloop.poll() => match event {
                        Ok(Event::Incoming(Packet::ConnAck(_))) => {
                            info!("Connected to broker, subscribing to {}", filter);
                            if let Err(e) = client.subscribe(filter.as_str(), QoS::AtLeastOnce).await {
                                error!("Failed to subscribe to {}: {}", filter, e);
                                shutdown.signal();
                                break;
                            }
                        }
                        Ok(Event::Incoming(Packet::Publish(publish))) => {
                            let Some(edge) = raw_edge_from(&prefix, &publish.topic, &publish.payload) else {
                                warn!("Ignoring message on {}", publish.topic);
                                continue;
                            };
                            if edges.send(edge).await.is_err() {
                                warn!("Edge dispatcher is gone, stopping broker relay");
                                break;
                            }
                        }
                        Ok(_) => {}
                        Err(e) => {
                            error!("Broker connection failed: {}", e);
                            shutdown.signal();
                            break;
                        }
                    }
                }
            }
        })
    }
}

#[async_trait]
impl EventSink for MqttHandler {
    async fn publish(&self, event: GestureEvent) -> Result<(), PublishError> {
        let message = MqttMessage::from_gesture(&self.topic_prefix, &event);
        debug!("Publishing {}", message);
        self.client
            .publish(message.topic, QoS::AtLeastOnce, false, message.content)
            .await?;
        Ok(())
    }
}
