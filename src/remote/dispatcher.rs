use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use super::error::TrackingError;
use super::topology::HandlerTable;
use crate::gateway::RawEdge;
use crate::shutdown::ShutdownSignal;

/// Resolves raw gateway edges against the current handler table.
///
/// Edges are handled one at a time in arrival order, so edges of the same
/// button never overtake each other.
pub struct EdgeDispatcher {
    edges: mpsc::Receiver<RawEdge>,
    handlers: watch::Receiver<Arc<HandlerTable>>,
    shutdown: ShutdownSignal,
}

impl EdgeDispatcher {
    pub fn new(
        edges: mpsc::Receiver<RawEdge>,
        handlers: watch::Receiver<Arc<HandlerTable>>,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self {
            edges,
            handlers,
            shutdown,
        }
    }

    /// Runs until shutdown, a fatal tracking error, or the gateway closing
    /// its edge channel. The last two signal shutdown.
    pub async fn run(mut self) {
        info!("Starting edge dispatcher");
        let shutdown = self.shutdown.clone();
        loop {
            tokio::select! {
                _ = shutdown.requested() => {
                    info!("Shutdown requested, stopping edge dispatcher");
                    break;
                }

                edge = self.edges.recv() => match edge {
                    Some(edge) => {
                        if let Err(e) = self.dispatch(edge).await {
                            error!("Failed to process button event: {}", e);
                            shutdown.signal();
                            break;
                        }
                    }
                    None => {
                        warn!("Gateway closed the edge channel");
                        shutdown.signal();
                        break;
                    }
                }
            }
        }
    }

    pub async fn dispatch(&self, edge: RawEdge) -> Result<(), TrackingError> {
        let handler = self.handlers.borrow().get(edge.button_device_id).cloned();
        match handler {
            Some(handler) => handler.handle(&edge.literal).await,
            None => {
                debug!(
                    "No subscription for button device {}, dropping {}",
                    edge.button_device_id, edge.literal
                );
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ButtonWatcherConfig;
    use crate::events::GestureKind;
    use crate::remote::test_support::{sample_inventory, FakeGateway, RecordingSink};
    use crate::remote::topology::RemoteTopology;
    use crate::remote::tracker::ButtonTracker;
    use std::time::Duration;
    use tokio::time::sleep;

    fn edge(button_device_id: u32, literal: &str) -> RawEdge {
        RawEdge {
            button_device_id,
            literal: literal.to_string(),
        }
    }

    async fn setup(
        sink: &Arc<RecordingSink>,
        shutdown: &ShutdownSignal,
    ) -> (mpsc::Sender<RawEdge>, tokio::task::JoinHandle<()>) {
        let tracker = Arc::new(ButtonTracker::new(
            ButtonWatcherConfig::default(),
            sink.clone(),
            shutdown.clone(),
        ));
        let topology = RemoteTopology::create(
            Arc::new(FakeGateway::with_inventory(sample_inventory())),
            tracker,
            shutdown.clone(),
        )
        .connect()
        .await
        .unwrap();
        let (tx, rx) = mpsc::channel(16);
        let dispatcher = EdgeDispatcher::new(rx, topology.subscribe_handlers(), shutdown.clone());
        (tx, tokio::spawn(dispatcher.run()))
    }

    #[tokio::test(start_paused = true)]
    async fn routes_edges_to_the_tracker() {
        let sink = Arc::new(RecordingSink::default());
        let shutdown = ShutdownSignal::new();
        let (tx, _task) = setup(&sink, &shutdown).await;

        tx.send(edge(101, "press")).await.unwrap();
        tx.send(edge(101, "RELEASE")).await.unwrap();
        tx.send(edge(555, "press")).await.unwrap();
        sleep(Duration::from_secs(1)).await;

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].1.kind, GestureKind::SinglePressCompleted);
        assert_eq!(events[0].1.identity().device_id, 2);
        assert!(!shutdown.is_requested());
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_transition_signals_shutdown() {
        let sink = Arc::new(RecordingSink::default());
        let shutdown = ShutdownSignal::new();
        let (tx, task) = setup(&sink, &shutdown).await;

        tx.send(edge(100, "press")).await.unwrap();
        tx.send(edge(100, "press")).await.unwrap();
        task.await.unwrap();

        assert!(shutdown.is_requested());
    }

    #[tokio::test(start_paused = true)]
    async fn closed_edge_channel_signals_shutdown() {
        let sink = Arc::new(RecordingSink::default());
        let shutdown = ShutdownSignal::new();
        let (tx, task) = setup(&sink, &shutdown).await;

        drop(tx);
        task.await.unwrap();

        assert!(shutdown.is_requested());
    }
}
