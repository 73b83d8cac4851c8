pub mod config;
pub mod events;
pub mod gateway;
pub mod mqtt;
pub mod remote;
pub mod shutdown;

use crate::config::AppConfig;
use crate::events::EventSink;
use crate::gateway::inventory::InventoryGateway;
use crate::mqtt::MqttHandler;
use crate::remote::{ButtonTracker, EdgeDispatcher, RemoteTopology};
use crate::shutdown::ShutdownSignal;
use color_eyre::{eyre::eyre, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const EDGE_CHANNEL_CAPACITY: usize = 256;
const TEARDOWN_GRACE: Duration = Duration::from_secs(2);
const DEFAULT_LOG_LEVEL: &str = "info";

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    setup()?;

    let config_path = config::resolve_path(std::env::args().nth(1))?;
    let config = AppConfig::load(&config_path).await?;

    let shutdown = ShutdownSignal::new();
    let (edge_tx, edge_rx) = mpsc::channel(EDGE_CHANNEL_CAPACITY);

    let tls = config
        .mqtt
        .load_tls()
        .await
        .map_err(|e| eyre!("Failed to load MQTT TLS material: {}", e))?;
    let (mqtt, eventloop) = MqttHandler::new(&config.mqtt, tls);
    let mqtt = Arc::new(mqtt);
    let relay = mqtt.spawn_event_loop(eventloop, edge_tx, shutdown.clone());

    let sink: Arc<dyn EventSink> = mqtt.clone();
    let tracker = Arc::new(ButtonTracker::new(
        config.button_watcher.clone(),
        sink,
        shutdown.clone(),
    ));

    let gateway = Arc::new(InventoryGateway::new(config.gateway.inventory_path.clone()));
    let topology = RemoteTopology::create(gateway, tracker, shutdown.clone());

    let dispatcher = EdgeDispatcher::new(edge_rx, topology.subscribe_handlers(), shutdown.clone());
    let dispatcher = tokio::spawn(dispatcher.run());

    let topology = topology
        .connect()
        .await
        .map_err(|e| eyre!("Failed to connect to the gateway: {}", e))?;
    if let Some(snapshot) = topology.snapshot() {
        for remote in snapshot.remotes() {
            info!("Tracking {}", remote);
        }
    }
    let refresh = tokio::spawn(topology.run_refresh_loop(config.topology.refresh_interval()));

    let failed = tokio::select! {
        _ = shutdown.requested() => true,
        res = tokio::signal::ctrl_c() => {
            if let Err(e) = res {
                warn!("Unable to listen for ctrl-c: {}", e);
            }
            info!("Interrupted, shutting down");
            shutdown.signal();
            false
        }
    };

    let teardown = async move {
        let _ = tokio::join!(relay, dispatcher, refresh);
    };
    if tokio::time::timeout(TEARDOWN_GRACE, teardown).await.is_err() {
        warn!("Tasks did not stop within {:?}", TEARDOWN_GRACE);
    }

    if failed {
        return Err(eyre!("Shutting down after a fatal error"));
    }
    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", DEFAULT_LOG_LEVEL)
    }
    setup_logging_env();
    Ok(())
}

/// `RUST_LOG` directives, or `info` when unset or unparsable.
fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_LEVEL))
}

fn setup_logging_env() {
    let filter = log_filter(std::env::var("RUST_LOG").ok().as_deref());
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}
