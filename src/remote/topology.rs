//! Hot-reloadable catalog of remotes and their buttons.
//!
//! ```text
//! Disconnected ──connect()──► Connected ──refresh() every interval──┐
//!                                 ▲                                 │
//!                                 └─────────────────────────────────┘
//! ```
//!
//! Each refresh builds a [`TopologySnapshot`] from the gateway inventory. A
//! snapshot equal to the installed one is dropped. A different one gets a new
//! [`HandlerTable`] published to the edge dispatcher. In the background the
//! tracker then evicts watchers that have finished. Watchers live in the
//! tracker, keyed by button identity, so swapping tables never touches an
//! in-flight gesture.

use statum::{machine, state};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use super::error::TopologyError;
use super::model::{ButtonId, DeviceId, RemoteDescriptor, RemoteType};
use super::tracker::{ButtonEventHandler, ButtonTracker};
use crate::gateway::{Gateway, Inventory};
use crate::shutdown::ShutdownSignal;

const PICO_NAME_SUFFIX: &str = "_Pico";

/// Remotes known at one point in time, compared by value across refreshes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopologySnapshot {
    remotes: BTreeMap<DeviceId, Arc<RemoteDescriptor>>,
}

impl TopologySnapshot {
    pub fn from_inventory(inventory: &Inventory) -> Self {
        let area_names: HashMap<u32, &str> = inventory
            .areas
            .iter()
            .map(|area| (area.area_id, area.name.as_str()))
            .collect();

        let mut buttons_by_remote: BTreeMap<DeviceId, BTreeMap<DeviceId, ButtonId>> =
            BTreeMap::new();
        for button in &inventory.buttons {
            match ButtonId::from_number(button.button_number) {
                Ok(button_id) => {
                    buttons_by_remote
                        .entry(button.parent_device)
                        .or_default()
                        .insert(button.device_id, button_id);
                }
                Err(e) => warn!("Button {}: {}, skipping it", button.device_id, e),
            }
        }

        let mut remotes = BTreeMap::new();
        for device in &inventory.devices {
            // devices without buttons are not remotes
            let Some(buttons) = buttons_by_remote.remove(&device.device_id) else {
                continue;
            };
            let Some(remote_type) = RemoteType::from_gateway_type(&device.device_type) else {
                warn!(
                    "Device {}: device type `{}` is not a supported remote and will be skipped",
                    device.name, device.device_type
                );
                continue;
            };

            let display_name = device
                .name
                .strip_suffix(PICO_NAME_SUFFIX)
                .unwrap_or(&device.name);
            let area_name = device
                .area
                .and_then(|area| area_names.get(&area))
                .map(|name| name.to_string());

            remotes.insert(
                device.device_id,
                Arc::new(RemoteDescriptor::new(
                    device.device_id,
                    remote_type,
                    display_name,
                    area_name,
                    buttons,
                )),
            );
        }

        Self { remotes }
    }

    pub fn get(&self, device_id: DeviceId) -> Option<&Arc<RemoteDescriptor>> {
        self.remotes.get(&device_id)
    }

    pub fn remotes(&self) -> impl Iterator<Item = &Arc<RemoteDescriptor>> {
        self.remotes.values()
    }

    pub fn len(&self) -> usize {
        self.remotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.remotes.is_empty()
    }
}

/// Physical button device id to the tracker callback for that button.
#[derive(Clone, Default)]
pub struct HandlerTable {
    handlers: HashMap<DeviceId, ButtonEventHandler>,
}

impl HandlerTable {
    pub fn build(snapshot: &TopologySnapshot, tracker: &Arc<ButtonTracker>) -> Self {
        let handlers = snapshot
            .remotes()
            .flat_map(|remote| {
                remote.buttons().iter().map(move |(button_device_id, button)| {
                    (
                        *button_device_id,
                        tracker.button_event_callback(remote.clone(), *button),
                    )
                })
            })
            .collect();
        Self { handlers }
    }

    pub fn get(&self, button_device_id: DeviceId) -> Option<&ButtonEventHandler> {
        self.handlers.get(&button_device_id)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Installed { remotes: usize },
    Unchanged,
    Replaced { remotes: usize },
}

#[state]
#[derive(Debug, Clone)]
pub enum TopologyState {
    Disconnected,
    Connected,
}

#[machine]
pub struct RemoteTopology<S: TopologyState> {
    gateway: Arc<dyn Gateway>,
    tracker: Arc<ButtonTracker>,
    shutdown: ShutdownSignal,
    installed: Option<TopologySnapshot>,
    handlers: watch::Sender<Arc<HandlerTable>>,
}

impl<S: TopologyState> RemoteTopology<S> {
    /// Receiver for the edge dispatcher; sees every newly installed table.
    pub fn subscribe_handlers(&self) -> watch::Receiver<Arc<HandlerTable>> {
        self.handlers.subscribe()
    }

    pub fn snapshot(&self) -> Option<&TopologySnapshot> {
        self.installed.as_ref()
    }
}

impl RemoteTopology<Disconnected> {
    pub fn create(
        gateway: Arc<dyn Gateway>,
        tracker: Arc<ButtonTracker>,
        shutdown: ShutdownSignal,
    ) -> Self {
        let (handlers, _) = watch::channel(Arc::new(HandlerTable::default()));
        Self::new(gateway, tracker, shutdown, None, handlers)
    }

    /// Connects to the gateway and installs the first snapshot. Failure is
    /// fatal and signals shutdown.
    pub async fn connect(self) -> Result<RemoteTopology<Connected>, TopologyError> {
        info!("Connecting to gateway");
        if let Err(e) = self.gateway.connect().await {
            error!("There was a problem connecting to the gateway: {}", e);
            self.shutdown.signal();
            return Err(e.into());
        }

        let mut connected: RemoteTopology<Connected> = self.transition();
        connected.refresh().await?;
        info!("Done connecting to gateway");
        Ok(connected)
    }
}

impl RemoteTopology<Connected> {
    pub async fn refresh(&mut self) -> Result<RefreshOutcome, TopologyError> {
        let inventory = match self.gateway.inventory().await {
            Ok(inventory) => inventory,
            Err(e) => {
                error!("Failed to refresh topology from the gateway: {}", e);
                self.shutdown.signal();
                return Err(e.into());
            }
        };
        Ok(self.install(TopologySnapshot::from_inventory(&inventory)))
    }

    fn install(&mut self, snapshot: TopologySnapshot) -> RefreshOutcome {
        if self.installed.as_ref() == Some(&snapshot) {
            debug!("Topology unchanged, keeping current subscriptions");
            return RefreshOutcome::Unchanged;
        }

        let remotes = snapshot.len();
        let table = HandlerTable::build(&snapshot, &self.tracker);
        info!(
            "Subscribing {} buttons across {} remotes",
            table.len(),
            remotes
        );
        let previous = self.handlers.send_replace(Arc::new(table));

        let outcome = if self.installed.is_some() {
            RefreshOutcome::Replaced { remotes }
        } else {
            RefreshOutcome::Installed { remotes }
        };
        self.installed = Some(snapshot);

        // The dispatcher stops using the old table at send_replace. Whatever
        // clones are left go away with their last holder. The teardown only
        // reclaims watchers that are done, so in-flight gestures of removed
        // remotes still finish.
        if matches!(outcome, RefreshOutcome::Replaced { .. }) {
            let tracker = self.tracker.clone();
            tokio::spawn(async move {
                let evicted = tracker.evict_finished().await;
                debug!(
                    "Tore down {} subscriptions of the previous topology, evicted {} finished watchers",
                    previous.len(),
                    evicted
                );
            });
        }
        outcome
    }

    /// Refreshes until shutdown is requested or a refresh fails.
    pub async fn run_refresh_loop(mut self, interval: Duration) {
        info!("Refreshing topology every {:?}", interval);
        let shutdown = self.shutdown.clone();
        loop {
            tokio::select! {
                _ = shutdown.requested() => {
                    info!("Shutdown requested, stopping topology refresh");
                    break;
                }

                _ = sleep(interval) => {
                    match self.refresh().await {
                        Ok(outcome) => debug!("Topology refresh finished: {:?}", outcome),
                        Err(e) => {
                            error!("Stopping topology refresh: {}", e);
                            break;
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ButtonWatcherConfig;
    use crate::events::GestureKind;
    use crate::gateway::{ButtonRecord, DeviceRecord};
    use crate::remote::model::{ButtonAction, ButtonIdentity};
    use crate::remote::test_support::{sample_inventory, FakeGateway, RecordingSink};

    fn tracker(sink: &Arc<RecordingSink>) -> Arc<ButtonTracker> {
        Arc::new(ButtonTracker::new(
            ButtonWatcherConfig::default(),
            sink.clone(),
            ShutdownSignal::new(),
        ))
    }

    #[test]
    fn snapshot_groups_buttons_by_remote() {
        let snapshot = TopologySnapshot::from_inventory(&sample_inventory());

        assert_eq!(snapshot.len(), 1);
        let remote = snapshot.get(2).unwrap();
        assert_eq!(remote.remote_type(), RemoteType::Pico3ButtonRaiseLower);
        assert_eq!(remote.display_name(), "test_remote");
        assert_eq!(remote.area_name(), Some("Kitchen"));
        assert_eq!(remote.buttons().len(), 5);
        assert_eq!(remote.buttons().get(&103), Some(&ButtonId::Increase));
    }

    #[test]
    fn unsupported_remote_types_are_skipped() {
        let mut inventory = sample_inventory();
        inventory.devices.push(DeviceRecord {
            device_id: 3,
            name: "Keypad".to_string(),
            device_type: "SeeTouchKeypad".to_string(),
            area: None,
        });
        inventory.buttons.push(ButtonRecord {
            device_id: 200,
            button_number: 0,
            parent_device: 3,
        });

        let snapshot = TopologySnapshot::from_inventory(&inventory);
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.get(3).is_none());
    }

    #[test]
    fn snapshots_compare_by_value() {
        let first = TopologySnapshot::from_inventory(&sample_inventory());
        let second = TopologySnapshot::from_inventory(&sample_inventory());
        assert_eq!(first, second);

        let mut renamed = sample_inventory();
        renamed.devices[0].name = "hallway_Pico".to_string();
        assert_ne!(first, TopologySnapshot::from_inventory(&renamed));
    }

    #[tokio::test]
    async fn connect_installs_the_first_snapshot() {
        let sink = Arc::new(RecordingSink::default());
        let gateway = Arc::new(FakeGateway::with_inventory(sample_inventory()));
        let topology = RemoteTopology::create(gateway, tracker(&sink), ShutdownSignal::new());
        let handlers = topology.subscribe_handlers();
        assert!(handlers.borrow().is_empty());

        let topology = topology.connect().await.unwrap();

        assert_eq!(topology.snapshot().map(TopologySnapshot::len), Some(1));
        let table = handlers.borrow().clone();
        assert_eq!(table.len(), 5);
        assert_eq!(table.get(104).map(|handler| handler.button()), Some(ButtonId::Decrease));
    }

    #[tokio::test]
    async fn connection_errors_signal_shutdown() {
        let sink = Arc::new(RecordingSink::default());
        let shutdown = ShutdownSignal::new();
        let topology = RemoteTopology::create(
            Arc::new(FakeGateway::unreachable()),
            tracker(&sink),
            shutdown.clone(),
        );

        let result = topology.connect().await;

        assert!(matches!(result, Err(TopologyError::Gateway(_))));
        assert!(shutdown.is_requested());
    }

    #[tokio::test(start_paused = true)]
    async fn identical_refresh_keeps_subscriptions_and_watchers() {
        let sink = Arc::new(RecordingSink::default());
        let tracker = tracker(&sink);
        let gateway = Arc::new(FakeGateway::with_inventory(sample_inventory()));
        let mut topology = RemoteTopology::create(gateway, tracker.clone(), ShutdownSignal::new())
            .connect()
            .await
            .unwrap();
        let handlers = topology.subscribe_handlers();

        let handler = handlers.borrow().get(100).cloned().unwrap();
        handler.handle("press").await.unwrap();

        assert_eq!(topology.refresh().await.unwrap(), RefreshOutcome::Unchanged);
        assert!(!handlers.has_changed().unwrap());

        handler.handle("release").await.unwrap();
        sleep(Duration::from_secs(1)).await;
        assert_eq!(sink.kinds(), vec![GestureKind::SinglePressCompleted]);
    }

    #[tokio::test(start_paused = true)]
    async fn changed_refresh_swaps_tables_without_disturbing_watchers() {
        let sink = Arc::new(RecordingSink::default());
        let tracker = tracker(&sink);
        let gateway = Arc::new(FakeGateway::with_inventory(sample_inventory()));
        let mut topology =
            RemoteTopology::create(gateway.clone(), tracker.clone(), ShutdownSignal::new())
                .connect()
                .await
                .unwrap();
        let mut handlers = topology.subscribe_handlers();

        let old_handler = handlers.borrow().get(103).cloned().unwrap();
        old_handler.handle("press").await.unwrap();

        let mut renamed = sample_inventory();
        renamed.devices[0].name = "hallway_Pico".to_string();
        gateway.set_inventory(renamed);
        assert_eq!(
            topology.refresh().await.unwrap(),
            RefreshOutcome::Replaced { remotes: 1 }
        );
        assert!(handlers.has_changed().unwrap());

        // the release arrives through the new table and completes the gesture
        let new_handler = handlers.borrow_and_update().get(103).cloned().unwrap();
        assert_eq!(new_handler.remote().display_name(), "hallway");
        new_handler.handle("release").await.unwrap();
        sleep(Duration::from_secs(1)).await;

        assert_eq!(sink.kinds(), vec![GestureKind::SinglePressCompleted]);
        assert_eq!(tracker.live_watcher_count().await, 0);
    }

    #[tokio::test]
    async fn refresh_failure_signals_shutdown() {
        let sink = Arc::new(RecordingSink::default());
        let shutdown = ShutdownSignal::new();
        let gateway = Arc::new(FakeGateway::with_inventory(sample_inventory()));
        let mut topology = RemoteTopology::create(gateway.clone(), tracker(&sink), shutdown.clone())
            .connect()
            .await
            .unwrap();

        gateway.fail_inventory();

        assert!(topology.refresh().await.is_err());
        assert!(shutdown.is_requested());
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_loop_stops_on_shutdown() {
        let sink = Arc::new(RecordingSink::default());
        let shutdown = ShutdownSignal::new();
        let gateway = Arc::new(FakeGateway::with_inventory(sample_inventory()));
        let topology = RemoteTopology::create(gateway, tracker(&sink), shutdown.clone())
            .connect()
            .await
            .unwrap();

        let task = tokio::spawn(topology.run_refresh_loop(Duration::from_secs(60)));
        sleep(Duration::from_secs(150)).await;
        shutdown.signal();

        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn replacing_the_topology_evicts_finished_watchers() {
        let sink = Arc::new(RecordingSink::default());
        let tracker = tracker(&sink);
        let gateway = Arc::new(FakeGateway::with_inventory(sample_inventory()));
        let mut topology =
            RemoteTopology::create(gateway.clone(), tracker.clone(), ShutdownSignal::new())
                .connect()
                .await
                .unwrap();
        let handler = topology.subscribe_handlers().borrow().get(100).cloned().unwrap();
        let identity = ButtonIdentity::new(2, ButtonId::PowerOn);

        handler.handle("press").await.unwrap();
        handler.handle("release").await.unwrap();
        sleep(Duration::from_secs(1)).await;
        assert!(tracker.watcher_for(&identity).await.is_some());

        gateway.set_inventory(Inventory::default());
        topology.refresh().await.unwrap();
        sleep(Duration::from_millis(1)).await;

        assert!(tracker.watcher_for(&identity).await.is_none());
        assert_eq!(sink.kinds(), vec![GestureKind::SinglePressCompleted]);
    }

    #[tokio::test(start_paused = true)]
    async fn tracker_keeps_tracking_after_the_remote_disappears() {
        let sink = Arc::new(RecordingSink::default());
        let tracker = tracker(&sink);
        let gateway = Arc::new(FakeGateway::with_inventory(sample_inventory()));
        let mut topology =
            RemoteTopology::create(gateway.clone(), tracker.clone(), ShutdownSignal::new())
                .connect()
                .await
                .unwrap();
        let remote = topology.snapshot().unwrap().get(2).cloned().unwrap();

        tracker
            .process_button_event(&remote, ButtonId::PowerOn, ButtonAction::Press)
            .await
            .unwrap();
        gateway.set_inventory(Inventory::default());
        assert_eq!(
            topology.refresh().await.unwrap(),
            RefreshOutcome::Replaced { remotes: 0 }
        );
        sleep(Duration::from_secs(1)).await;

        assert_eq!(sink.kinds()[0], GestureKind::LongPressOngoing);
    }
}
