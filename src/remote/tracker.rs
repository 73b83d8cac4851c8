use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::error::TrackingError;
use super::model::{ButtonAction, ButtonId, ButtonIdentity, RemoteDescriptor};
use super::watcher::ButtonWatcher;
use crate::config::ButtonWatcherConfig;
use crate::events::EventSink;
use crate::shutdown::ShutdownSignal;

/// Routes raw edges to at most one live watcher per button.
pub struct ButtonTracker {
    watchers: Mutex<HashMap<ButtonIdentity, Arc<ButtonWatcher>>>,
    config: ButtonWatcherConfig,
    sink: Arc<dyn EventSink>,
    shutdown: ShutdownSignal,
}

impl ButtonTracker {
    pub fn new(
        config: ButtonWatcherConfig,
        sink: Arc<dyn EventSink>,
        shutdown: ShutdownSignal,
    ) -> Self {
        info!("Creating button tracker with settings: {:?}", config);
        Self {
            watchers: Mutex::new(HashMap::new()),
            config,
            sink,
            shutdown,
        }
    }

    /// Handler a topology installs for one physical button.
    pub fn button_event_callback(
        self: &Arc<Self>,
        remote: Arc<RemoteDescriptor>,
        button: ButtonId,
    ) -> ButtonEventHandler {
        ButtonEventHandler {
            tracker: self.clone(),
            remote,
            button,
        }
    }

    /// Applies one edge.
    ///
    /// The watcher map stays locked for the whole decide-and-install step, so
    /// two presses racing on a cold button end up with a single watcher.
    pub async fn process_button_event(
        &self,
        remote: &Arc<RemoteDescriptor>,
        button: ButtonId,
        action: ButtonAction,
    ) -> Result<(), TrackingError> {
        let identity = ButtonIdentity::new(remote.device_id(), button);
        info!(
            "Got a button event: {}, button: {}, action: {}",
            remote, button, action
        );

        let mut watchers = self.watchers.lock().await;

        if let Some(watcher) = watchers.get(&identity) {
            if watcher
                .history()
                .apply_if_live(action, Instant::now())
                .await?
            {
                return Ok(());
            }
        }

        if action == ButtonAction::Release {
            debug!(
                "{}, button: {}: release does not belong to a tracked gesture, ignoring it",
                remote, button
            );
            return Ok(());
        }

        let watcher = Arc::new(ButtonWatcher::new(
            remote.clone(),
            button,
            self.config.timings_for(button),
            self.sink.clone(),
        ));
        watcher.history().increment(action).await?;
        watcher.clone().spawn(self.shutdown.clone());
        debug!("{}, button: {}: started a new watcher", remote, button);
        Self::retain_live(&mut watchers, Instant::now()).await;
        watchers.insert(identity, watcher);

        Ok(())
    }

    /// Drops every watcher that no longer accepts edges. Their checkpoint
    /// tasks hold their own handles and are not affected.
    pub async fn evict_finished(&self) -> usize {
        let mut watchers = self.watchers.lock().await;
        Self::retain_live(&mut watchers, Instant::now()).await
    }

    async fn retain_live(
        watchers: &mut HashMap<ButtonIdentity, Arc<ButtonWatcher>>,
        now: Instant,
    ) -> usize {
        let mut finished = Vec::new();
        for (identity, watcher) in watchers.iter() {
            if !watcher.history().is_live(now).await {
                finished.push(*identity);
            }
        }
        for identity in &finished {
            watchers.remove(identity);
        }
        if !finished.is_empty() {
            debug!("Evicted {} finished watchers", finished.len());
        }
        finished.len()
    }

    /// Number of watchers that still accept edges.
    pub async fn live_watcher_count(&self) -> usize {
        let watchers = self.watchers.lock().await;
        let now = Instant::now();
        let mut live = 0;
        for watcher in watchers.values() {
            if watcher.history().is_live(now).await {
                live += 1;
            }
        }
        live
    }

    #[cfg(test)]
    pub(crate) async fn watcher_for(
        &self,
        identity: &ButtonIdentity,
    ) -> Option<Arc<ButtonWatcher>> {
        self.watchers.lock().await.get(identity).cloned()
    }
}

/// Tracker callback bound to one (remote, button) pair.
#[derive(Clone)]
pub struct ButtonEventHandler {
    tracker: Arc<ButtonTracker>,
    remote: Arc<RemoteDescriptor>,
    button: ButtonId,
}

impl ButtonEventHandler {
    pub fn remote(&self) -> &Arc<RemoteDescriptor> {
        &self.remote
    }

    pub fn button(&self) -> ButtonId {
        self.button
    }

    /// Feeds a raw "press"/"release" literal to the tracker. Literals that are
    /// neither are logged and dropped.
    pub async fn handle(&self, literal: &str) -> Result<(), TrackingError> {
        let action = match literal.parse::<ButtonAction>() {
            Ok(action) => action,
            Err(e) => {
                warn!("{}, button: {}: {}", self.remote, self.button, e);
                return Ok(());
            }
        };
        self.tracker
            .process_button_event(&self.remote, self.button, action)
            .await
    }
}
