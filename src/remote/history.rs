use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};
use tokio::time::Instant;
use tracing::debug;

use super::gesture::{GestureError, GestureState};
use super::model::ButtonAction;

/// Mutable part of a history, only ever touched through the history lock.
#[derive(Debug, Default)]
pub struct GestureProgress {
    state: GestureState,
    tracking_started_at: Option<Instant>,
    exhausted: bool,
}

impl GestureProgress {
    pub fn state(&self) -> GestureState {
        self.state
    }

    pub fn tracking_started_at(&self) -> Option<Instant> {
        self.tracking_started_at
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn mark_exhausted(&mut self) {
        self.exhausted = true;
    }

    fn apply(&mut self, action: ButtonAction, now: Instant) -> Result<(), GestureError> {
        let next = self.state.advance(action)?;
        if self.state == GestureState::Rest {
            self.tracking_started_at = Some(now);
        }
        debug!("Button state {} -> {} on {}", self.state, next, action);
        self.state = next;
        Ok(())
    }

    fn is_live(&self, now: Instant, timeout: Duration) -> bool {
        !self.exhausted && !self.is_timed_out(now, timeout)
    }

    fn is_timed_out(&self, now: Instant, timeout: Duration) -> bool {
        self.tracking_started_at
            .is_some_and(|started| now.saturating_duration_since(started) > timeout)
    }
}

/// One tracking session of a single button.
///
/// Writes come from the tracker, reads from the watcher's checkpoints. Both
/// go through the same lock.
#[derive(Debug)]
pub struct ButtonHistory {
    progress: Mutex<GestureProgress>,
    timeout: Duration,
}

impl ButtonHistory {
    pub fn new(timeout: Duration) -> Self {
        Self {
            progress: Mutex::new(GestureProgress::default()),
            timeout,
        }
    }

    pub async fn increment(&self, action: ButtonAction) -> Result<(), GestureError> {
        self.progress.lock().await.apply(action, Instant::now())
    }

    /// Applies `action` only while this history still accepts edges.
    ///
    /// Returns `Ok(false)` without touching the state if the history is
    /// exhausted or timed out. The liveness check and the update happen under
    /// one lock hold, so a checkpoint can not exhaust the history in between.
    pub async fn apply_if_live(
        &self,
        action: ButtonAction,
        now: Instant,
    ) -> Result<bool, GestureError> {
        let mut progress = self.progress.lock().await;
        if !progress.is_live(now, self.timeout) {
            return Ok(false);
        }
        progress.apply(action, now)?;
        Ok(true)
    }

    pub async fn state(&self) -> GestureState {
        self.progress.lock().await.state()
    }

    pub async fn is_exhausted(&self) -> bool {
        self.progress.lock().await.is_exhausted()
    }

    pub async fn mark_exhausted(&self) {
        self.progress.lock().await.mark_exhausted();
    }

    /// Neither exhausted nor timed out, i.e. still accepting edges.
    pub async fn is_live(&self, now: Instant) -> bool {
        self.progress.lock().await.is_live(now, self.timeout)
    }

    pub async fn is_timed_out(&self, now: Instant) -> bool {
        self.progress.lock().await.is_timed_out(now, self.timeout)
    }

    pub async fn tracking_started_at(&self) -> Option<Instant> {
        self.progress.lock().await.tracking_started_at()
    }

    pub(crate) async fn lock(&self) -> MutexGuard<'_, GestureProgress> {
        self.progress.lock().await
    }
}
