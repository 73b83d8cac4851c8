//! Gesture classifier for a single button.
//!
//! A watcher is started right after the first press of a gesture and then
//! inspects the button's history at scheduled checkpoints:
//!
//! ```text
//! press ──► sleep(double_click_window) ──► initial checkpoint
//!                                              │ not terminal
//!                                              ▼
//!           ┌──► sleep(sleep_duration) ──► followup checkpoint ──► terminal? stop
//!           └──────────── until max_duration has passed ◄──┘
//! ```
//!
//! A watcher emits at most one terminal event. `LongPressOngoing` may be
//! emitted any number of times before it.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::{debug, error};

use super::error::TrackingError;
use super::gesture::GestureState;
use super::history::ButtonHistory;
use super::model::{ButtonId, RemoteDescriptor};
use crate::events::{EventSink, GestureEvent, GestureKind};
use crate::shutdown::ShutdownSignal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatcherTimings {
    pub double_click_window: Duration,
    pub sleep_duration: Duration,
    pub max_duration: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Checkpoint {
    Initial,
    Followup,
}

pub struct ButtonWatcher {
    remote: Arc<RemoteDescriptor>,
    button: ButtonId,
    timings: WatcherTimings,
    history: ButtonHistory,
    sink: Arc<dyn EventSink>,
}

impl ButtonWatcher {
    pub fn new(
        remote: Arc<RemoteDescriptor>,
        button: ButtonId,
        timings: WatcherTimings,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            remote,
            button,
            history: ButtonHistory::new(timings.max_duration),
            timings,
            sink,
        }
    }

    pub fn history(&self) -> &ButtonHistory {
        &self.history
    }

    /// Runs the checkpoint loop as its own task. A failure signals shutdown.
    pub fn spawn(self: Arc<Self>, shutdown: ShutdownSignal) -> JoinHandle<()> {
        tokio::spawn(async move {
            if let Err(e) = self.run().await {
                error!("{}: encountered a problem watching this button: {}", self, e);
                shutdown.signal();
            }
        })
    }

    pub async fn run(&self) -> Result<(), TrackingError> {
        let tracking_window_end = Instant::now() + self.timings.max_duration;

        sleep(self.timings.double_click_window).await;
        if self.checkpoint(Checkpoint::Initial).await? {
            return Ok(());
        }

        while Instant::now() < tracking_window_end {
            sleep(self.timings.sleep_duration).await;
            if self.checkpoint(Checkpoint::Followup).await? {
                return Ok(());
            }
        }

        self.history.mark_exhausted().await;
        debug!(
            "{}: the tracking window ended without the button reaching a terminal state",
            self
        );
        Ok(())
    }

    /// Classifies the current state. Returns `true` once the gesture is over.
    ///
    /// The history lock is released before publishing; the exhausted flag is
    /// set while it is still held.
    async fn checkpoint(&self, checkpoint: Checkpoint) -> Result<bool, TrackingError> {
        let kind = {
            let mut progress = self.history.lock().await;
            let kind = match (progress.state(), checkpoint) {
                (GestureState::FirstReleased, Checkpoint::Initial) => {
                    debug!("{}: a single press has completed", self);
                    Some(GestureKind::SinglePressCompleted)
                }
                (GestureState::FirstReleased, Checkpoint::Followup) => {
                    debug!("{}: a long press has completed", self);
                    Some(GestureKind::LongPressCompleted)
                }
                (GestureState::DoubleDone, _) => {
                    debug!("{}: a double press has completed", self);
                    Some(GestureKind::DoublePressCompleted)
                }
                (GestureState::AwaitingFirstRelease, _) => {
                    debug!("{}: a long press is ongoing", self);
                    Some(GestureKind::LongPressOngoing)
                }
                (state, _) => {
                    debug!("{}: current button state is {}", self, state);
                    None
                }
            };
            if kind.is_some_and(|kind| kind.is_terminal()) {
                progress.mark_exhausted();
            }
            kind
        };

        match kind {
            Some(kind) => {
                self.sink
                    .publish(GestureEvent::new(self.remote.clone(), self.button, kind))
                    .await?;
                Ok(kind.is_terminal())
            }
            None => Ok(false),
        }
    }
}

impl fmt::Display for ButtonWatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, button: {}", self.remote, self.button)
    }
}
