//! Semantic gesture events and the sink they are published to.

use async_trait::async_trait;
use chrono::{DateTime, Local};
use std::fmt;
use std::sync::Arc;

use crate::remote::model::{ButtonId, ButtonIdentity, RemoteDescriptor};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GestureKind {
    SinglePressCompleted,
    LongPressOngoing,
    LongPressCompleted,
    DoublePressCompleted,
}

impl GestureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GestureKind::SinglePressCompleted => "single_press_completed",
            GestureKind::LongPressOngoing => "long_press_ongoing",
            GestureKind::LongPressCompleted => "long_press_completed",
            GestureKind::DoublePressCompleted => "double_press_completed",
        }
    }

    /// Terminal kinds end a gesture. Only `LongPressOngoing` is not terminal.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, GestureKind::LongPressOngoing)
    }
}

impl fmt::Display for GestureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GestureEvent {
    pub remote: Arc<RemoteDescriptor>,
    pub button: ButtonId,
    pub kind: GestureKind,
    pub occurred_at: DateTime<Local>,
}

impl GestureEvent {
    pub fn new(remote: Arc<RemoteDescriptor>, button: ButtonId, kind: GestureKind) -> Self {
        Self {
            remote,
            button,
            kind,
            occurred_at: Local::now(),
        }
    }

    pub fn identity(&self) -> ButtonIdentity {
        ButtonIdentity::new(self.remote.device_id(), self.button)
    }
}

impl fmt::Display for GestureEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {}, button: {}: {}",
            self.occurred_at.format("%H:%M:%S.%3f"),
            self.remote,
            self.button,
            self.kind
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Event sink rejected the event: {0}")]
    Rejected(String),

    #[error("MQTT client error: {0}")]
    Client(#[from] rumqttc::ClientError),
}

/// Downstream consumer of gesture events.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn publish(&self, event: GestureEvent) -> Result<(), PublishError>;
}
