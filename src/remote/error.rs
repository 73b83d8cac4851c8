//! Error types of the remote tracking subsystem

use thiserror::Error;

use super::gesture::GestureError;
use crate::events::PublishError;
use crate::gateway::GatewayError;

/// Failures while classifying or forwarding a button's gesture.
///
/// All of these are fatal to the process: they mean gesture data would
/// otherwise be lost silently.
#[derive(Debug, Error)]
pub enum TrackingError {
    #[error(transparent)]
    Gesture(#[from] GestureError),

    #[error("Failed to publish gesture: {0}")]
    Publish(#[from] PublishError),
}

#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),
}
