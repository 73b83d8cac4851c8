//! # Gateway
//!
//! The gateway owns the link to the physical remotes. It exposes two things
//! to the rest of the bridge:
//!
//! - an inventory of devices, buttons and areas, queried on every topology
//!   refresh through the [`Gateway`] trait
//! - a stream of raw press/release edges, delivered as [`RawEdge`] values on
//!   an mpsc channel
//!
//! ```text
//! Gateway ──inventory()──► RemoteTopology
//!    │
//!    └──RawEdge──► EdgeDispatcher ──► ButtonTracker
//! ```

pub mod inventory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::remote::model::DeviceId;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Failed to connect to gateway: {0}")]
    Connect(String),

    #[error("Failed to query gateway inventory: {0}")]
    Inventory(String),

    #[error("Failed to read inventory file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse inventory file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub device_id: DeviceId,
    pub name: String,
    #[serde(rename = "type")]
    pub device_type: String,
    #[serde(default)]
    pub area: Option<u32>,
}

/// A physical button, attached to its remote through `parent_device`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonRecord {
    pub device_id: DeviceId,
    pub button_number: u8,
    pub parent_device: DeviceId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaRecord {
    pub area_id: u32,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    #[serde(default)]
    pub devices: Vec<DeviceRecord>,
    #[serde(default)]
    pub buttons: Vec<ButtonRecord>,
    #[serde(default)]
    pub areas: Vec<AreaRecord>,
}

/// One edge for an already-resolved physical button. `literal` is the
/// gateway's "press"/"release" string, in any case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEdge {
    pub button_device_id: DeviceId,
    pub literal: String,
}

#[async_trait]
pub trait Gateway: Send + Sync {
    async fn connect(&self) -> Result<(), GatewayError>;

    async fn inventory(&self) -> Result<Inventory, GatewayError>;
}
