//! Gateway backed by an inventory file.
//!
//! The file is re-read on every query, so editing it adds or removes remotes
//! on the next topology refresh.
//!
//! ```toml
//! [[devices]]
//! device_id = 2
//! name = "Kitchen_Pico"
//! type = "Pico3ButtonRaiseLower"
//! area = 7
//!
//! [[buttons]]
//! device_id = 100
//! button_number = 0
//! parent_device = 2
//!
//! [[areas]]
//! area_id = 7
//! name = "Kitchen"
//! ```

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::{Gateway, GatewayError, Inventory};

pub struct InventoryGateway {
    path: PathBuf,
}

impl InventoryGateway {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Inventory, GatewayError> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| GatewayError::Read {
                path: self.path.clone(),
                source,
            })?;
        toml::from_str(&content).map_err(|source| GatewayError::Parse {
            path: self.path.clone(),
            source,
        })
    }
}

#[async_trait]
impl Gateway for InventoryGateway {
    async fn connect(&self) -> Result<(), GatewayError> {
        info!("Connecting to inventory at {}", self.path.display());
        let inventory = self
            .load()
            .await
            .map_err(|e| GatewayError::Connect(e.to_string()))?;
        info!(
            "Inventory reachable: {} devices, {} buttons, {} areas",
            inventory.devices.len(),
            inventory.buttons.len(),
            inventory.areas.len()
        );
        Ok(())
    }

    async fn inventory(&self) -> Result<Inventory, GatewayError> {
        let inventory = self.load().await?;
        debug!("Read inventory with {} devices", inventory.devices.len());
        Ok(inventory)
    }
}
