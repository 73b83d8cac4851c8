//! Shared fakes for the remote subsystem's tests

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Mutex;
use tokio::time::Instant;

use super::model::{ButtonId, RemoteDescriptor, RemoteType};
use crate::events::{EventSink, GestureEvent, GestureKind, PublishError};
use crate::gateway::{AreaRecord, ButtonRecord, DeviceRecord, Gateway, GatewayError, Inventory};

pub(crate) fn sample_remote() -> RemoteDescriptor {
    RemoteDescriptor::new(
        99,
        RemoteType::Pico3ButtonRaiseLower,
        "some_test_remote",
        Some("Living Room".to_string()),
        BTreeMap::from([
            (100, ButtonId::PowerOn),
            (101, ButtonId::Favorite),
            (102, ButtonId::PowerOff),
            (103, ButtonId::Increase),
            (104, ButtonId::Decrease),
        ]),
    )
}

/// Inventory with one Pico remote (device 2, buttons 100..=104) and the
/// bridge itself.
pub(crate) fn sample_inventory() -> Inventory {
    Inventory {
        devices: vec![
            DeviceRecord {
                device_id: 2,
                name: "test_remote_Pico".to_string(),
                device_type: "Pico3ButtonRaiseLower".to_string(),
                area: Some(7),
            },
            DeviceRecord {
                device_id: 1,
                name: "Smart Bridge".to_string(),
                device_type: "SmartBridge".to_string(),
                area: None,
            },
        ],
        buttons: (0..5)
            .map(|number| ButtonRecord {
                device_id: 100 + number as u32,
                button_number: number,
                parent_device: 2,
            })
            .collect(),
        areas: vec![AreaRecord {
            area_id: 7,
            name: "Kitchen".to_string(),
        }],
    }
}

#[derive(Default)]
pub(crate) struct RecordingSink {
    events: Mutex<Vec<(Instant, GestureEvent)>>,
    fail: bool,
}

impl RecordingSink {
    pub(crate) fn failing() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub(crate) fn events(&self) -> Vec<(Instant, GestureEvent)> {
        self.events.lock().unwrap().clone()
    }

    pub(crate) fn kinds(&self) -> Vec<GestureKind> {
        self.events().into_iter().map(|(_, event)| event.kind).collect()
    }
}

#[async_trait]
impl EventSink for RecordingSink {
    async fn publish(&self, event: GestureEvent) -> Result<(), PublishError> {
        if self.fail {
            return Err(PublishError::Rejected(format!("refusing {}", event.kind)));
        }
        self.events.lock().unwrap().push((Instant::now(), event));
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct FakeGateway {
    inventory: Mutex<Inventory>,
    fail_connect: bool,
    fail_inventory: Mutex<bool>,
}

impl FakeGateway {
    pub(crate) fn with_inventory(inventory: Inventory) -> Self {
        Self {
            inventory: Mutex::new(inventory),
            ..Self::default()
        }
    }

    pub(crate) fn unreachable() -> Self {
        Self {
            fail_connect: true,
            ..Self::default()
        }
    }

    pub(crate) fn set_inventory(&self, inventory: Inventory) {
        *self.inventory.lock().unwrap() = inventory;
    }

    pub(crate) fn fail_inventory(&self) {
        *self.fail_inventory.lock().unwrap() = true;
    }
}

#[async_trait]
impl Gateway for FakeGateway {
    async fn connect(&self) -> Result<(), GatewayError> {
        if self.fail_connect {
            return Err(GatewayError::Connect("bridge unreachable".to_string()));
        }
        Ok(())
    }

    async fn inventory(&self) -> Result<Inventory, GatewayError> {
        if *self.fail_inventory.lock().unwrap() {
            return Err(GatewayError::Inventory("bridge went away".to_string()));
        }
        Ok(self.inventory.lock().unwrap().clone())
    }
}
