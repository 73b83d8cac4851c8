use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Device id as reported by the gateway. Used for remotes and for the
/// physical buttons hanging off them.
pub type DeviceId = u32;

// Model errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    #[error("Unknown button action: {0}")]
    UnknownButtonAction(String),

    #[error("Unknown button number: {0}")]
    UnknownButtonNumber(u8),

    #[error("Unknown button name: {0}")]
    UnknownButtonName(String),
}

/// Logical button on a remote.
///
/// The numbering is shared by every supported remote type, so a button
/// number reported by the gateway maps to the same logical button no matter
/// which remote it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ButtonId {
    PowerOn,
    Favorite,
    PowerOff,
    Increase,
    Decrease,
}

impl ButtonId {
    pub const ALL: [ButtonId; 5] = [
        ButtonId::PowerOn,
        ButtonId::Favorite,
        ButtonId::PowerOff,
        ButtonId::Increase,
        ButtonId::Decrease,
    ];

    pub fn from_number(number: u8) -> Result<Self, ModelError> {
        match number {
            0 => Ok(ButtonId::PowerOn),
            1 => Ok(ButtonId::Favorite),
            2 => Ok(ButtonId::PowerOff),
            3 => Ok(ButtonId::Increase),
            4 => Ok(ButtonId::Decrease),
            other => Err(ModelError::UnknownButtonNumber(other)),
        }
    }

    pub fn number(&self) -> u8 {
        match self {
            ButtonId::PowerOn => 0,
            ButtonId::Favorite => 1,
            ButtonId::PowerOff => 2,
            ButtonId::Increase => 3,
            ButtonId::Decrease => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ButtonId::PowerOn => "power_on",
            ButtonId::Favorite => "favorite",
            ButtonId::PowerOff => "power_off",
            ButtonId::Increase => "increase",
            ButtonId::Decrease => "decrease",
        }
    }
}

impl fmt::Display for ButtonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ButtonId {
    type Err = ModelError;

    // Accepts both `power_on` and `POWER_ON`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        ButtonId::ALL
            .into_iter()
            .find(|button| button.as_str() == lowered)
            .ok_or_else(|| ModelError::UnknownButtonName(s.to_string()))
    }
}

/// Raw edge reported for a physical button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ButtonAction {
    Press,
    Release,
}

impl FromStr for ButtonAction {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PRESS" => Ok(ButtonAction::Press),
            "RELEASE" => Ok(ButtonAction::Release),
            _ => Err(ModelError::UnknownButtonAction(s.to_string())),
        }
    }
}

impl fmt::Display for ButtonAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ButtonAction::Press => f.write_str("press"),
            ButtonAction::Release => f.write_str("release"),
        }
    }
}

/// Remote models the bridge knows how to track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteType {
    Pico2Button,
    Pico3ButtonRaiseLower,
}

impl RemoteType {
    /// Maps the gateway's device type string, `None` for anything that is not
    /// a supported remote.
    pub fn from_gateway_type(device_type: &str) -> Option<Self> {
        match device_type {
            "Pico2Button" => Some(RemoteType::Pico2Button),
            "Pico3ButtonRaiseLower" => Some(RemoteType::Pico3ButtonRaiseLower),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RemoteType::Pico2Button => "Pico2Button",
            RemoteType::Pico3ButtonRaiseLower => "Pico3ButtonRaiseLower",
        }
    }
}

impl fmt::Display for RemoteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A remote and the buttons it carries. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteDescriptor {
    device_id: DeviceId,
    remote_type: RemoteType,
    display_name: String,
    area_name: Option<String>,
    buttons: BTreeMap<DeviceId, ButtonId>,
}

impl RemoteDescriptor {
    pub fn new(
        device_id: DeviceId,
        remote_type: RemoteType,
        display_name: impl Into<String>,
        area_name: Option<String>,
        buttons: BTreeMap<DeviceId, ButtonId>,
    ) -> Self {
        Self {
            device_id,
            remote_type,
            display_name: display_name.into(),
            area_name,
            buttons,
        }
    }

    pub fn device_id(&self) -> DeviceId {
        self.device_id
    }

    pub fn remote_type(&self) -> RemoteType {
        self.remote_type
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn area_name(&self) -> Option<&str> {
        self.area_name.as_deref()
    }

    /// Physical button device id to logical button.
    pub fn buttons(&self) -> &BTreeMap<DeviceId, ButtonId> {
        &self.buttons
    }
}

impl fmt::Display for RemoteDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "remote <id: {}, type: {}, name: {}>",
            self.device_id, self.remote_type, self.display_name
        )
    }
}

/// Stable key of a tracked button: the remote it sits on plus its logical id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ButtonIdentity {
    pub device_id: DeviceId,
    pub button: ButtonId,
}

impl ButtonIdentity {
    pub fn new(device_id: DeviceId, button: ButtonId) -> Self {
        Self { device_id, button }
    }
}

impl fmt::Display for ButtonIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.device_id, self.button)
    }
}
