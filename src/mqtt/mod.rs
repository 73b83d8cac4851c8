//! # MQTT Integration Module
//!
//! The broker is the bridge's outer surface in both directions: gesture
//! events go out as retained-free QoS 1 messages, and raw press/release
//! edges relayed by the hub come in on a wildcard subscription.
//!
//! ```text
//! mqtt/
//! ├── config.rs           - Broker settings and defaults
//! ├── message_manager.rs  - Topic layout for gestures and raw edges
//! └── mqtt_handler.rs     - Client, event loop task and gesture sink
//! ```
//!
//! Topics, with `pico` as the default prefix:
//!
//! - `pico/<remote device id>/<button>/gesture` carries the gesture name
//! - `pico/raw/<button device id>` carries `press` or `release`

pub mod config;
pub mod message_manager;
pub mod mqtt_handler;

pub use mqtt_handler::MqttHandler;
