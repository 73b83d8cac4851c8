use chrono::{DateTime, Local};
use std::fmt;

use crate::events::GestureEvent;
use crate::gateway::RawEdge;

const RAW_SEGMENT: &str = "raw";
const GESTURE_SEGMENT: &str = "gesture";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MqttMessage {
    pub topic: String,
    pub content: String,
    pub timestamp: DateTime<Local>,
}

impl fmt::Display for MqttMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {}: {}",
            self.timestamp.format("%H:%M:%S.%3f"),
            self.topic,
            self.content
        )
    }
}

impl MqttMessage {
    /// `<prefix>/<remote device id>/<button>/gesture`, payload is the gesture name.
    pub fn from_gesture(topic_prefix: &str, event: &GestureEvent) -> Self {
        MqttMessage {
            topic: format!(
                "{}/{}/{}/{}",
                topic_prefix,
                event.remote.device_id(),
                event.button,
                GESTURE_SEGMENT
            ),
            content: event.kind.as_str().to_string(),
            timestamp: event.occurred_at,
        }
    }
}

/// Subscription filter for raw edges relayed from the hub.
pub fn raw_edge_filter(topic_prefix: &str) -> String {
    format!("{}/{}/+", topic_prefix, RAW_SEGMENT)
}

/// Parses `<prefix>/raw/<button device id>` with a press/release payload.
/// Anything else is not a raw edge.
pub fn raw_edge_from(topic_prefix: &str, topic: &str, payload: &[u8]) -> Option<RawEdge> {
    let rest = topic.strip_prefix(topic_prefix)?.strip_prefix('/')?;
    let id = rest.strip_prefix(RAW_SEGMENT)?.strip_prefix('/')?;
    let button_device_id = id.parse().ok()?;
    let literal = std::str::from_utf8(payload).ok()?.trim().to_string();
    Some(RawEdge {
        button_device_id,
        literal,
    })
}
