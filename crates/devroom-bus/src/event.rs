//! Bus events
//!
//! Transport-agnostic name + JSON payload pairs. The core only uses
//! `project-message`, but the bus carries any event shape unchanged.

use serde::{Deserialize, Serialize};

/// The chat broadcast event name
pub const PROJECT_MESSAGE: &str = "project-message";

/// One event on the bus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusEvent {
    /// Event name, e.g. `project-message`
    pub name: String,
    /// Free-shape payload
    pub payload: serde_json::Value,
}

impl BusEvent {
    /// Create an event
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }

    /// Build a `project-message` event with the wire payload
    /// `{sender, message}`
    #[must_use]
    pub fn project_message(sender: &str, message: &str) -> Self {
        Self::new(
            PROJECT_MESSAGE,
            serde_json::json!({ "sender": sender, "message": message }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_message_payload_shape() {
        let event = BusEvent::project_message("u1", "hi");
        assert_eq!(event.name, PROJECT_MESSAGE);
        assert_eq!(event.payload["sender"], "u1");
        assert_eq!(event.payload["message"], "hi");
    }
}
