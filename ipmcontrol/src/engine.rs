//! Capability exposed by the playback engine.

use crossbeam_channel::Receiver;
use serde_json::Value;

use crate::errors::EngineError;

/// Handle on one `load` request.
///
/// Tickets are ordered: a later load supersedes every earlier one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LoadTicket(pub u64);

/// New value of an observed property. `Value::Null` means unavailable.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyChange {
    pub name: String,
    pub value: Value,
}

/// One diagnostic line of the engine: `(level, component, message)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineLogMessage {
    pub level: String,
    pub component: String,
    pub text: String,
}

impl EngineLogMessage {
    pub fn new(level: &str, component: &str, text: &str) -> Self {
        Self {
            level: level.to_string(),
            component: component.to_string(),
            text: text.to_string(),
        }
    }

    /// Unrecoverable demux/decode error on the current stream.
    pub fn is_stream_failure(&self) -> bool {
        self.level == "error"
            && (self.component == "ffmpeg" || self.component == "cplayer")
            && self.text.contains("Failed")
    }
}

/// A single, long-lived media player instance.
///
/// Implementations serialize loads themselves: when two loads race, the one
/// issued last is what ends up playing.
pub trait MediaEngine: Send + Sync {
    /// Replaces the current source. Returns immediately.
    fn load(&self, source: &str) -> Result<LoadTicket, EngineError>;

    /// Blocks until playback of `ticket` (or of any later load) has started.
    fn wait_until_started(&self, ticket: LoadTicket) -> Result<(), EngineError>;

    fn stop(&self) -> Result<(), EngineError>;

    fn set_property(&self, name: &str, value: &str) -> Result<(), EngineError>;

    fn get_property(&self, name: &str) -> Result<Value, EngineError>;

    /// Subscribes to changes of `name`; the current value is delivered first.
    fn observe(&self, name: &str) -> Result<Receiver<PropertyChange>, EngineError>;

    /// Subscribes to the engine's diagnostic output.
    fn log_messages(&self) -> Receiver<EngineLogMessage>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_failure_needs_error_level_known_component_and_failed() {
        assert!(EngineLogMessage::new("error", "ffmpeg", "tcp: Failed to resolve").is_stream_failure());
        assert!(EngineLogMessage::new("error", "cplayer", "Failed to recognize file format.").is_stream_failure());
        assert!(!EngineLogMessage::new("warn", "ffmpeg", "Failed").is_stream_failure());
        assert!(!EngineLogMessage::new("error", "vo/gpu", "Failed").is_stream_failure());
        assert!(!EngineLogMessage::new("error", "ffmpeg", "Connection reset").is_stream_failure());
    }
}
