//! Telemetry Module
//!
//! Machine sessions emit structured JSON events through `log` so a host can
//! collect them with whatever logger it installs.

use log::{debug, info, trace, warn};
use serde::Serialize;

/// Machine event types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// A transition matched and the current state changed
    StateSwitched,
    /// A data handler returned an error
    HandlerFailed,
    /// The underlying source returned an error
    SourceFailed,
    /// A read was cancelled
    Cancelled,
    /// Source exhausted and all buffers drained
    Finished,
}

/// Running counters for one session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MachineStats {
    /// Bytes pulled from the source
    pub bytes_read: u64,
    /// Bytes handed to the caller
    pub bytes_written: u64,
    /// Transitions taken
    pub transitions: u64,
    /// Data handler invocations
    pub handler_calls: u64,
}

/// Structured machine event
#[derive(Debug, Clone, Serialize)]
pub struct MachineEvent {
    pub event_type: EventType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_state: Option<String>,
    /// Matched trigger, lossily decoded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger: Option<String>,
    /// Offset of the trigger inside the window
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<MachineStats>,
    /// Emit switches at debug instead of trace
    #[serde(skip)]
    verbose: bool,
}

impl MachineEvent {
    pub fn new(event_type: EventType) -> Self {
        Self {
            event_type,
            from_state: None,
            to_state: None,
            trigger: None,
            offset: None,
            reason: None,
            stats: None,
            verbose: false,
        }
    }

    pub fn with_states(mut self, from: &str, to: &str) -> Self {
        self.from_state = Some(from.to_string());
        self.to_state = Some(to.to_string());
        self
    }

    pub fn with_state(mut self, state: &str) -> Self {
        self.from_state = Some(state.to_string());
        self
    }

    pub fn with_trigger(mut self, trigger: &[u8], offset: usize) -> Self {
        self.trigger = Some(String::from_utf8_lossy(trigger).into_owned());
        self.offset = Some(offset);
        self
    }

    pub fn with_reason(mut self, reason: &str) -> Self {
        self.reason = Some(reason.to_string());
        self
    }

    pub fn with_stats(mut self, stats: MachineStats) -> Self {
        self.stats = Some(stats);
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Log the event
    pub fn emit(&self) {
        match serde_json::to_string(self) {
            Ok(json) => match self.event_type {
                EventType::StateSwitched if self.verbose => debug!("[STREAM-FSM] {}", json),
                EventType::StateSwitched => trace!("[STREAM-FSM] {}", json),
                EventType::HandlerFailed | EventType::SourceFailed | EventType::Cancelled => {
                    warn!("[STREAM-FSM] {}", json)
                }
                EventType::Finished => info!("[STREAM-FSM] {}", json),
            },
            Err(e) => {
                warn!("Failed to serialize machine event: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = MachineEvent::new(EventType::StateSwitched)
            .with_states("text", "tag")
            .with_trigger(b"<", 3);

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("state_switched"));
        assert!(json.contains(r#""to_state":"tag""#));
        assert!(json.contains(r#""offset":3"#));
        assert!(!json.contains("reason"));
        assert!(!json.contains("verbose"));
    }

    #[test]
    fn test_finished_event_carries_stats() {
        let stats = MachineStats {
            bytes_read: 10,
            bytes_written: 8,
            transitions: 2,
            handler_calls: 1,
        };
        let event = MachineEvent::new(EventType::Finished).with_stats(stats);

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""bytes_written":8"#));
        assert!(json.contains(r#""handler_calls":1"#));
    }
}
