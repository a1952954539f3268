//! In-process event bus between the generation engine and the connection
//! supervisor.
//!
//! The engine emits `file_generated` events as it writes artifacts; the
//! supervisor drains the receiving end and forwards the events over the live
//! control-plane session.

use chrono::{SecondsFormat, Utc};
use std::sync::mpsc::{channel, Receiver, Sender};

use serde_json::Value;
use tracing::warn;

/// Name of the event announced after each successful file write.
pub const FILE_GENERATED: &str = "etcgen.file_generated";

#[derive(Debug, Clone)]
pub struct EventEnvelope {
    pub ts: String,
    pub name: String,
    pub data: Value,
}

impl EventEnvelope {
    pub fn with_now(name: impl Into<String>, data: Value) -> Self {
        Self {
            ts: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            name: name.into(),
            data,
        }
    }
}

#[derive(Clone)]
pub struct EventBus {
    sender: Sender<EventEnvelope>,
}

impl EventBus {
    pub fn new_pair() -> (Self, Receiver<EventEnvelope>) {
        let (sender, receiver) = channel();
        (Self { sender }, receiver)
    }

    /// Emit an event, logging instead of failing if the receiving end is
    /// gone.
    pub fn emit_best_effort(&self, name: impl Into<String>, data: Value) {
        let envelope = EventEnvelope::with_now(name, data);
        if let Err(err) = self.sender.send(envelope) {
            warn!(error = %err, "event receiver dropped, discarding event");
        }
    }
}
