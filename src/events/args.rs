//! Event payloads
//!
//! A single mutable payload type flows through every publish. Informational
//! events ignore the cancellation flags; cancelable publishes inspect them
//! after all subscribers have run.

use serde_json::Value;

use crate::uno::PropertyBag;

/// Mutable payload handed to every subscriber of an event
#[derive(Debug, Clone, Default)]
pub struct EventArgs {
    /// Name of the event being published (set by the bus)
    pub event: String,

    /// Cooperative cancellation flag; only inspected by cancelable publishes
    pub cancel: bool,

    /// Set by a subscriber that has compensated for a cancellation; a
    /// cancelled-and-handled event lets the operation proceed
    pub handled: bool,

    /// Arbitrary key/value extensions subscribers may read and mutate
    pub data: PropertyBag,
}

impl EventArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Payload pre-populated with one extension entry
    pub fn with_entry(key: impl Into<String>, value: Value) -> Self {
        let mut args = Self::default();
        args.data.insert(key.into(), value);
        args
    }

    /// Payload carrying a whole property bag
    pub fn with_data(data: PropertyBag) -> Self {
        Self {
            data,
            ..Self::default()
        }
    }

    /// Read an extension entry
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Insert an extension entry
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.data.insert(key.into(), value);
    }
}

/// Result of a cancelable publish, inspected by the publishing operation
///
/// Cancellation is data, not an exception: the publisher decides whether an
/// unhandled cancel fails the enclosing operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CancelOutcome {
    pub cancelled: bool,
    pub handled: bool,
}

impl CancelOutcome {
    /// True when the operation must not proceed
    pub fn is_vetoed(&self) -> bool {
        self.cancelled && !self.handled
    }
}
