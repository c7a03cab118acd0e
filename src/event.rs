//! Gate event system.
//!
//! Events are observability only: nothing subscribes to them to make
//! decisions, and a full or closed channel never affects a request.

use tokio::sync::broadcast;

/// Events emitted by the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateEvent {
    /// Subject passed verification.
    Verified {
        /// Subject identifier.
        subject_id: i64,
        /// Whether the pass came from the cross-request cache.
        from_cache: bool,
    },

    /// Subject was blocked.
    Blocked {
        /// Subject identifier.
        subject_id: i64,
        /// Number of unmet tasks, when the checker reported them.
        unmet: Option<usize>,
    },

    /// Verification errored and was resolved by policy.
    Failed {
        /// Subject identifier.
        subject_id: i64,
        /// Error message.
        message: String,
        /// Whether the subject was let through (fail-open).
        allowed: bool,
    },
}

/// Channel for receiving gate events.
pub type GateEventsChannel = broadcast::Receiver<GateEvent>;

/// Sender for gate events.
pub type GateEventsSender = broadcast::Sender<GateEvent>;

/// Create a new event channel pair.
#[must_use]
pub fn create_event_channel() -> (GateEventsSender, GateEventsChannel) {
    broadcast::channel(256)
}
