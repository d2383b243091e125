//! Notifications delivered to listeners

/// Why a connection ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownReason {
    /// `disconnect()` was called (directly, via `set_host`, or by teardown)
    Requested,
    /// The receive loop hit a connection-level failure
    ConnectionLost(String),
}

/// State transition reported by the client model
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// Worker is connected and running
    Started { peer: String },
    /// Worker has been stopped or has failed
    Shutdown { reason: ShutdownReason },
    /// A packet was appended to every channel buffer
    ValuesAdded { tick: i64 },
    /// All buffers were cleared
    ValuesReset,
    /// Follows every `ValuesAdded` and `ValuesReset`
    ValuesChanged,
}

impl ClientEvent {
    /// Lifecycle events are `Started` and `Shutdown`
    pub fn is_lifecycle(&self) -> bool {
        matches!(self, ClientEvent::Started { .. } | ClientEvent::Shutdown { .. })
    }

    pub fn is_data(&self) -> bool {
        !self.is_lifecycle()
    }
}
