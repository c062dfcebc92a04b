use thiserror::Error;

/// Failure to turn a raw transport message into a usable event.
///
/// `Malformed` means the message never becomes an envelope: it is dropped
/// and reported, and does not enter the event log. `InvalidPayload` means
/// the envelope decoded but a recognized `type` carried a payload of the
/// wrong shape; such an envelope still enters the log for audit.
#[derive(Debug, Error)]
pub enum EventDecodeError {
    #[error("malformed event: {reason}")]
    Malformed { reason: String },
    #[error("invalid payload for event type {kind:?}: {reason}")]
    InvalidPayload { kind: String, reason: String },
}

impl EventDecodeError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed {
            reason: reason.into(),
        }
    }

    pub fn invalid_payload(kind: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPayload {
            kind: kind.into(),
            reason: reason.into(),
        }
    }
}
