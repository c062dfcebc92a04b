use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    domain::{ParticipantId, TeamId},
    error::EventDecodeError,
};

/// Raw event envelope as it travels on the wire: `{ "type": ..., "payload": ... }`.
///
/// Only `type` is dispatched on. The payload stays opaque JSON until the
/// envelope is interpreted, so unrecognized event kinds survive decoding
/// and can still be appended to the audit log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: Value,
}

/// The closed set of event kinds the projection understands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum SessionEvent {
    ParticipantJoined { id: ParticipantId, name: String },
    ParticipantLeft { id: ParticipantId },
    TeamAssigned { team_id: TeamId, participant_name: String },
}

const KNOWN_KINDS: [&str; 3] = ["participant_joined", "participant_left", "team_assigned"];

impl Envelope {
    /// Decode a raw transport message into an envelope.
    ///
    /// Fails when the text is not a JSON object carrying a string `type`
    /// field. Such a message never reaches the projection.
    pub fn decode(raw: &str) -> Result<Self, EventDecodeError> {
        serde_json::from_str(raw).map_err(|err| EventDecodeError::malformed(err.to_string()))
    }

    /// Resolve this envelope against the known event set.
    ///
    /// `Ok(None)` means the `type` is unrecognized, which is a first-class
    /// non-fatal case: the caller logs the envelope and moves on. An
    /// `InvalidPayload` error means a recognized `type` carried a payload
    /// of the wrong shape.
    pub fn interpret(&self) -> Result<Option<SessionEvent>, EventDecodeError> {
        if !KNOWN_KINDS.contains(&self.kind.as_str()) {
            return Ok(None);
        }
        let value =
            serde_json::json!({ "type": self.kind.clone(), "payload": self.payload.clone() });
        serde_json::from_value(value)
            .map(Some)
            .map_err(|err| EventDecodeError::invalid_payload(&self.kind, err.to_string()))
    }

    /// Build the envelope form of a known event. Handy for tests and for
    /// local echo; the tagged encoding of `SessionEvent` is the envelope
    /// shape by construction, so this cannot fail.
    pub fn from_event(event: &SessionEvent) -> Self {
        let value = serde_json::to_value(event).expect("session event serialization is infallible");
        serde_json::from_value(value).expect("tagged event encoding matches envelope shape")
    }
}

/// The single outbound command kind. Effects are observed only through
/// later `team_assigned` events, never through the submission itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignCommand {
    pub participant_id: ParticipantId,
    pub team_id: TeamId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_rejects_non_json() {
        let err = Envelope::decode("not json at all").unwrap_err();
        assert!(matches!(err, EventDecodeError::Malformed { .. }));
    }

    #[test]
    fn decode_rejects_missing_type() {
        let err = Envelope::decode(r#"{"payload": {"id": 1}}"#).unwrap_err();
        assert!(matches!(err, EventDecodeError::Malformed { .. }));
    }

    #[test]
    fn decode_rejects_non_string_type() {
        let err = Envelope::decode(r#"{"type": 42, "payload": {}}"#).unwrap_err();
        assert!(matches!(err, EventDecodeError::Malformed { .. }));
    }

    #[test]
    fn decode_accepts_missing_payload() {
        let envelope = Envelope::decode(r#"{"type": "heartbeat"}"#).unwrap();
        assert_eq!(envelope.kind, "heartbeat");
        assert_eq!(envelope.payload, Value::Null);
    }

    #[test]
    fn interpret_known_kinds() {
        let envelope =
            Envelope::decode(r#"{"type": "participant_joined", "payload": {"id": 7, "name": "Zed"}}"#)
                .unwrap();
        assert_eq!(
            envelope.interpret().unwrap(),
            Some(SessionEvent::ParticipantJoined {
                id: ParticipantId(7),
                name: "Zed".into(),
            })
        );

        let envelope =
            Envelope::decode(r#"{"type": "team_assigned", "payload": {"team_id": 2, "participant_name": "Zed"}}"#)
                .unwrap();
        assert_eq!(
            envelope.interpret().unwrap(),
            Some(SessionEvent::TeamAssigned {
                team_id: TeamId(2),
                participant_name: "Zed".into(),
            })
        );
    }

    #[test]
    fn interpret_unknown_kind_is_not_an_error() {
        let envelope = Envelope::decode(r#"{"type": "mystery", "payload": {"anything": true}}"#).unwrap();
        assert_eq!(envelope.interpret().unwrap(), None);
    }

    #[test]
    fn interpret_rejects_bad_payload_for_known_kind() {
        let envelope =
            Envelope::decode(r#"{"type": "participant_left", "payload": {"nope": true}}"#).unwrap();
        let err = envelope.interpret().unwrap_err();
        assert!(matches!(err, EventDecodeError::InvalidPayload { ref kind, .. } if kind == "participant_left"));
    }

    #[test]
    fn from_event_round_trips_through_envelope() {
        let event = SessionEvent::ParticipantLeft {
            id: ParticipantId(99),
        };
        let envelope = Envelope::from_event(&event);
        assert_eq!(envelope.kind, "participant_left");
        assert_eq!(envelope.interpret().unwrap(), Some(event));
    }

    #[test]
    fn assign_command_wire_shape() {
        let command = AssignCommand {
            participant_id: ParticipantId(7),
            team_id: TeamId(2),
        };
        let json = serde_json::to_value(&command).unwrap();
        assert_eq!(json, serde_json::json!({"participant_id": 7, "team_id": 2}));
    }
}
