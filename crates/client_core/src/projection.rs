//! Derived session state and the pure reducer that folds events into it.

use chrono::{DateTime, Utc};
use shared::{
    domain::{Participant, ParticipantId, Team, TeamId, TeamSeed},
    protocol::{Envelope, SessionEvent},
};
use tracing::warn;

/// One entry of the append-only audit log. `received_at` is a local
/// arrival stamp assigned by the synchronizer before the fold; arrival
/// order, not the stamp, is the ordering signal.
#[derive(Debug, Clone)]
pub struct EventRecord {
    pub envelope: Envelope,
    pub received_at: DateTime<Utc>,
}

impl EventRecord {
    pub fn stamped_now(envelope: Envelope) -> Self {
        Self {
            envelope,
            received_at: Utc::now(),
        }
    }
}

/// Locally derived view of the session, built solely by folding the
/// event stream over a seeded initial state.
#[derive(Debug, Clone, Default)]
pub struct ProjectionState {
    pub participants: Vec<Participant>,
    pub teams: Vec<Team>,
    pub log: Vec<EventRecord>,
}

impl ProjectionState {
    /// Initial state: starter teams from the seed, nobody connected,
    /// empty log. The seed is configuration, not an event.
    pub fn seeded(seed: &TeamSeed) -> Self {
        Self {
            participants: Vec::new(),
            teams: seed.teams(),
            log: Vec::new(),
        }
    }

    /// Fold one received event into the next state.
    ///
    /// Pure: `(state, record) -> state`, no mutation outside this call.
    /// Duplicate joins replace in place, leaves of unknown participants
    /// are no-ops, and assignments are last-writer-wins, so replaying a
    /// delivered event cannot fork the projection. Unrecognized kinds
    /// and invalid payloads mutate nothing. Every record, understood or
    /// not, is appended to the log as the last step.
    pub fn apply(&self, record: EventRecord) -> ProjectionState {
        let mut next = self.clone();
        match record.envelope.interpret() {
            Ok(Some(SessionEvent::ParticipantJoined { id, name })) => {
                next.upsert_participant(Participant { id, name });
            }
            Ok(Some(SessionEvent::ParticipantLeft { id })) => {
                next.participants.retain(|participant| participant.id != id);
            }
            Ok(Some(SessionEvent::TeamAssigned {
                team_id,
                participant_name,
            })) => {
                next.assign_team(team_id, participant_name);
            }
            Ok(None) => {
                warn!(kind = %record.envelope.kind, "ignoring unrecognized event kind");
            }
            Err(err) => {
                warn!(kind = %record.envelope.kind, error = %err, "event payload did not match its kind");
            }
        }
        next.log.push(record);
        next
    }

    pub fn participant(&self, id: ParticipantId) -> Option<&Participant> {
        self.participants
            .iter()
            .find(|participant| participant.id == id)
    }

    pub fn team(&self, id: TeamId) -> Option<&Team> {
        self.teams.iter().find(|team| team.id == id)
    }

    fn upsert_participant(&mut self, participant: Participant) {
        match self
            .participants
            .iter_mut()
            .find(|existing| existing.id == participant.id)
        {
            // Duplicate join: replace in place, keep roster position.
            Some(existing) => *existing = participant,
            None => self.participants.push(participant),
        }
    }

    fn assign_team(&mut self, team_id: TeamId, participant_name: String) {
        match self.teams.iter_mut().find(|team| team.id == team_id) {
            Some(team) => team.assigned_to = Some(participant_name),
            None => {
                warn!(team_id = team_id.0, "assignment for a team not in the starter set");
            }
        }
    }
}
