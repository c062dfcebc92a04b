//! Outbound command path: local intent plus selection becomes an
//! assignment command, gated by synchronous precondition checks.

use std::sync::Arc;

use shared::{
    domain::{ParticipantId, TeamId},
    protocol::AssignCommand,
};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::info;

use crate::{AuctionSession, CommandSink, SelectionTracker, SessionPhase};

#[derive(Debug, Error)]
pub enum DispatchError {
    /// No participant selected; a caller mistake surfaced before any
    /// transport call.
    #[error("no participant selected")]
    NoTargetSelected,
    /// The selection no longer resolves to a known participant.
    #[error("selected participant {participant_id} is no longer part of the session")]
    StaleSelection { participant_id: ParticipantId },
    #[error("session is closed")]
    SessionClosed,
    /// Transport-level submission failure. For user notification only;
    /// the projection is mutated exclusively by the event stream.
    #[error("command submission failed: {0}")]
    Submission(#[source] anyhow::Error),
}

/// Translates "assign this team" into a command for the external sink.
///
/// Does not own the selection tracker (the composition root does) and
/// never writes to the projection; it only re-validates the selection
/// against the session's current state at dispatch time.
pub struct CommandDispatcher {
    session: Arc<AuctionSession>,
    selection: Arc<Mutex<SelectionTracker>>,
    sink: Arc<dyn CommandSink>,
}

impl CommandDispatcher {
    pub fn new(
        session: Arc<AuctionSession>,
        selection: Arc<Mutex<SelectionTracker>>,
        sink: Arc<dyn CommandSink>,
    ) -> Self {
        Self {
            session,
            selection,
            sink,
        }
    }

    /// Request assignment of `team_id` to the currently selected
    /// participant.
    ///
    /// Precondition failures are returned before any transport call. A
    /// successful return means the transport accepted the command, not
    /// that the assignment happened; that is confirmed only by a later
    /// `team_assigned` event.
    pub async fn request_assignment(&self, team_id: TeamId) -> Result<(), DispatchError> {
        if self.session.phase().await == SessionPhase::Closed {
            return Err(DispatchError::SessionClosed);
        }

        let selected = {
            let guard = self.selection.lock().await;
            guard.selected().cloned()
        }
        .ok_or(DispatchError::NoTargetSelected)?;

        // The selection is stale if the participant left after being
        // selected; dispatching anyway would reference someone the
        // backend may already consider gone.
        if self.session.resolve_participant(selected.id).await.is_none() {
            return Err(DispatchError::StaleSelection {
                participant_id: selected.id,
            });
        }

        let command = AssignCommand {
            participant_id: selected.id,
            team_id,
        };
        info!(
            session_id = %self.session.session_id(),
            participant_id = command.participant_id.0,
            team_id = command.team_id.0,
            "submitting assignment command"
        );
        self.sink
            .submit_assignment(self.session.session_id(), command)
            .await
            .map_err(DispatchError::Submission)
    }
}
