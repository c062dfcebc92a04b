//! Client core for a server-authoritative auction session.
//!
//! The session synchronizer owns the subscription to the per-session
//! event stream and folds every inbound event, one at a time and in
//! arrival order, into a locally derived projection. Commands flow the
//! other way through the dispatcher; their effects are reconciled only
//! through future events, never through the submission's own result.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use shared::{
    domain::{Participant, ParticipantId, SessionId, TeamSeed},
    protocol::{AssignCommand, Envelope},
};
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
};
use tracing::{info, warn};

pub mod dispatcher;
pub mod projection;
pub mod selection;
pub mod transport;

pub use dispatcher::{CommandDispatcher, DispatchError};
pub use projection::{EventRecord, ProjectionState};
pub use selection::SelectionTracker;

/// Lifecycle of a session subscription. Terminal state is `Closed`;
/// there is no reconnection inside the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Disconnected,
    Connecting,
    Subscribed,
    Closed,
}

/// What the presentation layer hears from the synchronizer.
#[derive(Debug, Clone)]
pub enum SessionNotice {
    /// An envelope was folded into the projection (including unrecognized
    /// kinds, which only reach the audit log).
    Applied(Envelope),
    PhaseChanged(SessionPhase),
    /// A dropped malformed message or a failed stream read. Never fatal
    /// to the caller; the phase tells whether the stream survived.
    Error(String),
}

/// An already-opened per-session event subscription. Connection
/// establishment and retry policy live with the transport collaborator.
#[async_trait]
pub trait EventStream: Send {
    /// Next raw message, `None` once the stream has terminated.
    async fn next_message(&mut self) -> Option<Result<String>>;
}

/// External endpoint accepting assignment commands. Submission results
/// are transport-level only and must never mutate the projection.
#[async_trait]
pub trait CommandSink: Send + Sync {
    async fn submit_assignment(&self, session_id: SessionId, command: AssignCommand) -> Result<()>;
}

struct SessionState {
    phase: SessionPhase,
    projection: ProjectionState,
    fold_task: Option<JoinHandle<()>>,
}

/// The session synchronizer. Exclusive owner of the projection and of
/// the fold task that is its single writer; everyone else reads cloned
/// snapshots.
pub struct AuctionSession {
    session_id: SessionId,
    identity: String,
    inner: Mutex<SessionState>,
    notices: broadcast::Sender<SessionNotice>,
}

impl AuctionSession {
    pub fn new(session_id: SessionId, identity: impl Into<String>, seed: &TeamSeed) -> Arc<Self> {
        let (notices, _) = broadcast::channel(1024);
        Arc::new(Self {
            session_id,
            identity: identity.into(),
            inner: Mutex::new(SessionState {
                phase: SessionPhase::Disconnected,
                projection: ProjectionState::seeded(seed),
                fold_task: None,
            }),
            notices,
        })
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Identity string this client joined under.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn subscribe_notices(&self) -> broadcast::Receiver<SessionNotice> {
        self.notices.subscribe()
    }

    pub async fn phase(&self) -> SessionPhase {
        self.inner.lock().await.phase
    }

    /// Cloned view of the current projection. Safe to call in any phase;
    /// after `Closed` it returns the frozen final state.
    pub async fn snapshot(&self) -> ProjectionState {
        self.inner.lock().await.projection.clone()
    }

    pub async fn resolve_participant(&self, id: ParticipantId) -> Option<Participant> {
        self.inner.lock().await.projection.participant(id).cloned()
    }

    /// Attach the opened subscription and start folding events.
    ///
    /// Valid only from `Disconnected`. The handshake already happened in
    /// the transport collaborator, so `Connecting` and `Subscribed` are
    /// adjacent transitions here, both observable through notices.
    pub async fn subscribe(self: &Arc<Self>, stream: Box<dyn EventStream>) -> Result<()> {
        {
            let guard = self.inner.lock().await;
            if guard.phase != SessionPhase::Disconnected {
                return Err(anyhow!("cannot subscribe from phase {:?}", guard.phase));
            }
        }
        self.set_phase(SessionPhase::Connecting).await;
        // Subscribed must be set before the fold task can run: a stream
        // that terminates immediately reaches Closed from inside the
        // task, and Closed is terminal (see set_phase), so no later
        // transition may overwrite it.
        self.set_phase(SessionPhase::Subscribed).await;

        let session = Arc::clone(self);
        let task = tokio::spawn(async move {
            session.fold_loop(stream).await;
        });

        {
            let mut guard = self.inner.lock().await;
            if guard.phase == SessionPhase::Closed {
                // The stream already ended (or a close raced us); the
                // task is done or moot.
                task.abort();
            } else {
                guard.fold_task = Some(task);
            }
        }
        info!(session_id = %self.session_id, identity = %self.identity, "subscribed to session event stream");
        Ok(())
    }

    /// Explicit leave. Cancels the subscription; in-flight command
    /// submissions complete or fail on their own and their results are
    /// discarded. The projection stays readable at its final state.
    pub async fn close(&self) {
        let task = {
            let mut guard = self.inner.lock().await;
            guard.fold_task.take()
        };
        if let Some(task) = task {
            task.abort();
        }
        self.set_phase(SessionPhase::Closed).await;
    }

    /// Single writer of the projection: one message at a time, in
    /// arrival order, no concurrent folds.
    async fn fold_loop(self: Arc<Self>, mut stream: Box<dyn EventStream>) {
        while let Some(message) = stream.next_message().await {
            match message {
                Ok(text) => match Envelope::decode(&text) {
                    Ok(envelope) => {
                        let record = EventRecord::stamped_now(envelope.clone());
                        {
                            let mut guard = self.inner.lock().await;
                            if guard.phase == SessionPhase::Closed {
                                return;
                            }
                            guard.projection = guard.projection.apply(record);
                        }
                        let _ = self.notices.send(SessionNotice::Applied(envelope));
                    }
                    Err(err) => {
                        // A bad message is dropped; it must not halt the
                        // stream or reach the projection.
                        warn!(session_id = %self.session_id, error = %err, "dropping malformed event");
                        let _ = self
                            .notices
                            .send(SessionNotice::Error(format!("dropped malformed event: {err}")));
                    }
                },
                Err(err) => {
                    warn!(session_id = %self.session_id, error = %err, "event stream failed");
                    let _ = self
                        .notices
                        .send(SessionNotice::Error(format!("event stream failed: {err}")));
                    break;
                }
            }
        }
        // Remote close or stream error: an interrupted subscription must
        // end in an observable Closed, never a stuck Subscribed.
        self.set_phase(SessionPhase::Closed).await;
    }

    async fn set_phase(&self, phase: SessionPhase) {
        let changed = {
            let mut guard = self.inner.lock().await;
            // Closed is terminal.
            if guard.phase == phase || guard.phase == SessionPhase::Closed {
                false
            } else {
                guard.phase = phase;
                true
            }
        };
        if changed {
            info!(session_id = %self.session_id, ?phase, "session phase changed");
            let _ = self.notices.send(SessionNotice::PhaseChanged(phase));
        }
    }
}

#[cfg(test)]
mod tests;
