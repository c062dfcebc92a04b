use std::{sync::Arc, time::Duration};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use shared::{
    domain::SessionId,
    protocol::{AssignCommand, Envelope, SessionEvent},
};
use tokio::{
    sync::{broadcast, mpsc, Mutex},
    time::timeout,
};
use uuid::Uuid;

use crate::{CommandSink, EventRecord, EventStream, SessionNotice, SessionPhase};


pub(crate) fn session_id() -> SessionId {
    SessionId(Uuid::new_v4())
}

pub(crate) fn record(event: &SessionEvent) -> EventRecord {
    EventRecord::stamped_now(Envelope::from_event(event))
}

pub(crate) fn raw_record(raw: &str) -> EventRecord {
    EventRecord::stamped_now(Envelope::decode(raw).expect("test envelope decodes"))
}

pub(crate) fn frame(event: &SessionEvent) -> String {
    serde_json::to_string(&Envelope::from_event(event)).expect("test envelope serializes")
}

/// Sink that records every submitted command and always accepts.
pub(crate) struct RecordingSink {
    pub submitted: Mutex<Vec<(SessionId, AssignCommand)>>,
}

impl RecordingSink {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            submitted: Mutex::new(Vec::new()),
        })
    }

    pub(crate) async fn submitted(&self) -> Vec<(SessionId, AssignCommand)> {
        self.submitted.lock().await.clone()
    }
}

#[async_trait]
impl CommandSink for RecordingSink {
    async fn submit_assignment(&self, session_id: SessionId, command: AssignCommand) -> Result<()> {
        self.submitted.lock().await.push((session_id, command));
        Ok(())
    }
}

/// Sink that fails every submission at the transport level.
pub(crate) struct FailingSink;

#[async_trait]
impl CommandSink for FailingSink {
    async fn submit_assignment(
        &self,
        _session_id: SessionId,
        _command: AssignCommand,
    ) -> Result<()> {
        Err(anyhow!("sink unavailable"))
    }
}

/// Channel-backed event stream: the test scripts frames through the
/// sender; dropping the sender terminates the stream like a remote close.
pub(crate) struct ScriptedStream {
    rx: mpsc::Receiver<Result<String>>,
}

#[async_trait]
impl EventStream for ScriptedStream {
    async fn next_message(&mut self) -> Option<Result<String>> {
        self.rx.recv().await
    }
}

pub(crate) fn scripted_stream() -> (mpsc::Sender<Result<String>>, Box<dyn EventStream>) {
    let (tx, rx) = mpsc::channel(32);
    (tx, Box::new(ScriptedStream { rx }))
}

pub(crate) async fn next_applied(rx: &mut broadcast::Receiver<SessionNotice>) -> Envelope {
    loop {
        let notice = timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("timed out waiting for applied notice")
            .expect("notice channel closed");
        if let SessionNotice::Applied(envelope) = notice {
            return envelope;
        }
    }
}

pub(crate) async fn next_error(rx: &mut broadcast::Receiver<SessionNotice>) -> String {
    loop {
        let notice = timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("timed out waiting for error notice")
            .expect("notice channel closed");
        if let SessionNotice::Error(message) = notice {
            return message;
        }
    }
}

pub(crate) async fn wait_for_phase(rx: &mut broadcast::Receiver<SessionNotice>, phase: SessionPhase) {
    loop {
        let notice = timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("timed out waiting for phase change")
            .expect("notice channel closed");
        if matches!(notice, SessionNotice::PhaseChanged(reached) if reached == phase) {
            return;
        }
    }
}
