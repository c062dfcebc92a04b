use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use client_core::{
    AuctionSession, CommandDispatcher, SelectionTracker, SessionNotice, SessionPhase,
    transport::{HttpCommandSink, SessionBootstrap},
};
use shared::domain::{ParticipantId, TeamId, TeamSeed};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::Mutex,
};
use tracing::{debug, warn};
use url::Url;

mod config;

use config::load_settings;

#[derive(Parser, Debug)]
struct Args {
    #[arg(long)]
    server_url: Option<String>,
    #[arg(long)]
    session_name: Option<String>,
    #[arg(long)]
    host_name: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();
    let args = Args::parse();

    let mut settings = load_settings();
    if let Some(v) = args.server_url {
        settings.server_url = v;
    }
    if let Some(v) = args.session_name {
        settings.session_name = v;
    }
    if let Some(v) = args.host_name {
        settings.host_name = v;
    }

    let base_url = Url::parse(&settings.server_url)
        .with_context(|| format!("invalid server url: {}", settings.server_url))?;

    let bootstrap = SessionBootstrap::new(base_url.clone());
    let session_id = bootstrap
        .create_session(&settings.session_name, &settings.host_name)
        .await?;
    println!("Created session {session_id} as host {}", settings.host_name);

    let session = AuctionSession::new(session_id, settings.host_name.clone(), &TeamSeed::default());
    let stream = bootstrap
        .open_event_stream(session_id, session.identity())
        .await?;
    session.subscribe(Box::new(stream)).await?;

    let selection = Arc::new(Mutex::new(SelectionTracker::new()));
    let dispatcher = CommandDispatcher::new(
        Arc::clone(&session),
        Arc::clone(&selection),
        Arc::new(HttpCommandSink::new(base_url)),
    );

    let mut notices = session.subscribe_notices();
    tokio::spawn(async move {
        while let Ok(notice) = notices.recv().await {
            match notice {
                SessionNotice::Applied(envelope) => {
                    println!("<< {}: {}", envelope.kind, envelope.payload);
                }
                SessionNotice::PhaseChanged(phase) => {
                    println!("-- session {phase:?}");
                    if phase == SessionPhase::Closed {
                        break;
                    }
                }
                SessionNotice::Error(message) => {
                    warn!(%message, "session stream reported an error");
                }
            }
        }
    });

    println!("Commands: select <participant_id> | clear | assign <team_id> | roster | log | quit");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let mut parts = line.split_whitespace();
        match (parts.next(), parts.next()) {
            (Some("select"), Some(raw_id)) => {
                let Ok(id) = raw_id.parse::<i64>() else {
                    println!("participant id must be a number");
                    continue;
                };
                match session.resolve_participant(ParticipantId(id)).await {
                    Some(participant) => {
                        println!("Selected {} (id {})", participant.name, participant.id.0);
                        selection.lock().await.select(participant);
                    }
                    None => println!("No connected participant with id {id}"),
                }
            }
            (Some("clear"), None) => {
                selection.lock().await.clear();
                println!("Selection cleared");
            }
            (Some("assign"), Some(raw_id)) => {
                let Ok(team_id) = raw_id.parse::<i64>() else {
                    println!("team id must be a number");
                    continue;
                };
                match dispatcher.request_assignment(TeamId(team_id)).await {
                    Ok(()) => {
                        debug!(team_id, "assignment command submitted");
                        println!("Assignment submitted; awaiting confirmation event");
                    }
                    Err(err) => {
                        warn!(error = %err, "assignment dispatch failed");
                        println!("Assignment not sent: {err}");
                    }
                }
            }
            (Some("roster"), None) => {
                let snapshot = session.snapshot().await;
                println!("Participants:");
                for participant in &snapshot.participants {
                    println!("  {} (id {})", participant.name, participant.id.0);
                }
                println!("Teams:");
                for team in &snapshot.teams {
                    let assigned = team.assigned_to.as_deref().unwrap_or("-");
                    println!(
                        "  {} (id {}) budget {} assigned to {}",
                        team.name, team.id.0, team.budget.0, assigned
                    );
                }
            }
            (Some("log"), None) => {
                for entry in &session.snapshot().await.log {
                    println!(
                        "  {} {}: {}",
                        entry.received_at.format("%H:%M:%S"),
                        entry.envelope.kind,
                        entry.envelope.payload
                    );
                }
            }
            (Some("quit"), None) => break,
            (None, _) => {}
            _ => {
                println!("Commands: select <participant_id> | clear | assign <team_id> | roster | log | quit");
            }
        }
    }

    session.close().await;
    Ok(())
}
