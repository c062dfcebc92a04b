//! Production transport collaborators: session bootstrap over HTTP and
//! the websocket event subscription. The core only depends on the
//! `EventStream` and `CommandSink` seams; this module is the wiring.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::Deserialize;
use shared::{
    domain::SessionId,
    protocol::AssignCommand,
};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async, MaybeTlsStream, tungstenite::Message, WebSocketStream,
};
use tracing::{debug, info};
use url::Url;

use crate::{CommandSink, EventStream};

fn websocket_url(base_url: &Url) -> Result<Url> {
    let mut ws_url = base_url.clone();
    let scheme = match base_url.scheme() {
        "http" => "ws",
        "https" => "wss",
        other => return Err(anyhow!("server url must be http(s), got {other}://")),
    };
    ws_url
        .set_scheme(scheme)
        .map_err(|_| anyhow!("cannot derive websocket url from {base_url}"))?;
    Ok(ws_url)
}

/// Creates sessions and opens event subscriptions against the backend.
pub struct SessionBootstrap {
    http: Client,
    base_url: Url,
}

#[derive(Debug, Deserialize)]
struct CreateSessionResponse {
    auction_id: SessionId,
}

impl SessionBootstrap {
    pub fn new(base_url: Url) -> Self {
        Self {
            http: Client::new(),
            base_url,
        }
    }

    /// Create a session from a human-supplied name and host identity and
    /// obtain its backend-assigned identifier.
    pub async fn create_session(&self, name: &str, host_name: &str) -> Result<SessionId> {
        let url = self.base_url.join("auctions")?;
        let response: CreateSessionResponse = self
            .http
            .post(url)
            .query(&[("name", name), ("host_name", host_name)])
            .send()
            .await
            .context("session create request failed")?
            .error_for_status()?
            .json()
            .await
            .context("session create response was not valid JSON")?;
        info!(session_id = %response.auction_id, "created session");
        Ok(response.auction_id)
    }

    /// Open the event subscription scoped to `(session, identity)` and
    /// hand back the read half as an `EventStream`.
    pub async fn open_event_stream(
        &self,
        session_id: SessionId,
        identity: &str,
    ) -> Result<WsEventStream> {
        let ws_url = websocket_url(&self.base_url)?
            .join(&format!("ws/{session_id}/{identity}"))?;
        let (ws_stream, _) = connect_async(ws_url.as_str())
            .await
            .with_context(|| format!("failed to connect websocket: {ws_url}"))?;
        let (_, reader) = ws_stream.split();
        Ok(WsEventStream { reader })
    }
}

/// Read half of the session websocket. Text frames carry event
/// envelopes; everything else is transport chatter.
pub struct WsEventStream {
    reader: futures::stream::SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>,
}

#[async_trait]
impl EventStream for WsEventStream {
    async fn next_message(&mut self) -> Option<Result<String>> {
        while let Some(message) = self.reader.next().await {
            match message {
                Ok(Message::Text(text)) => return Some(Ok(text)),
                Ok(Message::Close(_)) => return None,
                Ok(other) => {
                    debug!(kind = ?other, "skipping non-text websocket frame");
                }
                Err(err) => return Some(Err(err.into())),
            }
        }
        None
    }
}

/// Submits assignment commands to the backend over HTTP.
pub struct HttpCommandSink {
    http: Client,
    base_url: Url,
}

impl HttpCommandSink {
    pub fn new(base_url: Url) -> Self {
        Self {
            http: Client::new(),
            base_url,
        }
    }
}

#[async_trait]
impl CommandSink for HttpCommandSink {
    async fn submit_assignment(&self, session_id: SessionId, command: AssignCommand) -> Result<()> {
        let url = self
            .base_url
            .join(&format!("auctions/{session_id}/assign"))?;
        self.http
            .post(url)
            .json(&command)
            .send()
            .await
            .context("assignment submission failed")?
            .error_for_status()
            .context("assignment rejected by transport")?;
        Ok(())
    }
}
