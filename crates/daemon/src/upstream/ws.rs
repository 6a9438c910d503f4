// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Home Assistant websocket session.
//!
//! Handshake: the server greets with `auth_required`, we answer with
//! the access token, then subscribe to all events. After that the
//! socket yields event frames until it closes.

use super::UpstreamError;
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const SUBSCRIBE_ID: u64 = 1;

pub struct HaSocket {
    stream: WsStream,
}

impl HaSocket {
    /// Connect, authenticate, and subscribe to the event stream.
    pub async fn connect(url: &str, token: &str) -> Result<Self, UpstreamError> {
        debug!(url, "connecting websocket");
        let (stream, _response) = connect_async(url).await?;
        let mut socket = Self { stream };

        // server speaks first: auth_required
        let greeting = socket.expect_text().await?;
        if message_type(&greeting) != Some("auth_required") {
            return Err(UpstreamError::Handshake(greeting));
        }

        socket
            .send_json(&json!({"type": "auth", "access_token": token}))
            .await?;
        let verdict = socket.expect_text().await?;
        match message_type(&verdict) {
            Some("auth_ok") => {}
            Some("auth_invalid") => {
                return Err(UpstreamError::Auth("access token rejected".to_string()))
            }
            _ => return Err(UpstreamError::Handshake(verdict)),
        }

        socket
            .send_json(&json!({"id": SUBSCRIBE_ID, "type": "subscribe_events"}))
            .await?;
        let result = socket.expect_text().await?;
        if message_type(&result) != Some("result") {
            return Err(UpstreamError::Handshake(result));
        }

        info!("websocket authenticated and subscribed");
        Ok(socket)
    }

    async fn send_json(&mut self, value: &serde_json::Value) -> Result<(), UpstreamError> {
        self.stream.send(Message::text(value.to_string())).await?;
        Ok(())
    }

    async fn expect_text(&mut self) -> Result<String, UpstreamError> {
        match self.next_text().await? {
            Some(text) => Ok(text),
            None => Err(UpstreamError::Handshake("connection closed".to_string())),
        }
    }

    /// Next text frame; answers pings, skips binary. `None` when the
    /// peer closed.
    pub async fn next_text(&mut self) -> Result<Option<String>, UpstreamError> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Some(text.to_string())),
                Some(Ok(Message::Ping(payload))) => {
                    self.stream.send(Message::Pong(payload)).await?;
                }
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
            }
        }
    }
}

fn message_type(text: &str) -> Option<&str> {
    // cheap peek without fully modelling the message
    let value: serde_json::Value = serde_json::from_str(text).ok()?;
    match value.get("type")?.as_str()? {
        "auth_required" => Some("auth_required"),
        "auth_ok" => Some("auth_ok"),
        "auth_invalid" => Some("auth_invalid"),
        "result" => Some("result"),
        _ => Some("other"),
    }
}
