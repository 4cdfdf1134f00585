//! HTTP relay client.
//!
//! Events arrive as server-sent events on `GET {endpoint}/events`; every
//! `data:` line carries one JSON object tagged by `type`. Outgoing messages
//! are plain JSON posts. Close cancels the event stream.

use std::collections::VecDeque;
use std::pin::Pin;

use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use memchr::memchr;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::chat::{ChatClient, ChatError, ChatEvent};
use crate::core::message::{Channel, Message, MessageKind, Origin, Server};
use crate::utils::url::{channel_messages_url, construct_api_url};

pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8787";

type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, reqwest::Error>> + Send>>;

#[derive(Debug, Deserialize)]
struct WireChannel {
    name: String,
}

#[derive(Debug, Deserialize)]
struct WireServer {
    name: String,
    #[serde(default)]
    channels: Vec<WireChannel>,
}

impl From<WireServer> for Server {
    fn from(wire: WireServer) -> Self {
        Server {
            name: wire.name,
            channels: wire
                .channels
                .into_iter()
                .map(|channel| Channel { name: channel.name })
                .collect(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
enum WireKind {
    #[default]
    Default,
    System,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    #[serde(default)]
    server: Option<String>,
    #[serde(default)]
    channel: Option<String>,
    author: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    system_content: Option<String>,
    #[serde(default)]
    kind: WireKind,
    #[serde(default)]
    attachments: Vec<serde_json::Value>,
}

impl From<WireMessage> for Message {
    fn from(wire: WireMessage) -> Self {
        let origin = match (wire.server, wire.channel) {
            (Some(server), Some(channel)) => Origin::Channel { server, channel },
            _ => Origin::Private,
        };
        Message {
            origin,
            author: wire.author,
            kind: match wire.kind {
                WireKind::Default => MessageKind::Default,
                WireKind::System => MessageKind::System,
            },
            content: wire.content,
            system_content: wire.system_content,
            attachments: wire.attachments.len(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum RelayEvent {
    Ready { servers: Vec<WireServer> },
    Server(WireServer),
    ServerRemoved { name: String },
    Message(WireMessage),
    #[serde(other)]
    Unknown,
}

fn extract_data_payload(line: &str) -> Option<&str> {
    line.strip_prefix("data:").map(str::trim_start)
}

/// Decodes one SSE line. Comments, keep-alives and unknown event types yield `None`.
fn parse_event_line(line: &str) -> Result<Option<ChatEvent>, ChatError> {
    let Some(payload) = extract_data_payload(line) else {
        return Ok(None);
    };
    if payload.trim().is_empty() {
        return Ok(None);
    }

    let event: RelayEvent =
        serde_json::from_str(payload).map_err(|err| ChatError::Protocol(err.to_string()))?;
    Ok(match event {
        RelayEvent::Ready { servers } => {
            Some(ChatEvent::Ready(servers.into_iter().map(Server::from).collect()))
        }
        RelayEvent::Server(server) => Some(ChatEvent::ServerUpdate(server.into())),
        RelayEvent::ServerRemoved { name } => Some(ChatEvent::ServerRemoved(name)),
        RelayEvent::Message(message) => Some(ChatEvent::Message(message.into())),
        RelayEvent::Unknown => None,
    })
}

pub struct RelayClient {
    http: reqwest::Client,
    endpoint: String,
    token: String,
    stream: Option<ByteStream>,
    buffer: Vec<u8>,
    pending: VecDeque<ChatEvent>,
    cancel_token: CancellationToken,
}

impl RelayClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
            token: String::new(),
            stream: None,
            buffer: Vec::new(),
            pending: VecDeque::new(),
            cancel_token: CancellationToken::new(),
        }
    }

    fn drain_buffer(&mut self) {
        while let Some(newline_pos) = memchr(b'\n', &self.buffer) {
            let line: Vec<u8> = self.buffer.drain(..=newline_pos).collect();
            let line = match std::str::from_utf8(&line) {
                Ok(s) => s.trim(),
                Err(e) => {
                    warn!("Invalid UTF-8 in event stream: {e}");
                    continue;
                }
            };
            match parse_event_line(line) {
                Ok(Some(event)) => self.pending.push_back(event),
                Ok(None) => {}
                Err(err) => warn!("Skipping event: {err}"),
            }
        }
    }
}

#[async_trait]
impl ChatClient for RelayClient {
    async fn connect(&mut self, token: &str) -> Result<(), ChatError> {
        self.token = token.to_string();
        let url = construct_api_url(&self.endpoint, "events");
        debug!(%url, "connecting to relay");

        let response = self
            .http
            .get(url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "text/event-stream")
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(ChatError::Unauthorized);
        }
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<no body>".to_string());
            return Err(ChatError::Transport(format!("{status}: {}", body.trim())));
        }

        self.stream = Some(Box::pin(
            response
                .bytes_stream()
                .map(|chunk| chunk.map(|bytes| bytes.to_vec())),
        ));
        Ok(())
    }

    async fn next_event(&mut self) -> Result<Option<ChatEvent>, ChatError> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Ok(Some(event));
            }
            let Some(stream) = self.stream.as_mut() else {
                return Ok(None);
            };

            let chunk = tokio::select! {
                _ = self.cancel_token.cancelled() => None,
                chunk = stream.next() => chunk,
            };

            match chunk {
                Some(Ok(bytes)) => {
                    self.buffer.extend_from_slice(&bytes);
                    self.drain_buffer();
                }
                Some(Err(err)) => {
                    self.stream = None;
                    return Err(err.into());
                }
                None => {
                    self.stream = None;
                    return Ok(None);
                }
            }
        }
    }

    async fn send(&mut self, server: &str, channel: &str, content: &str) -> Result<(), ChatError> {
        let url = channel_messages_url(&self.endpoint, server, channel).map_err(ChatError::Protocol)?;
        let response = self
            .http
            .post(url)
            .header("Authorization", format!("Bearer {}", self.token))
            .json(&serde_json::json!({ "content": content }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ChatError::Transport(format!(
                "send to {server}/{channel} failed: {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ChatError> {
        self.cancel_token.cancel();
        self.stream = None;
        self.buffer.clear();
        debug!("relay connection closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[test]
    fn parses_message_events() {
        let event = parse_event_line(
            r#"data: {"type":"message","server":"teamserv","channel":"random","author":"alice","content":"hi","attachments":[{},{}]}"#,
        )
        .expect("valid event")
        .expect("message event");

        match event {
            ChatEvent::Message(message) => {
                assert_eq!(message.origin, Origin::channel("teamserv", "random"));
                assert_eq!(message.attachments, 2);
                assert_eq!(message.kind, MessageKind::Default);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn messages_without_channel_are_private() {
        let event = parse_event_line(
            r#"data: {"type":"message","author":"bob","kind":"system","system_content":"bob called"}"#,
        )
        .expect("valid event");
        let Some(ChatEvent::Message(message)) = event else {
            panic!("expected message");
        };
        assert_eq!(message.origin, Origin::Private);
        assert_eq!(message.display_text(), "bob called");
    }

    #[test]
    fn ignores_comments_and_unknown_types() {
        assert!(parse_event_line(": keep-alive").expect("ok").is_none());
        assert!(parse_event_line("event: ping").expect("ok").is_none());
        assert!(parse_event_line(r#"data: {"type":"typing"}"#)
            .expect("ok")
            .is_none());
        assert!(parse_event_line("data: {broken").is_err());
    }

    async fn serve_once(listener: TcpListener, response: String) -> String {
        let (mut stream, _) = listener.accept().await.expect("accept");
        let mut request = vec![0u8; 4096];
        let read = stream.read(&mut request).await.expect("read request");
        stream
            .write_all(response.as_bytes())
            .await
            .expect("write response");
        stream.shutdown().await.ok();
        String::from_utf8_lossy(&request[..read]).to_string()
    }

    #[tokio::test]
    async fn streams_events_from_the_relay() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let body = concat!(
            "data: {\"type\":\"ready\",\"servers\":[{\"name\":\"teamserv\",\"channels\":[{\"name\":\"random\"}]}]}\n\n",
            ": keep-alive\n\n",
            "data: {\"type\":\"message\",\"server\":\"teamserv\",\"channel\":\"random\",\"author\":\"alice\",\"content\":\"hi\"}\n\n",
        );
        let response = format!(
            "HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        let server = tokio::spawn(serve_once(listener, response));

        let mut client = RelayClient::new(format!("http://{addr}/"));
        client.connect("secret").await.expect("connect");

        let ready = client.next_event().await.expect("event").expect("ready");
        assert_eq!(
            ready,
            ChatEvent::Ready(vec![Server::new("teamserv", &["random"])])
        );
        let message = client.next_event().await.expect("event").expect("message");
        assert!(matches!(message, ChatEvent::Message(ref m) if m.content == "hi"));
        assert!(client.next_event().await.expect("end").is_none());

        let request = server.await.expect("server task");
        assert!(request.starts_with("GET /events "));
        assert!(request
            .to_ascii_lowercase()
            .contains("authorization: bearer secret"));
    }

    #[tokio::test]
    async fn rejected_credentials_are_reported() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let response =
            "HTTP/1.1 401 Unauthorized\r\ncontent-length: 0\r\nconnection: close\r\n\r\n".to_string();
        let server = tokio::spawn(serve_once(listener, response));

        let mut client = RelayClient::new(format!("http://{addr}"));
        let err = client.connect("wrong").await.expect_err("should fail");
        assert!(matches!(err, ChatError::Unauthorized));
        server.await.expect("server task");
    }

    #[tokio::test]
    async fn close_ends_the_event_stream() {
        let mut client = RelayClient::new(DEFAULT_ENDPOINT);
        client.close().await.expect("close");
        assert!(client.next_event().await.expect("ok").is_none());
    }
}
