//! Fakes shared by unit tests across the crate.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::chat::{ChatClient, ChatError, ChatEvent};
use crate::ui::console::{ConsoleSink, LineSource, ReadError};

/// What a [`ScriptedClient`] saw, readable after it moved to its thread.
#[derive(Debug, Default)]
pub struct ClientRecord {
    pub token: Option<String>,
    pub sent: Vec<(String, String, String)>,
    pub closed: bool,
}

/// Replays a fixed list of events, then idles until closed (or reports the
/// end of the stream when built with [`ScriptedClient::ending`]).
pub struct ScriptedClient {
    events: VecDeque<ChatEvent>,
    record: Arc<Mutex<ClientRecord>>,
    connect_error: Option<ChatError>,
    ends: bool,
    hangs_on_close: bool,
}

impl ScriptedClient {
    pub fn new(events: Vec<ChatEvent>) -> (Self, Arc<Mutex<ClientRecord>>) {
        let record = Arc::new(Mutex::new(ClientRecord::default()));
        (
            Self {
                events: events.into(),
                record: record.clone(),
                connect_error: None,
                ends: false,
                hangs_on_close: false,
            },
            record,
        )
    }

    /// Stream ends once the script is exhausted.
    pub fn ending(events: Vec<ChatEvent>) -> Self {
        let (mut client, _) = Self::new(events);
        client.ends = true;
        client
    }

    /// `close` never returns.
    pub fn hanging_on_close(events: Vec<ChatEvent>) -> Self {
        let (mut client, _) = Self::new(events);
        client.hangs_on_close = true;
        client
    }

    pub fn failing_connect(err: ChatError) -> Self {
        let (mut client, _) = Self::new(Vec::new());
        client.connect_error = Some(err);
        client
    }
}

#[async_trait]
impl ChatClient for ScriptedClient {
    async fn connect(&mut self, token: &str) -> Result<(), ChatError> {
        if let Some(err) = self.connect_error.take() {
            return Err(err);
        }
        self.record.lock().unwrap().token = Some(token.to_string());
        Ok(())
    }

    async fn next_event(&mut self) -> Result<Option<ChatEvent>, ChatError> {
        if let Some(event) = self.events.pop_front() {
            return Ok(Some(event));
        }
        if self.ends {
            return Ok(None);
        }
        std::future::pending().await
    }

    async fn send(&mut self, server: &str, channel: &str, content: &str) -> Result<(), ChatError> {
        self.record.lock().unwrap().sent.push((
            server.to_string(),
            channel.to_string(),
            content.to_string(),
        ));
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ChatError> {
        self.record.lock().unwrap().closed = true;
        if self.hangs_on_close {
            std::future::pending::<()>().await;
        }
        Ok(())
    }
}

/// Hands out canned lines, then end of input.
pub struct ScriptedInput {
    lines: VecDeque<Result<String, ReadError>>,
}

impl ScriptedInput {
    pub fn new(lines: &[&str]) -> Self {
        Self {
            lines: lines.iter().map(|line| Ok((*line).to_string())).collect(),
        }
    }

    pub fn then_fail(mut self, err: ReadError) -> Self {
        self.lines.push_back(Err(err));
        self
    }
}

impl LineSource for ScriptedInput {
    fn read_line(&mut self) -> Result<String, ReadError> {
        self.lines.pop_front().unwrap_or(Err(ReadError::Eof))
    }
}

/// Records every line written to it.
#[derive(Default)]
pub struct CapturingConsole {
    lines: Mutex<Vec<String>>,
}

impl CapturingConsole {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|line| line.contains(needle))
    }

    /// Polls until a line containing `needle` shows up.
    pub async fn wait_for(&self, needle: &str) -> bool {
        wait_until(|| self.contains(needle)).await
    }
}

impl ConsoleSink for CapturingConsole {
    fn write_line(&self, line: &str) {
        self.lines.lock().unwrap().push(line.to_string());
    }
}

/// Polls `condition` for up to five seconds.
pub async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}
