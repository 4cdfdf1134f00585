//! Seam to the chat service.
//!
//! The network side implements [`ChatClient`]. It is driven on its own
//! single-threaded runtime by [`crate::ui::bridge`], which publishes the
//! server list into a shared [`Directory`] and forwards messages to the
//! foreground pool.

mod directory;
mod handle;
pub mod relay;

pub use directory::Directory;
pub use handle::{ChatHandle, Outbound};

use crate::core::message::{Message, Server};
use async_trait::async_trait;
use std::error::Error as StdError;
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    /// Full membership snapshot, sent after connecting.
    Ready(Vec<Server>),
    /// One server joined or changed.
    ServerUpdate(Server),
    ServerRemoved(String),
    Message(Message),
}

#[derive(Debug)]
pub enum ChatError {
    /// The service rejected the credential.
    Unauthorized,
    Transport(String),
    Protocol(String),
    /// The network driver has already shut down.
    Closed,
    TimedOut(Duration),
}

impl fmt::Display for ChatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatError::Unauthorized => write!(f, "credential rejected by the chat service"),
            ChatError::Transport(detail) => write!(f, "connection error: {detail}"),
            ChatError::Protocol(detail) => write!(f, "unexpected data from the chat service: {detail}"),
            ChatError::Closed => write!(f, "connection is closed"),
            ChatError::TimedOut(after) => write!(f, "no answer from the network side after {after:?}"),
        }
    }
}

impl StdError for ChatError {}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        ChatError::Transport(err.to_string())
    }
}

/// Connect / receive / send / close against the chat service.
///
/// `next_event` must be cancel-safe: the driver races it against outbound
/// requests with `tokio::select!`.
#[async_trait]
pub trait ChatClient: Send {
    async fn connect(&mut self, token: &str) -> Result<(), ChatError>;

    /// Next event from the service; `Ok(None)` once the stream has ended.
    async fn next_event(&mut self) -> Result<Option<ChatEvent>, ChatError>;

    async fn send(&mut self, server: &str, channel: &str, content: &str) -> Result<(), ChatError>;

    async fn close(&mut self) -> Result<(), ChatError>;
}
