//! Data model for what the chat service delivers.
//!
//! Servers and channels are never owned locally: the network side keeps a
//! live snapshot in [`crate::chat::Directory`] and commands resolve names
//! against it at the moment they run.

/// Literal shown in place of `server/channel` for direct messages.
pub const PRIVATE_ORIGIN: &str = "<private>";

/// Server and channel names match regardless of case, using full Unicode
/// lowercasing, the same rule applied when names are stored.
pub fn same_name(a: &str, b: &str) -> bool {
    a == b || a.to_lowercase() == b.to_lowercase()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Server {
    pub name: String,
    pub channels: Vec<Channel>,
}

impl Server {
    pub fn new(name: impl Into<String>, channels: &[&str]) -> Self {
        Self {
            name: name.into(),
            channels: channels
                .iter()
                .map(|name| Channel {
                    name: (*name).to_string(),
                })
                .collect(),
        }
    }

    /// Case-insensitive channel lookup.
    pub fn channel(&self, name: &str) -> Option<&Channel> {
        self.channels
            .iter()
            .find(|channel| same_name(&channel.name, name))
    }
}

/// Where a message was posted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    Channel { server: String, channel: String },
    Private,
}

impl Origin {
    pub fn channel(server: impl Into<String>, channel: impl Into<String>) -> Self {
        Origin::Channel {
            server: server.into(),
            channel: channel.into(),
        }
    }

    /// `server/channel`, or [`PRIVATE_ORIGIN`].
    pub fn label(&self) -> String {
        match self {
            Origin::Channel { server, channel } => format!("{server}/{channel}"),
            Origin::Private => PRIVATE_ORIGIN.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MessageKind {
    #[default]
    Default,
    /// Generated by the service (joins, pins, calls...).
    System,
}

/// A received message. Immutable once delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub origin: Origin,
    pub author: String,
    pub kind: MessageKind,
    /// Body with mentions resolved to display names.
    pub content: String,
    /// Service-generated description used for system messages.
    pub system_content: Option<String>,
    pub attachments: usize,
}

impl Message {
    pub fn display_text(&self) -> &str {
        match self.kind {
            MessageKind::Default => &self.content,
            MessageKind::System => self.system_content.as_deref().unwrap_or(&self.content),
        }
    }
}
