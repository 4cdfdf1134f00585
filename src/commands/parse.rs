//! Shared parsing pieces for command arguments.

use crate::core::message::{same_name, Server};

/// What the terminal should splice in on Tab: `prefix` is treated as already
/// typed, each candidate replaces whatever follows it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    pub prefix: String,
    pub candidates: Vec<String>,
}

impl Completion {
    pub fn new(prefix: impl Into<String>, candidates: Vec<String>) -> Self {
        Self {
            prefix: prefix.into(),
            candidates,
        }
    }
}

/// `SERVER/CHANNEL [EXTRA]`, names lowercased.
///
/// `extra` is `None` while the channel may still be mid-typing (no space
/// after it yet) and `Some("")` once a trailing space has been entered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelTarget {
    pub server: String,
    pub channel: String,
    pub extra: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandArgs {
    None,
    Channel(ChannelTarget),
    Server(Option<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOutcome {
    pub args: Result<CommandArgs, String>,
    pub completion: Completion,
}

impl ParseOutcome {
    pub fn ok(args: CommandArgs, completion: Completion) -> Self {
        Self {
            args: Ok(args),
            completion,
        }
    }

    pub fn error(message: impl Into<String>, completion: Completion) -> Self {
        Self {
            args: Err(message.into()),
            completion,
        }
    }
}

/// Read-only view handed to parse routines.
pub struct ParseContext<'a> {
    pub servers: &'a [Server],
}

impl<'a> ParseContext<'a> {
    pub fn new(servers: &'a [Server]) -> Self {
        Self { servers }
    }

    pub fn server(&self, name: &str) -> Option<&'a Server> {
        self.servers
            .iter()
            .find(|server| same_name(&server.name, name))
    }

    pub fn server_names(&self) -> impl Iterator<Item = String> + 'a {
        self.servers.iter().map(|server| server.name.to_lowercase())
    }
}

/// Items beginning with `prefix`.
pub fn filter_prefix<I>(prefix: &str, items: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    items
        .into_iter()
        .filter(|item| item.starts_with(prefix))
        .collect()
}

/// Splits `text` at the first space. `rest` is empty when there is no space.
pub fn split_command(text: &str) -> (&str, &str) {
    text.split_once(' ').unwrap_or((text, ""))
}

pub fn parse_channel_target(ctx: &ParseContext<'_>, text: &str) -> ParseOutcome {
    let Some((server, remaining)) = text.split_once('/') else {
        let candidates = filter_prefix(&text.to_lowercase(), ctx.server_names());
        return ParseOutcome::error("no channel given", Completion::new("", candidates));
    };

    let (channel, extra) = match remaining.split_once(' ') {
        Some((channel, extra)) => (channel, Some(extra.to_string())),
        None => (remaining, None),
    };

    let mut completion = Completion::default();
    if extra.is_none() {
        if let Some(known) = ctx.server(server) {
            let channels = known
                .channels
                .iter()
                .map(|channel| channel.name.to_lowercase());
            completion = Completion::new(
                format!("{server}/"),
                filter_prefix(&channel.to_lowercase(), channels),
            );
        }
    }

    ParseOutcome::ok(
        CommandArgs::Channel(ChannelTarget {
            server: server.to_lowercase(),
            channel: channel.to_lowercase(),
            extra,
        }),
        completion,
    )
}

/// Optional single server name, completing against known servers.
pub fn parse_optional_server(ctx: &ParseContext<'_>, text: &str) -> ParseOutcome {
    let name = text.trim();
    if name.contains(' ') {
        return ParseOutcome::error("expected at most one server name", Completion::default());
    }
    let completion = Completion::new("", filter_prefix(&name.to_lowercase(), ctx.server_names()));
    let args = if name.is_empty() {
        CommandArgs::Server(None)
    } else {
        CommandArgs::Server(Some(name.to_lowercase()))
    };
    ParseOutcome::ok(args, completion)
}

pub fn parse_no_args(_ctx: &ParseContext<'_>, text: &str) -> ParseOutcome {
    if text.trim().is_empty() {
        ParseOutcome::ok(CommandArgs::None, Completion::default())
    } else {
        ParseOutcome::error("takes no arguments", Completion::default())
    }
}
