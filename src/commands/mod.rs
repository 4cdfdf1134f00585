//! Operator commands: registry, line dispatch and autocomplete.
//!
//! A line is split at its first space into a command name and the rest.
//! The command's parse routine turns the rest into [`CommandArgs`]; only then
//! is its run routine invoked. Neither a bad line nor a failing command can
//! take the input loop down.

mod complete;
mod handlers;
mod parse;
mod registry;

pub use complete::complete;
pub use parse::{
    filter_prefix, parse_channel_target, split_command, ChannelTarget, CommandArgs, Completion,
    ParseContext, ParseOutcome,
};
pub use registry::{Command, CommandRegistry, RegistryError};

use crate::chat::{ChatError, ChatHandle, Directory};
use crate::core::filters::{FilterStore, FilterStoreError};
use crate::ui::console::ConsoleSink;
use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error};

/// Everything a command may touch while running.
#[derive(Clone)]
pub struct CommandContext {
    pub registry: Arc<CommandRegistry>,
    pub directory: Directory,
    pub filters: Arc<FilterStore>,
    pub console: Arc<dyn ConsoleSink>,
    pub chat: ChatHandle,
}

impl CommandContext {
    pub fn write(&self, line: impl AsRef<str>) {
        self.console.write_line(line.as_ref());
    }
}

#[derive(Debug)]
pub enum CommandError {
    Filters(FilterStoreError),
    Chat(ChatError),
    /// Parsed arguments of a shape the command does not take.
    UnexpectedArgs(&'static str),
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Filters(err) => write!(f, "{err}"),
            CommandError::Chat(err) => write!(f, "{err}"),
            CommandError::UnexpectedArgs(command) => {
                write!(f, "{command} received arguments it cannot handle")
            }
        }
    }
}

impl std::error::Error for CommandError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CommandError::Filters(err) => Some(err),
            CommandError::Chat(err) => Some(err),
            CommandError::UnexpectedArgs(_) => None,
        }
    }
}

impl From<FilterStoreError> for CommandError {
    fn from(err: FilterStoreError) -> Self {
        CommandError::Filters(err)
    }
}

impl From<ChatError> for CommandError {
    fn from(err: ChatError) -> Self {
        CommandError::Chat(err)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Empty,
    Unknown(String),
    BadCommand(String),
    Ran,
    Failed,
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "panic".to_string()
    }
}

/// Parses `text` for `command`, turning a panic into a parse error.
pub(crate) fn parse_guarded(command: &Command, ctx: &ParseContext<'_>, text: &str) -> ParseOutcome {
    match catch_unwind(AssertUnwindSafe(|| (command.parse)(ctx, text))) {
        Ok(outcome) => outcome,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!(
                command = command.name,
                text, "Got error trying to parse text for command: {message}"
            );
            ParseOutcome::error(format!("internal error: {message}"), Completion::default())
        }
    }
}

/// Runs one operator line to completion.
pub fn dispatch_line(ctx: &CommandContext, line: &str) -> DispatchOutcome {
    if line.is_empty() {
        return DispatchOutcome::Empty;
    }

    let (name, rest) = split_command(line);
    let Some(command) = ctx.registry.lookup(name) else {
        debug!(command = name, "unknown command");
        ctx.write(format!("Unknown command: {name}"));
        return DispatchOutcome::Unknown(name.to_string());
    };

    let servers = ctx.directory.snapshot();
    let args = match parse_guarded(command, &ParseContext::new(&servers), rest).args {
        Ok(args) => args,
        Err(message) => {
            debug!(command = name, %message, "bad command");
            ctx.write(format!("{name}: bad command: {message}"));
            return DispatchOutcome::BadCommand(message);
        }
    };

    let failure = match catch_unwind(AssertUnwindSafe(|| (command.run)(ctx, args.clone()))) {
        Ok(Ok(())) => return DispatchOutcome::Ran,
        Ok(Err(err)) => err.to_string(),
        Err(payload) => panic_message(payload.as_ref()),
    };
    error!(
        command = name,
        args = ?args,
        "Got error trying to run command: {failure}"
    );
    ctx.write(format!("{name}: command failed (see log)"));
    DispatchOutcome::Failed
}

#[cfg(test)]
mod tests;
