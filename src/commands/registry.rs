use super::parse::{CommandArgs, ParseContext, ParseOutcome};
use super::{CommandContext, CommandError};
use std::fmt;

pub type ParseFn = fn(&ParseContext<'_>, &str) -> ParseOutcome;
pub type RunFn = fn(&CommandContext, CommandArgs) -> Result<(), CommandError>;

/// One operator command.
///
/// `parse` only sees a read-only snapshot and is also used for autocomplete on
/// every keystroke; all state changes belong in `run`.
#[derive(Clone, Copy)]
pub struct Command {
    pub name: &'static str,
    pub usage: &'static str,
    pub help: &'static str,
    pub parse: ParseFn,
    pub run: RunFn,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    DuplicateName(String),
    InvalidName(String),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::DuplicateName(name) => {
                write!(f, "command name {name:?} is registered twice")
            }
            RegistryError::InvalidName(name) => {
                write!(f, "command name {name:?} must be a single non-empty word")
            }
        }
    }
}

impl std::error::Error for RegistryError {}

/// Catalog of commands, filled once at startup and read-only afterwards.
#[derive(Default)]
pub struct CommandRegistry {
    entries: Vec<(String, Command)>,
}

impl CommandRegistry {
    pub fn new(commands: &[Command]) -> Result<Self, RegistryError> {
        let mut registry = Self::default();
        for command in commands {
            registry.register(*command)?;
        }
        Ok(registry)
    }

    /// Registry holding every built-in command.
    pub fn builtin() -> Result<Self, RegistryError> {
        Self::new(super::handlers::BUILTIN_COMMANDS)
    }

    /// Adds `command` under its lowercased name, rejecting collisions.
    pub fn register(&mut self, command: Command) -> Result<(), RegistryError> {
        let name = command.name.to_lowercase();
        if name.is_empty() || name.contains(char::is_whitespace) {
            return Err(RegistryError::InvalidName(command.name.to_string()));
        }
        if self.entries.iter().any(|(existing, _)| *existing == name) {
            return Err(RegistryError::DuplicateName(name));
        }
        self.entries.push((name, command));
        Ok(())
    }

    /// Exact, case-sensitive lookup.
    pub fn lookup(&self, name: &str) -> Option<&Command> {
        self.entries
            .iter()
            .find(|(registered, _)| registered == name)
            .map(|(_, command)| command)
    }

    pub fn all(&self) -> impl Iterator<Item = (&str, &Command)> {
        self.entries
            .iter()
            .map(|(name, command)| (name.as_str(), command))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }
}
