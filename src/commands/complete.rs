use super::parse::{filter_prefix, split_command, Completion, ParseContext};
use super::registry::CommandRegistry;
use super::parse_guarded;
use crate::core::message::Server;

/// Autocomplete for the in-progress line `text`.
///
/// Runs on every keystroke, so it only ever calls parse routines, which are
/// side-effect free, and it never panics past this point.
pub fn complete(registry: &CommandRegistry, servers: &[Server], text: &str) -> Completion {
    if !text.contains(' ') {
        let names = registry.names().map(str::to_string);
        return Completion::new("", filter_prefix(text, names));
    }

    let (name, rest) = split_command(text);
    let Some(command) = registry.lookup(name) else {
        return Completion::default();
    };

    let completion = parse_guarded(command, &ParseContext::new(servers), rest).completion;
    Completion::new(format!("{name} {}", completion.prefix), completion.candidates)
}
