//! Turns a received message into the line shown on the console.

use crate::core::filters::FilterData;
use crate::core::message::{same_name, Message, Origin};
use crate::core::session::SessionContext;
use crate::utils::color::origin_color;
use crossterm::style::Stylize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterDecision {
    Show,
    Suppress,
}

/// Decides whether `message` is displayed.
///
/// Private messages are always shown. For channel messages a configured
/// server whitelist is checked first and overrides every per-channel rule;
/// the command-line whitelist takes precedence over the one in the file.
pub fn filter_decision(
    message: &Message,
    filters: &FilterData,
    session: &SessionContext,
) -> FilterDecision {
    let Origin::Channel { server, channel } = &message.origin else {
        return FilterDecision::Show;
    };

    let file_whitelist = filters
        .whitelist
        .as_deref()
        .filter(|names| !names.is_empty());
    let whitelist = session.whitelist().or(file_whitelist);
    if let Some(allowed) = whitelist {
        if !allowed.iter().any(|name| same_name(name, server)) {
            return FilterDecision::Suppress;
        }
    }

    if filters.is_ignored(server, channel) {
        FilterDecision::Suppress
    } else {
        FilterDecision::Show
    }
}

/// Renders `origin author (N attachments): body` in the origin's session color.
pub fn render_message(message: &Message, session: &SessionContext) -> String {
    let origin = message.origin.label();
    let attachments = if message.attachments > 0 {
        format!(" ({} attachments)", message.attachments)
    } else {
        String::new()
    };
    let text = format!(
        "{} {}{}: {}",
        origin,
        message.author,
        attachments,
        message.display_text()
    );
    let color = origin_color(session.color_seed(), &origin, session.color_depth());
    text.with(color).to_string()
}

pub fn format_message(
    message: &Message,
    filters: &FilterData,
    session: &SessionContext,
) -> Option<String> {
    match filter_decision(message, filters, session) {
        FilterDecision::Show => Some(render_message(message, session)),
        FilterDecision::Suppress => None,
    }
}
