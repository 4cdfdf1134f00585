use crate::core::message::same_name;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct ChannelRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore: Option<bool>,
}

/// Server-level defaults, inherited by channels that carry no rule of their own.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct ServerRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore: Option<bool>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub channels: BTreeMap<String, ChannelRule>,
}

/// Everything persisted in the filter file.
///
/// Keys this client does not know about are kept in `extra` so a save never
/// drops settings written by another version.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct FilterData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// `[server, channel]` pairs, both lowercase.
    #[serde(default)]
    pub ignore: Vec<(String, String)>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub servers: BTreeMap<String, ServerRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub whitelist: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl FilterData {
    pub fn server_rule(&self, server: &str) -> Option<&ServerRule> {
        self.servers
            .iter()
            .find(|(name, _)| same_name(name, server))
            .map(|(_, rule)| rule)
    }

    pub fn is_listed(&self, server: &str, channel: &str) -> bool {
        self.ignore
            .iter()
            .any(|(s, c)| same_name(s, server) && same_name(c, channel))
    }

    /// Adds `(server, channel)` to the ignore list. Returns `false` if it was already there.
    pub fn add_ignore(&mut self, server: &str, channel: &str) -> bool {
        if self.is_listed(server, channel) {
            return false;
        }
        self.ignore
            .push((server.to_lowercase(), channel.to_lowercase()));
        true
    }

    /// Drops `(server, channel)` from the ignore list. Returns `false` if it was absent.
    pub fn remove_ignore(&mut self, server: &str, channel: &str) -> bool {
        let before = self.ignore.len();
        self.ignore
            .retain(|(s, c)| !(same_name(s, server) && same_name(c, channel)));
        self.ignore.len() != before
    }

    pub fn set_channel_ignore(&mut self, server: &str, channel: &str, ignore: bool) {
        self.servers
            .entry(server.to_lowercase())
            .or_default()
            .channels
            .entry(channel.to_lowercase())
            .or_default()
            .ignore = Some(ignore);
    }

    /// Whether channel messages from `server/channel` are hidden.
    ///
    /// A channel-level rule wins over the ignore list, which wins over the
    /// server-level default. No rule at all means "shown".
    pub fn is_ignored(&self, server: &str, channel: &str) -> bool {
        let server_rule = self.server_rule(server);
        let channel_rule = server_rule.and_then(|rule| {
            rule.channels
                .iter()
                .find(|(name, _)| same_name(name, channel))
                .and_then(|(_, rule)| rule.ignore)
        });

        if let Some(ignore) = channel_rule {
            return ignore;
        }
        if self.is_listed(server, channel) {
            return true;
        }
        server_rule.and_then(|rule| rule.ignore).unwrap_or(false)
    }
}

pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}
