use super::parse::{
    parse_channel_target, parse_no_args, parse_optional_server, ChannelTarget, CommandArgs,
    ParseContext, ParseOutcome,
};
use super::registry::Command;
use super::{CommandContext, CommandError};
use crate::core::message::{same_name, Channel, Server};

pub(super) const BUILTIN_COMMANDS: &[Command] = &[
    Command {
        name: "help",
        usage: "help",
        help: "List the available commands.",
        parse: parse_no_args,
        run: handle_help,
    },
    Command {
        name: "ignore",
        usage: "ignore SERVER/CHANNEL",
        help: "Stop showing messages from a channel.",
        parse: parse_channel_target,
        run: handle_ignore,
    },
    Command {
        name: "unignore",
        usage: "unignore SERVER/CHANNEL",
        help: "Show messages from a previously ignored channel again.",
        parse: parse_channel_target,
        run: handle_unignore,
    },
    Command {
        name: "say",
        usage: "say SERVER/CHANNEL TEXT",
        help: "Send a message to a channel.",
        parse: parse_say,
        run: handle_say,
    },
    Command {
        name: "servers",
        usage: "servers [SERVER]",
        help: "List servers, or the channels of one server, with their filter state.",
        parse: parse_optional_server,
        run: handle_servers,
    },
];

fn channel_args(command: &'static str, args: CommandArgs) -> Result<ChannelTarget, CommandError> {
    match args {
        CommandArgs::Channel(target) => Ok(target),
        _ => Err(CommandError::UnexpectedArgs(command)),
    }
}

/// Resolves a target against the live server list, telling the operator
/// when either name is unknown.
fn resolve_target(ctx: &CommandContext, target: &ChannelTarget) -> Option<(Server, Channel)> {
    let servers = ctx.directory.snapshot();
    let Some(server) = servers
        .into_iter()
        .find(|server| same_name(&server.name, &target.server))
    else {
        ctx.write(format!("No such server: {:?}", target.server));
        return None;
    };
    let Some(channel) = server.channel(&target.channel).cloned() else {
        ctx.write(format!("No such channel: {:?}", target.channel));
        return None;
    };
    Some((server, channel))
}

fn handle_help(ctx: &CommandContext, _args: CommandArgs) -> Result<(), CommandError> {
    for (_, command) in ctx.registry.all() {
        ctx.write(format!("{:<28} {}", command.usage, command.help));
    }
    Ok(())
}

fn handle_ignore(ctx: &CommandContext, args: CommandArgs) -> Result<(), CommandError> {
    let target = channel_args("ignore", args)?;
    if resolve_target(ctx, &target).is_none() {
        return Ok(());
    }

    let added = ctx
        .filters
        .edit(|filters| Ok::<_, CommandError>(filters.add_ignore(&target.server, &target.channel)))?;
    if added {
        ctx.write(format!("Ignored channel {}/{}", target.server, target.channel));
    } else {
        ctx.write(format!("Already ignoring {}/{}", target.server, target.channel));
    }
    Ok(())
}

fn handle_unignore(ctx: &CommandContext, args: CommandArgs) -> Result<(), CommandError> {
    let target = channel_args("unignore", args)?;
    let ChannelTarget {
        server, channel, ..
    } = &target;

    let changed = ctx.filters.edit(|filters| {
        let mut changed = filters.remove_ignore(server, channel);
        if filters.is_ignored(server, channel) {
            filters.set_channel_ignore(server, channel, false);
            changed = true;
        }
        Ok::<_, CommandError>(changed)
    })?;

    if changed {
        ctx.write(format!("Unignored channel {server}/{channel}"));
    } else {
        ctx.write(format!("Channel {server}/{channel} was not ignored"));
    }
    Ok(())
}

fn parse_say(ctx: &ParseContext<'_>, text: &str) -> ParseOutcome {
    let outcome = parse_channel_target(ctx, text);
    match &outcome.args {
        Ok(CommandArgs::Channel(target))
            if target.extra.as_deref().map_or(true, |extra| extra.trim().is_empty()) =>
        {
            ParseOutcome::error("no message given", outcome.completion)
        }
        _ => outcome,
    }
}

fn handle_say(ctx: &CommandContext, args: CommandArgs) -> Result<(), CommandError> {
    let target = channel_args("say", args)?;
    let Some((server, channel)) = resolve_target(ctx, &target) else {
        return Ok(());
    };
    let content = target.extra.unwrap_or_default();
    ctx.chat.send_message(&server.name, &channel.name, &content)?;
    Ok(())
}

fn handle_servers(ctx: &CommandContext, args: CommandArgs) -> Result<(), CommandError> {
    let CommandArgs::Server(filter) = args else {
        return Err(CommandError::UnexpectedArgs("servers"));
    };
    let servers = ctx.directory.snapshot();
    let filters = ctx.filters.snapshot();
    let marker = |server: &str, channel: &str| {
        if filters.is_ignored(server, channel) {
            " (ignored)"
        } else {
            ""
        }
    };

    match filter {
        None => {
            if servers.is_empty() {
                ctx.write("Not a member of any server yet");
            }
            for server in &servers {
                ctx.write(format!("{} ({} channels)", server.name, server.channels.len()));
            }
        }
        Some(name) => {
            let Some(server) = servers
                .iter()
                .find(|server| same_name(&server.name, &name))
            else {
                ctx.write(format!("No such server: {name:?}"));
                return Ok(());
            };
            for channel in &server.channels {
                ctx.write(format!(
                    "{}/{}{}",
                    server.name,
                    channel.name,
                    marker(&server.name, &channel.name)
                ));
            }
        }
    }
    Ok(())
}
