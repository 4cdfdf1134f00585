use super::*;
use crate::chat::Outbound;
use crate::core::filters::FilterData;
use crate::core::message::Server;
use crate::utils::test_utils::CapturingConsole;
use tempfile::TempDir;
use tokio::sync::mpsc;

struct Fixture {
    ctx: CommandContext,
    console: Arc<CapturingConsole>,
    outbound: mpsc::UnboundedReceiver<Outbound>,
    _dir: TempDir,
}

fn servers() -> Vec<Server> {
    vec![
        Server::new("myserv", &["general", "random", "chatter"]),
        Server::new("otherserv", &["general"]),
        Server::new("ServNet", &["lobby"]),
        Server::new("teamserv", &["general", "random"]),
    ]
}

fn fixture_with(registry: CommandRegistry) -> Fixture {
    let dir = TempDir::new().expect("temp dir");
    let console = Arc::new(CapturingConsole::default());
    let (tx, outbound) = mpsc::unbounded_channel();
    let ctx = CommandContext {
        registry: Arc::new(registry),
        directory: Directory::new(servers()),
        filters: Arc::new(FilterStore::with_data(
            dir.path().join("filters.json"),
            FilterData::default(),
        )),
        console: console.clone(),
        chat: ChatHandle::new(tx),
    };
    Fixture {
        ctx,
        console,
        outbound,
        _dir: dir,
    }
}

fn fixture() -> Fixture {
    fixture_with(CommandRegistry::builtin().expect("builtin commands"))
}

fn parse_target(text: &str) -> ParseOutcome {
    let servers = servers();
    parse_channel_target(&ParseContext::new(&servers), text)
}

fn target(server: &str, channel: &str, extra: Option<&str>) -> CommandArgs {
    CommandArgs::Channel(ChannelTarget {
        server: server.to_string(),
        channel: channel.to_string(),
        extra: extra.map(str::to_string),
    })
}

fn parse_panics(_ctx: &ParseContext<'_>, _text: &str) -> ParseOutcome {
    panic!("parser blew up");
}

fn run_panics(_ctx: &CommandContext, _args: CommandArgs) -> Result<(), CommandError> {
    panic!("handler blew up");
}

fn run_nothing(_ctx: &CommandContext, _args: CommandArgs) -> Result<(), CommandError> {
    Ok(())
}

fn command(name: &'static str, parse: registry::ParseFn, run: registry::RunFn) -> Command {
    Command {
        name,
        usage: name,
        help: "test command",
        parse,
        run,
    }
}

#[test]
fn duplicate_names_are_rejected() {
    let err = CommandRegistry::new(&[
        command("ping", parse::parse_no_args, run_nothing),
        command("PING", parse::parse_no_args, run_nothing),
    ])
    .err()
    .expect("duplicate must fail");
    assert_eq!(err, RegistryError::DuplicateName("ping".to_string()));

    assert!(matches!(
        CommandRegistry::new(&[command("two words", parse::parse_no_args, run_nothing)]),
        Err(RegistryError::InvalidName(_))
    ));
}

#[test]
fn lookup_is_case_sensitive() {
    let registry = CommandRegistry::builtin().expect("builtin commands");
    assert!(registry.lookup("ignore").is_some());
    assert!(registry.lookup("IGNORE").is_none());
}

#[test]
fn partial_server_lists_matching_servers() {
    let outcome = parse_target("serv");
    assert_eq!(outcome.args, Err("no channel given".to_string()));
    assert_eq!(
        outcome.completion,
        Completion::new("", vec!["servnet".to_string()])
    );

    let outcome = parse_target("my");
    assert_eq!(outcome.completion.candidates, vec!["myserv".to_string()]);
}

#[test]
fn partial_channel_completes_after_the_slash() {
    let outcome = parse_target("myserv/cha");
    assert_eq!(outcome.args, Ok(target("myserv", "cha", None)));
    assert_eq!(
        outcome.completion,
        Completion::new("myserv/", vec!["chatter".to_string()])
    );
}

#[test]
fn extra_text_is_kept_and_completion_stops() {
    let outcome = parse_target("MyServ/General extra text");
    assert_eq!(
        outcome.args,
        Ok(target("myserv", "general", Some("extra text")))
    );
    assert!(outcome.completion.candidates.is_empty());
}

#[test]
fn trailing_space_means_empty_extra() {
    assert_eq!(
        parse_target("myserv/general").args,
        Ok(target("myserv", "general", None))
    );
    assert_eq!(
        parse_target("myserv/general ").args,
        Ok(target("myserv", "general", Some("")))
    );
}

#[test]
fn unknown_server_parses_without_completion() {
    let outcome = parse_target("nowhere/general");
    assert_eq!(outcome.args, Ok(target("nowhere", "general", None)));
    assert!(outcome.completion.candidates.is_empty());
}

#[test]
fn autocomplete_covers_names_and_arguments() {
    let registry = CommandRegistry::builtin().expect("builtin commands");
    let servers = servers();

    assert_eq!(
        complete(&registry, &servers, "ig"),
        Completion::new("", vec!["ignore".to_string()])
    );
    assert_eq!(
        complete(&registry, &servers, "ignore other"),
        Completion::new("ignore ", vec!["otherserv".to_string()])
    );
    assert_eq!(
        complete(&registry, &servers, "ignore teamserv/r"),
        Completion::new("ignore teamserv/", vec!["random".to_string()])
    );
    assert_eq!(
        complete(&registry, &servers, "bogus x"),
        Completion::default()
    );
}

#[test]
fn autocomplete_survives_a_panicking_parser() {
    let registry =
        CommandRegistry::new(&[command("bad", parse_panics, run_nothing)]).expect("registry");
    assert_eq!(
        complete(&registry, &servers(), "bad x").candidates,
        Vec::<String>::new()
    );
}

#[test]
fn unknown_and_bad_commands_are_reported() {
    let f = fixture();

    assert_eq!(
        dispatch_line(&f.ctx, "frobnicate now"),
        DispatchOutcome::Unknown("frobnicate".to_string())
    );
    assert_eq!(
        dispatch_line(&f.ctx, "ignore teamserv"),
        DispatchOutcome::BadCommand("no channel given".to_string())
    );
    assert_eq!(dispatch_line(&f.ctx, ""), DispatchOutcome::Empty);

    assert_eq!(
        f.console.lines(),
        vec![
            "Unknown command: frobnicate".to_string(),
            "ignore: bad command: no channel given".to_string(),
        ]
    );
}

#[test]
fn only_the_empty_line_is_ignored() {
    let f = fixture();

    assert_eq!(
        dispatch_line(&f.ctx, " "),
        DispatchOutcome::Unknown(String::new())
    );
    assert_eq!(f.console.lines(), vec!["Unknown command: ".to_string()]);
}

#[test]
fn non_ascii_names_match_regardless_of_case() {
    let mut f = fixture();
    f.ctx.directory = Directory::new(vec![Server::new("ÉQUIPE", &["Général"])]);

    assert_eq!(dispatch_line(&f.ctx, "ignore ÉQUIPE/GÉNÉRAL"), DispatchOutcome::Ran);
    assert_eq!(
        f.console.lines(),
        vec!["Ignored channel équipe/général".to_string()]
    );

    let filters = f.ctx.filters.snapshot();
    assert_eq!(
        filters.ignore,
        vec![("équipe".to_string(), "général".to_string())]
    );
    assert!(filters.is_ignored("ÉQUIPE", "GÉNÉRAL"));
    assert!(filters.is_ignored("Équipe", "général"));

    let servers = f.ctx.directory.snapshot();
    let outcome = parse_channel_target(&ParseContext::new(&servers), "équipe/gé");
    assert_eq!(
        outcome.completion,
        Completion::new("équipe/", vec!["général".to_string()])
    );
}

#[test]
fn panics_in_parse_or_run_do_not_escape() {
    let registry = CommandRegistry::new(&[
        command("parsefail", parse_panics, run_nothing),
        command("runfail", parse::parse_no_args, run_panics),
    ])
    .expect("registry");
    let f = fixture_with(registry);

    assert!(matches!(
        dispatch_line(&f.ctx, "parsefail x"),
        DispatchOutcome::BadCommand(_)
    ));
    assert_eq!(dispatch_line(&f.ctx, "runfail"), DispatchOutcome::Failed);
    assert!(f.console.contains("runfail: command failed (see log)"));
}

#[test]
fn ignore_is_idempotent_and_persisted() {
    let f = fixture();

    assert_eq!(dispatch_line(&f.ctx, "ignore teamserv/random extra"), DispatchOutcome::Ran);
    assert_eq!(dispatch_line(&f.ctx, "ignore TeamServ/Random"), DispatchOutcome::Ran);

    assert_eq!(
        f.ctx.filters.snapshot().ignore,
        vec![("teamserv".to_string(), "random".to_string())]
    );
    let saved = FilterData::load_from_path(f.ctx.filters.path()).expect("saved file");
    assert_eq!(saved.ignore.len(), 1);
    assert_eq!(
        f.console.lines(),
        vec![
            "Ignored channel teamserv/random".to_string(),
            "Already ignoring teamserv/random".to_string(),
        ]
    );
}

#[test]
fn ignore_checks_the_live_directory() {
    let f = fixture();

    dispatch_line(&f.ctx, "ignore nowhere/general");
    dispatch_line(&f.ctx, "ignore teamserv/missing");

    assert!(f.ctx.filters.snapshot().ignore.is_empty());
    assert_eq!(
        f.console.lines(),
        vec![
            "No such server: \"nowhere\"".to_string(),
            "No such channel: \"missing\"".to_string(),
        ]
    );
}

#[test]
fn unignore_clears_list_entries_and_server_defaults() {
    let f = fixture();
    dispatch_line(&f.ctx, "ignore teamserv/random");
    dispatch_line(&f.ctx, "unignore teamserv/random");
    assert!(!f.ctx.filters.snapshot().is_ignored("teamserv", "random"));

    f.ctx
        .filters
        .edit(|data| {
            data.servers.entry("myserv".to_string()).or_default().ignore = Some(true);
            Ok::<_, FilterStoreError>(())
        })
        .expect("seed server default");
    dispatch_line(&f.ctx, "unignore myserv/general");
    let filters = f.ctx.filters.snapshot();
    assert!(!filters.is_ignored("myserv", "general"));
    assert!(filters.is_ignored("myserv", "random"));

    dispatch_line(&f.ctx, "unignore otherserv/general");
    assert!(f
        .console
        .contains("Channel otherserv/general was not ignored"));
}

#[test]
fn say_queues_an_outbound_message() {
    let mut f = fixture();

    assert!(matches!(
        dispatch_line(&f.ctx, "say teamserv/general"),
        DispatchOutcome::BadCommand(_)
    ));
    assert_eq!(
        dispatch_line(&f.ctx, "say teamserv/general hello all"),
        DispatchOutcome::Ran
    );

    match f.outbound.try_recv() {
        Ok(Outbound::Send {
            server,
            channel,
            content,
        }) => {
            assert_eq!(
                (server.as_str(), channel.as_str(), content.as_str()),
                ("teamserv", "general", "hello all")
            );
        }
        other => panic!("expected a queued send, got {other:?}"),
    }
}

#[test]
fn say_fails_once_the_connection_is_gone() {
    let mut f = fixture();
    f.outbound.close();
    assert_eq!(
        dispatch_line(&f.ctx, "say teamserv/general hello"),
        DispatchOutcome::Failed
    );
}

#[test]
fn help_and_servers_list_what_they_know() {
    let f = fixture();
    dispatch_line(&f.ctx, "ignore myserv/random");

    dispatch_line(&f.ctx, "help");
    assert!(f.console.contains("ignore SERVER/CHANNEL"));

    dispatch_line(&f.ctx, "servers");
    assert!(f.console.contains("myserv (3 channels)"));

    dispatch_line(&f.ctx, "servers myserv");
    assert!(f.console.contains("myserv/random (ignored)"));
    assert!(f.console.contains("myserv/general"));

    assert!(matches!(
        dispatch_line(&f.ctx, "help me"),
        DispatchOutcome::BadCommand(_)
    ));
}
