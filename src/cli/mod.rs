//! Command-line interface parsing and startup
//!
//! Parses flags, loads the filter file, resolves the credential and hands the
//! terminal and the relay client to the supervisor.

use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use directories::BaseDirs;
use tracing::{info, warn};

use crate::chat::relay::{RelayClient, DEFAULT_ENDPOINT};
use crate::chat::Directory;
use crate::commands::{complete, CommandRegistry};
use crate::core::filters::{FilterData, FilterStore};
use crate::core::session::SessionContext;
use crate::core::supervisor::{supervise, RestartPolicy, SessionError};
use crate::ui::bridge::{run_session, SharedState};
use crate::ui::console::{spawn_input_reader, RustylineConsole};
use crate::utils::logging::{init_logging, route_to_console};

/// How long shutdown waits for the network side to confirm the close.
pub const CLOSE_TIMEOUT: Duration = Duration::from_secs(10);

const CONFIG_FILE_NAME: &str = ".chatmux.json";
const ENDPOINT_ENV: &str = "CHATMUX_ENDPOINT";

#[derive(Parser, Debug)]
#[command(name = "chatmux")]
#[command(about = "A line-oriented terminal client for multi-server chat")]
#[command(
    long_about = "chatmux shows messages from every server and channel you belong to in \
one scrolling terminal, colored by where they came from, and takes commands on \
the prompt below.\n\n\
Filters and settings live in a JSON file (default ~/.chatmux.json). The token \
is read from --token or from the \"token\" key of that file.\n\n\
Commands:\n\
  help                       List commands\n\
  ignore SERVER/CHANNEL      Hide a channel\n\
  unignore SERVER/CHANNEL    Show a hidden channel again\n\
  say SERVER/CHANNEL TEXT    Send a message\n\
  servers [SERVER]           List servers or channels\n\n\
Press Tab to complete commands, servers and channels. Ctrl-D quits."
)]
pub struct Args {
    /// Token used to connect to the chat service
    #[arg(short = 't', long)]
    pub token: Option<String>,

    /// Log filter, e.g. "warn" or "chatmux=debug"
    #[arg(short = 'l', long, default_value = "warn")]
    pub log: String,

    /// Path of the filter file
    #[arg(short = 'c', long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Only show channel messages from this server (repeatable)
    #[arg(short = 's', long = "server", value_name = "NAME", value_parser = parse_server_name)]
    pub servers: Vec<String>,
}

fn parse_server_name(name: &str) -> Result<String, String> {
    let name = name.trim();
    if name.is_empty() {
        return Err("server name cannot be empty".to_string());
    }
    Ok(name.to_lowercase())
}

pub fn default_config_path() -> Option<PathBuf> {
    BaseDirs::new().map(|dirs| dirs.home_dir().join(CONFIG_FILE_NAME))
}

/// Command-line flag first, then the filter file.
pub fn resolve_token(flag: Option<&str>, filters: &FilterData) -> Result<String, SessionError> {
    flag.or(filters.token.as_deref())
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .ok_or(SessionError::MissingCredential)
}

pub fn resolve_endpoint(filters: &FilterData, env_endpoint: Option<String>) -> String {
    filters
        .endpoint
        .clone()
        .or(env_endpoint)
        .filter(|endpoint| !endpoint.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string())
}

/// Everything a session needs from the filter file and flags.
pub struct Startup {
    pub filters: Arc<FilterStore>,
    pub token: String,
    pub endpoint: String,
}

/// Loads the filter file and resolves the credential and endpoint. Failures
/// here are configuration errors and never retried.
pub fn load_startup(
    config_path: &Path,
    token_flag: Option<&str>,
    env_endpoint: Option<String>,
) -> Result<Startup, SessionError> {
    let filters = FilterStore::open(config_path)?;
    let data = filters.snapshot();
    let token = resolve_token(token_flag, &data)?;
    let endpoint = resolve_endpoint(&data, env_endpoint);
    Ok(Startup {
        filters: Arc::new(filters),
        token,
        endpoint,
    })
}

pub fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_logging(&args.log)?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main(args))
}

async fn async_main(args: Args) -> Result<(), Box<dyn Error>> {
    let config_path = match args.config {
        Some(path) => path,
        None => default_config_path().ok_or("cannot determine the home directory")?,
    };
    let Startup {
        filters,
        token,
        endpoint,
    } = match load_startup(
        &config_path,
        args.token.as_deref(),
        std::env::var(ENDPOINT_ENV).ok(),
    ) {
        Ok(startup) => startup,
        Err(err) => {
            eprintln!("❌ {err}");
            std::process::exit(1);
        }
    };
    let whitelist = (!args.servers.is_empty()).then_some(args.servers);

    let registry = Arc::new(CommandRegistry::builtin()?);
    let directory = Directory::default();
    let (mut console, sink) = RustylineConsole::new("> ")?;
    {
        let registry = registry.clone();
        let directory = directory.clone();
        console.set_completer(Arc::new(move |text: &str| {
            complete(&registry, &directory.snapshot(), text)
        }));
    }

    let shared = Arc::new(SharedState {
        registry,
        filters: filters.clone(),
        session: Arc::new(SessionContext::new(whitelist)),
        console: sink.clone(),
        directory,
        close_timeout: CLOSE_TIMEOUT,
    });

    let log_route = route_to_console(sink);
    let input = spawn_input_reader(console)?;
    info!(endpoint = %endpoint, config = %config_path.display(), "starting");

    let result = supervise(RestartPolicy::default(), |attempt| {
        let shared = shared.clone();
        let input = input.clone();
        let token = token.clone();
        let client = RelayClient::new(endpoint.clone());
        async move {
            if attempt > 1 {
                info!(attempt, "reconnecting");
            }
            run_session(shared, client, &token, &input).await
        }
    })
    .await;
    drop(log_route);

    if let Err(err) = filters.save() {
        warn!("Failed to save filters on exit: {err}");
    }
    result.map_err(Into::into)
}
