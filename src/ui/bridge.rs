//! Runs the network client and the foreground side by side.
//!
//! The chat client lives on a dedicated thread with a current-thread tokio
//! runtime. Everything else (the dispatch loop and one formatting task per
//! inbound message, run in arrival order) runs on the caller's multi-threaded
//! runtime. The two sides only talk through channels:
//!
//! - network → foreground: an unbounded message queue, so receiving never
//!   waits on formatting;
//! - foreground → network: [`Outbound`] requests, including the final close,
//!   which is acknowledged on a oneshot.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::chat::{ChatClient, ChatError, ChatEvent, ChatHandle, Directory, Outbound};
use crate::commands::{dispatch_line, CommandContext, CommandRegistry};
use crate::core::filters::FilterStore;
use crate::core::message::Message;
use crate::core::session::SessionContext;
use crate::core::supervisor::SessionError;
use crate::ui::console::{ConsoleSink, InputEvent, InputLines};
use crate::ui::format::format_message;

/// State that survives client restarts.
pub struct SharedState {
    pub registry: Arc<CommandRegistry>,
    pub filters: Arc<FilterStore>,
    pub session: Arc<SessionContext>,
    pub console: Arc<dyn ConsoleSink>,
    pub directory: Directory,
    pub close_timeout: Duration,
}

struct NetworkTask {
    done: oneshot::Receiver<Result<(), ChatError>>,
    thread: JoinHandle<()>,
}

async fn drive_network<C: ChatClient>(
    mut client: C,
    token: String,
    directory: Directory,
    messages: mpsc::UnboundedSender<Message>,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
) -> Result<(), ChatError> {
    client.connect(&token).await?;
    info!("connected to chat service");

    loop {
        tokio::select! {
            request = outbound.recv() => match request {
                Some(Outbound::Send { server, channel, content }) => {
                    if let Err(err) = client.send(&server, &channel, &content).await {
                        warn!("Failed to send to {server}/{channel}: {err}");
                    }
                }
                Some(Outbound::Close { ack }) => {
                    let result = client.close().await;
                    let _ = ack.send(result);
                    return Ok(());
                }
                None => return client.close().await,
            },
            event = client.next_event() => match event? {
                Some(ChatEvent::Ready(servers)) => {
                    debug!(servers = servers.len(), "membership snapshot");
                    directory.replace(servers);
                }
                Some(ChatEvent::ServerUpdate(server)) => directory.upsert(server),
                Some(ChatEvent::ServerRemoved(name)) => directory.remove(&name),
                Some(ChatEvent::Message(message)) => {
                    if messages.send(message).is_err() {
                        debug!("foreground gone, dropping message");
                    }
                }
                None => return Err(ChatError::Closed),
            },
        }
    }
}

fn spawn_network<C: ChatClient + 'static>(
    client: C,
    token: String,
    directory: Directory,
    messages: mpsc::UnboundedSender<Message>,
    outbound: mpsc::UnboundedReceiver<Outbound>,
) -> Result<NetworkTask, SessionError> {
    let (done_tx, done) = oneshot::channel();
    let thread = std::thread::Builder::new()
        .name("chat-network".to_string())
        .spawn(move || {
            let result = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => {
                    runtime.block_on(drive_network(client, token, directory, messages, outbound))
                }
                Err(err) => Err(ChatError::Transport(format!(
                    "failed to start network runtime: {err}"
                ))),
            };
            let _ = done_tx.send(result);
        })
        .map_err(SessionError::Runtime)?;
    Ok(NetworkTask { done, thread })
}

fn deliver_message(
    message: Message,
    filters: Arc<FilterStore>,
    session: Arc<SessionContext>,
    console: Arc<dyn ConsoleSink>,
) {
    let line = filters.read(|data| format_message(&message, data, &session));
    match line {
        Some(line) => console.write_line(&line),
        None => debug!(origin = %message.origin.label(), "suppressed message"),
    }
}

/// Runs one task per message, each awaited before the next starts, so lines
/// appear in arrival order and a panic only loses its own message.
async fn pump_messages(mut messages: mpsc::UnboundedReceiver<Message>, shared: Arc<SharedState>) {
    while let Some(message) = messages.recv().await {
        let filters = shared.filters.clone();
        let session = shared.session.clone();
        let console = shared.console.clone();
        let delivery =
            tokio::spawn(async move { deliver_message(message, filters, session, console) });
        if let Err(err) = delivery.await {
            error!("Failed to display message: {err}");
        }
    }
}

async fn input_loop(input: &InputLines, ctx: &CommandContext) -> Result<(), SessionError> {
    loop {
        match input.next().await {
            InputEvent::Line(line) => {
                debug!(line = %line, "read input");
                dispatch_line(ctx, &line);
            }
            InputEvent::Eof => {
                info!("Got end of input");
                return Ok(());
            }
            InputEvent::Failed(err) => return Err(SessionError::Input(err)),
        }
    }
}

enum Ending {
    Input(Result<(), SessionError>),
    Network(Result<(), ChatError>),
}

/// One client lifetime: connect, stream and dispatch until the operator
/// quits or the network side fails.
///
/// `Ok(())` means the operator ended input and the connection was closed.
pub async fn run_session<C: ChatClient + 'static>(
    shared: Arc<SharedState>,
    client: C,
    token: &str,
    input: &InputLines,
) -> Result<(), SessionError> {
    shared.directory.replace(Vec::new());

    let (message_tx, message_rx) = mpsc::unbounded_channel();
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let mut network = spawn_network(
        client,
        token.to_string(),
        shared.directory.clone(),
        message_tx,
        outbound_rx,
    )?;
    let pump = tokio::spawn(pump_messages(message_rx, shared.clone()));

    let chat = ChatHandle::new(outbound_tx);
    let ctx = CommandContext {
        registry: shared.registry.clone(),
        directory: shared.directory.clone(),
        filters: shared.filters.clone(),
        console: shared.console.clone(),
        chat: chat.clone(),
    };

    let ending = tokio::select! {
        result = input_loop(input, &ctx) => Ending::Input(result),
        result = &mut network.done => Ending::Network(
            result.unwrap_or(Err(ChatError::Transport("network thread exited".to_string())))
        ),
    };
    drop(ctx);

    let (result, network_finished) = match ending {
        Ending::Input(result) => {
            if let Err(err) = &result {
                error!("Input loop failed: {err}");
            }
            info!("Closing connection");
            let deadline = Instant::now() + shared.close_timeout;
            if let Err(err) = chat.close(shared.close_timeout).await {
                warn!("Connection did not close cleanly: {err}");
            }
            let finished = match tokio::time::timeout_at(deadline, &mut network.done).await {
                Ok(Ok(Err(err))) => {
                    warn!("Network side ended with an error: {err}");
                    true
                }
                Ok(_) => true,
                Err(_) => {
                    warn!("Network side still running after {:?}", shared.close_timeout);
                    false
                }
            };
            (result, finished)
        }
        Ending::Network(Ok(())) | Ending::Network(Err(ChatError::Closed)) => {
            (Err(SessionError::Disconnected), true)
        }
        Ending::Network(Err(err)) => (Err(SessionError::Chat(err)), true),
    };
    drop(chat);

    if network_finished {
        let thread = network.thread;
        if tokio::task::spawn_blocking(move || thread.join()).await.is_err() {
            warn!("Could not join the network thread");
        }
        if let Err(err) = pump.await {
            error!("Message pump failed: {err}");
        }
    } else {
        // Leave the stuck thread behind; its queue closes with it.
        pump.abort();
    }
    result
}
