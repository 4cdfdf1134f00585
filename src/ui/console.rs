//! Terminal side of the client: a blocking line source, a thread-safe line
//! sink, and the rustyline-backed implementation of both.

use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};

use rustyline::completion::Completer;
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{CompletionType, Config, Context, Editor, ExternalPrinter, Helper};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::commands::Completion;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadError {
    Eof,
    Interrupted,
    Io(String),
}

/// Blocking source of operator lines.
pub trait LineSource: Send + 'static {
    fn read_line(&mut self) -> Result<String, ReadError>;
}

/// Where display lines go. Must be safe to call from any thread at any time,
/// including while a `read_line` is blocked.
pub trait ConsoleSink: Send + Sync + 'static {
    fn write_line(&self, line: &str);
}

pub type CompletionFn = Arc<dyn Fn(&str) -> Completion + Send + Sync>;

/// Plain stdout writer, serialized by a lock.
#[derive(Default)]
pub struct StdoutSink {
    lock: Mutex<()>,
}

impl ConsoleSink for StdoutSink {
    fn write_line(&self, line: &str) {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut stdout = io::stdout().lock();
        let _ = writeln!(stdout, "{line}");
        let _ = stdout.flush();
    }
}

/// Prints above the prompt of a running rustyline `readline`.
pub struct PrinterSink {
    printer: Mutex<Box<dyn ExternalPrinter + Send>>,
}

impl ConsoleSink for PrinterSink {
    fn write_line(&self, line: &str) {
        let mut printer = self.printer.lock().unwrap_or_else(PoisonError::into_inner);
        if printer.print(line.to_string()).is_err() {
            eprintln!("{line}");
        }
    }
}

pub struct CommandHelper {
    completer: Option<CompletionFn>,
}

impl Completer for CommandHelper {
    type Candidate = String;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<String>)> {
        let Some(completer) = &self.completer else {
            return Ok((pos, Vec::new()));
        };
        let typed = &line[..pos];
        let completion = completer(typed);
        // The prefix is always a leading slice of what was typed.
        let start = if typed.starts_with(&completion.prefix) {
            completion.prefix.len()
        } else {
            pos
        };
        Ok((start, completion.candidates))
    }
}

impl Hinter for CommandHelper {
    type Hint = String;
}

impl Highlighter for CommandHelper {}

impl Validator for CommandHelper {}

impl Helper for CommandHelper {}

/// Interactive line editor. Owns the terminal while reading.
pub struct RustylineConsole {
    editor: Editor<CommandHelper, DefaultHistory>,
    prompt: String,
}

impl RustylineConsole {
    /// Builds the editor and the sink that writes above its prompt.
    pub fn new(prompt: impl Into<String>) -> Result<(Self, Arc<dyn ConsoleSink>), ReadlineError> {
        let config = Config::builder()
            .completion_type(CompletionType::List)
            .auto_add_history(true)
            .build();
        let mut editor = Editor::with_config(config)?;
        editor.set_helper(Some(CommandHelper { completer: None }));

        let sink: Arc<dyn ConsoleSink> = match editor.create_external_printer() {
            Ok(printer) => Arc::new(PrinterSink {
                printer: Mutex::new(Box::new(printer)),
            }),
            Err(err) => {
                warn!("Falling back to plain stdout output: {err}");
                Arc::new(StdoutSink::default())
            }
        };

        Ok((
            Self {
                editor,
                prompt: prompt.into(),
            },
            sink,
        ))
    }

    /// Registers the single completion callback.
    pub fn set_completer(&mut self, completer: CompletionFn) {
        if let Some(helper) = self.editor.helper_mut() {
            helper.completer = Some(completer);
        }
    }
}

impl LineSource for RustylineConsole {
    fn read_line(&mut self) -> Result<String, ReadError> {
        match self.editor.readline(&self.prompt) {
            Ok(line) => Ok(line),
            Err(ReadlineError::Eof) => Err(ReadError::Eof),
            Err(ReadlineError::Interrupted) => Err(ReadError::Interrupted),
            Err(err) => Err(ReadError::Io(err.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    Line(String),
    Eof,
    Failed(String),
}

/// Lines read by the input thread, consumed by the dispatch loop.
///
/// Outlives individual sessions so a restarted client keeps reading from the
/// same terminal.
#[derive(Clone)]
pub struct InputLines {
    rx: Arc<tokio::sync::Mutex<mpsc::Receiver<InputEvent>>>,
}

impl InputLines {
    pub fn channel(capacity: usize) -> (mpsc::Sender<InputEvent>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (
            tx,
            Self {
                rx: Arc::new(tokio::sync::Mutex::new(rx)),
            },
        )
    }

    /// Next operator event. Cancel-safe. After the reader stops this keeps
    /// returning [`InputEvent::Eof`].
    pub async fn next(&self) -> InputEvent {
        self.rx.lock().await.recv().await.unwrap_or(InputEvent::Eof)
    }
}

/// Moves `source` onto its own thread and forwards what it reads.
///
/// Ctrl-C is treated like end of input.
pub fn spawn_input_reader<L: LineSource>(mut source: L) -> io::Result<InputLines> {
    let (tx, lines) = InputLines::channel(1);
    std::thread::Builder::new()
        .name("console-input".to_string())
        .spawn(move || loop {
            let event = match source.read_line() {
                Ok(line) => InputEvent::Line(line),
                Err(ReadError::Eof) | Err(ReadError::Interrupted) => InputEvent::Eof,
                Err(ReadError::Io(err)) => InputEvent::Failed(err),
            };
            let last = !matches!(event, InputEvent::Line(_));
            if tx.blocking_send(event).is_err() || last {
                debug!("input reader finished");
                break;
            }
        })?;
    Ok(lines)
}
