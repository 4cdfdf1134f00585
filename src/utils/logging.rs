//! tracing setup.
//!
//! Log events are buffered per event and emitted as whole lines. While a
//! console session is active they are routed through its sink so they land
//! above the prompt instead of through the middle of it.

use std::io::{self, Write};
use std::sync::{Arc, PoisonError, RwLock};

use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

use crate::ui::console::ConsoleSink;

static CONSOLE_ROUTE: RwLock<Option<Arc<dyn ConsoleSink>>> = RwLock::new(None);

/// Installs the global subscriber. `RUST_LOG`, when set, wins over `level`.
pub fn init_logging(level: &str) -> Result<(), Box<dyn std::error::Error>> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level)?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(LineMakeWriter)
        .with_ansi(false)
        .compact()
        .try_init()
        .map_err(|err| -> Box<dyn std::error::Error> { err })?;
    Ok(())
}

/// Routes log lines to `sink` until the guard is dropped.
#[must_use = "logs go back to stderr as soon as the guard is dropped"]
pub fn route_to_console(sink: Arc<dyn ConsoleSink>) -> ConsoleRouteGuard {
    *CONSOLE_ROUTE.write().unwrap_or_else(PoisonError::into_inner) = Some(sink);
    ConsoleRouteGuard { _private: () }
}

pub struct ConsoleRouteGuard {
    _private: (),
}

impl Drop for ConsoleRouteGuard {
    fn drop(&mut self) {
        CONSOLE_ROUTE
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}

struct LineMakeWriter;

impl<'a> MakeWriter<'a> for LineMakeWriter {
    type Writer = LineWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LineWriter { buffer: Vec::new() }
    }
}

/// Collects one formatted event and hands it off on drop.
pub struct LineWriter {
    buffer: Vec<u8>,
}

impl Write for LineWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for LineWriter {
    fn drop(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        let text = String::from_utf8_lossy(&self.buffer);
        let text = text.trim_end_matches('\n');

        let route = CONSOLE_ROUTE
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match route {
            Some(sink) => sink.write_line(text),
            None => {
                let _ = writeln!(io::stderr().lock(), "{text}");
            }
        }
    }
}
