//! Restart loop around a whole client session.
//!
//! Startup (loading the filter file, resolving the token) reports through the
//! same [`SessionError`], so configuration failures are classified alike.

use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures_util::FutureExt;
use tracing::{error, info};

use crate::chat::ChatError;
use crate::commands::panic_message;
use crate::core::filters::FilterStoreError;

#[derive(Debug)]
pub enum SessionError {
    /// No token on the command line or in the filter file.
    MissingCredential,
    Filters(FilterStoreError),
    Chat(ChatError),
    /// The service ended the event stream.
    Disconnected,
    /// The terminal could not be read.
    Input(String),
    Runtime(std::io::Error),
    Panicked(String),
}

impl SessionError {
    /// Configuration-class failures are not worth retrying unattended.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            SessionError::MissingCredential
                | SessionError::Filters(_)
                | SessionError::Input(_)
                | SessionError::Chat(ChatError::Unauthorized)
        )
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::MissingCredential => write!(
                f,
                "no token given: pass --token or set \"token\" in the filter file"
            ),
            SessionError::Filters(err) => write!(f, "{err}"),
            SessionError::Chat(err) => write!(f, "{err}"),
            SessionError::Disconnected => write!(f, "the chat service closed the connection"),
            SessionError::Input(err) => write!(f, "cannot read input: {err}"),
            SessionError::Runtime(err) => write!(f, "cannot start the network runtime: {err}"),
            SessionError::Panicked(message) => write!(f, "client panicked: {message}"),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::Filters(err) => Some(err),
            SessionError::Chat(err) => Some(err),
            SessionError::Runtime(err) => Some(err),
            _ => None,
        }
    }
}

impl From<FilterStoreError> for SessionError {
    fn from(err: FilterStoreError) -> Self {
        SessionError::Filters(err)
    }
}

impl From<ChatError> for SessionError {
    fn from(err: ChatError) -> Self {
        SessionError::Chat(err)
    }
}

/// How the supervisor reacts to a failed session.
///
/// Only `Always` exists today: retry every retryable failure after a fixed
/// delay, without limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartPolicy {
    Always { delay: Duration },
}

impl Default for RestartPolicy {
    fn default() -> Self {
        RestartPolicy::Always {
            delay: Duration::from_secs(5),
        }
    }
}

impl RestartPolicy {
    /// Delay before attempt `attempt + 1`, or `None` to give up.
    pub fn next_delay(&self, _attempt: u32) -> Option<Duration> {
        match self {
            RestartPolicy::Always { delay } => Some(*delay),
        }
    }
}

/// Runs `session` until it ends cleanly or fails in a way that must not be
/// retried. Panics count as retryable failures.
pub async fn supervise<F, Fut>(policy: RestartPolicy, mut session: F) -> Result<(), SessionError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<(), SessionError>>,
{
    let mut attempt = 0u32;
    loop {
        attempt = attempt.saturating_add(1);
        let result = match AssertUnwindSafe(session(attempt)).catch_unwind().await {
            Ok(result) => result,
            Err(payload) => Err(SessionError::Panicked(panic_message(payload.as_ref()))),
        };

        let err = match result {
            Ok(()) => {
                info!(attempt, "client session finished");
                return Ok(());
            }
            Err(err) if !err.is_retryable() => return Err(err),
            Err(err) => err,
        };

        let Some(delay) = policy.next_delay(attempt) else {
            return Err(err);
        };
        error!(attempt, "Client failed, restarting in {:?}: {}", delay, err);
        tokio::time::sleep(delay).await;
    }
}
