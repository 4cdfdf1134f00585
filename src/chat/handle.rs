use crate::chat::ChatError;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// Requests marshalled from the foreground onto the network runtime.
#[derive(Debug)]
pub enum Outbound {
    Send {
        server: String,
        channel: String,
        content: String,
    },
    Close {
        ack: oneshot::Sender<Result<(), ChatError>>,
    },
}

/// Foreground handle to the network driver. Cheap to clone.
#[derive(Clone)]
pub struct ChatHandle {
    tx: mpsc::UnboundedSender<Outbound>,
}

impl ChatHandle {
    pub fn new(tx: mpsc::UnboundedSender<Outbound>) -> Self {
        Self { tx }
    }

    /// Queues a message for sending. Never blocks.
    pub fn send_message(&self, server: &str, channel: &str, content: &str) -> Result<(), ChatError> {
        self.tx
            .send(Outbound::Send {
                server: server.to_string(),
                channel: channel.to_string(),
                content: content.to_string(),
            })
            .map_err(|_| ChatError::Closed)
    }

    /// Asks the network side to close the connection and waits for it to
    /// confirm, at most `timeout`.
    pub async fn close(&self, timeout: Duration) -> Result<(), ChatError> {
        let (ack, acked) = oneshot::channel();
        if self.tx.send(Outbound::Close { ack }).is_err() {
            // Driver already gone; nothing left to close.
            return Ok(());
        }
        match tokio::time::timeout(timeout, acked).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Ok(()),
            Err(_) => Err(ChatError::TimedOut(timeout)),
        }
    }
}
