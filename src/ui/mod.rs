//! Terminal side of the client.
//!
//! - [`format`]: filter decision and colored rendering of received messages.
//! - [`console`]: the line source and sink traits plus their rustyline
//!   implementation.
//! - [`bridge`]: runs one client session, connecting the network thread to
//!   the dispatch loop and the message pump.
//!
//! Ownership boundary: this layer presents and captures interaction state,
//! while [`crate::core`] owns filters and restart policy.

pub mod bridge;
pub mod console;
pub mod format;
