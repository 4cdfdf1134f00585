//! chatmux is a line-oriented terminal client for multi-server chat services.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`chat`] is the seam to the chat service: the [`chat::ChatClient`]
//!   trait, the live server directory and the HTTP relay client.
//! - [`core`] owns the filter store, the message model, per-session values
//!   and the restart supervisor.
//! - [`commands`] implements the command registry, line dispatch and
//!   autocomplete.
//! - [`ui`] formats messages for the terminal, wraps the line editor and
//!   bridges the network runtime with the foreground pool.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`crate::cli::main`], which loads configuration and hands a
//! session factory to [`core::supervisor::supervise`].

pub mod chat;
pub mod cli;
pub mod commands;
pub mod core;
pub mod ui;
pub mod utils;
