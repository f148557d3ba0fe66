//! Interactive command-line client for operators of a smeshing node.
//!
//! The commands in [`commands`] talk to the node through the
//! [`api_client::SmesherApi`] trait; [`api_client::Client`] implements it over
//! the node's HTTP/JSON gateway. [`repl`] wraps a command session in an
//! interactive prompt loop.

pub mod api_client;
pub mod commands;
pub mod config;
pub mod error;
pub mod interrupt;
pub mod repl;
pub mod terminal;
pub mod tracing;
pub mod types;
