//! Core bootstrap logic for the Jira chat bot.
//!
//! This crate is intentionally framework-agnostic. The health-check listener and
//! the bot's main behavior live behind ports (traits) implemented in adapter crates.

pub mod bootstrap;
pub mod config;
pub mod context;
pub mod errors;
pub mod logging;
pub mod ports;

pub use errors::{Error, Result};
