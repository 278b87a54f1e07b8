//! Core domain + application logic for the QR decoder bot.
//!
//! This crate is intentionally framework-agnostic. Telegram and the actual
//! image decoding library live behind adapter crates; the calculator and the
//! routing heuristics here are pure functions.

pub mod calc;
pub mod config;
pub mod domain;
pub mod errors;
pub mod formatting;
pub mod logging;
pub mod ports;
pub mod security;
pub mod utils;

pub use errors::{Error, Result};
