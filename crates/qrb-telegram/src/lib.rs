//! Telegram adapter (teloxide).
//!
//! This crate wires Telegram updates to the `qrb-core` calculator and the
//! `CodeDecoder` port.

pub mod handlers;
pub mod router;
