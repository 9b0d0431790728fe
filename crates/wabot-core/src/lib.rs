//! # wabot-core
//!
//! Core types, traits, configuration, and error handling for the wabot
//! WhatsApp automation bot.

pub mod config;
pub mod error;
pub mod message;
pub mod state;
pub mod traits;
