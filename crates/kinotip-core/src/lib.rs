//! Core domain + application logic for kinotip.
//!
//! This crate is framework-agnostic. The MTProto channel reader, the feed HTTP
//! server and the Telegram bot live in adapter crates and talk to the core
//! through the ports in [`ports`].

pub mod collector;
pub mod config;
pub mod domain;
pub mod errors;
pub mod feed_cache;
pub mod feed_client;
pub mod logging;
pub mod payload;
pub mod ports;
pub mod query;
pub mod scheduler;
pub mod stats;
pub mod store;

pub use errors::{Error, Result};
