//! Foundation types for the five-bells ledger plugin.
//!
//! This crate provides the generic (ledger-agnostic) data model, the address
//! codec, the typed plugin events, and the closed error taxonomy used
//! throughout the plugin layer. Every other `bells-*` crate depends on it.
//!
//! # Key Types
//!
//! - [`Transfer`] / [`Direction`] — generic transfer model
//! - [`Message`] — generic message model
//! - [`PluginEvent`] / [`EventName`] — domain events emitted to applications
//! - [`PluginError`] / [`ErrorKind`] — the closed error taxonomy

pub mod address;
pub mod error;
pub mod event;
pub mod message;
pub mod transfer;

pub use error::{ErrorKind, PluginError, PluginResult};
pub use event::{EventName, PluginEvent};
pub use message::Message;
pub use transfer::{Direction, Transfer};
