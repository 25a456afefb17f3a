//! Per-account plugin facade and multiplexing factory for the five-bells
//! ledger.
//!
//! A [`Plugin`] adapts one ledger account to the generic transfer/message
//! interface and emits typed lifecycle events. A [`Factory`] shares a
//! single notification channel and admin credential across many plugins,
//! guaranteeing at most one plugin per username and routing each inbound
//! notification to the plugins whose accounts participate in it.

pub mod events;
pub mod factory;
pub mod plugin;

#[cfg(test)]
pub(crate) mod testutil;

pub use events::{EventRouter, Subscription};
pub use factory::{CreateOptions, Factory, FactoryConfig};
pub use plugin::{Plugin, PluginConfig};
