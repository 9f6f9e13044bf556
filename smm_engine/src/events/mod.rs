//! Post-commit event hooks.
//!
//! Events are only published after the transaction that caused them has committed, so a handler never sees an effect
//! that was rolled back.
mod channel;
mod event_types;
mod hooks;

pub use channel::{EventHandler, EventProducer, Handler};
pub use event_types::*;
pub use hooks::{EventHandlers, EventHooks, EventProducers};
