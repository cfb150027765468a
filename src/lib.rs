//! Alert Relay: republish transit service alert emails as social threads.

pub mod alert;
pub mod config;
pub mod envelope;
pub mod error;
pub mod links;
pub mod reflow;
pub mod relay;
pub mod social;
pub mod thread;
