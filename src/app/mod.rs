//! Application layer: port traits, operator commands, telemetry and the
//! simulation service that wires everything together.
//!
//! The control kernel talks to the outside world only through the
//! **port traits** in [`ports`], so every piece can be tested with mock
//! adapters.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
