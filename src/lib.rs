//! MineWatch control kernel library.
//!
//! Exposes the scheduler, simulated ADC, control system and pump
//! subsystem for the binary and for integration testing.  Collaborators
//! (plant, dashboard, clock) are reached through the traits in
//! [`app::ports`].

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod control;
pub mod diagnostics;
pub mod drivers;
pub mod error;
pub mod events;
pub mod safety;
pub mod scheduler;
pub mod sensors;
