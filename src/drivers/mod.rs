//! Actuator drivers and thread spawning helpers.

pub mod pump;
pub mod spawn;
