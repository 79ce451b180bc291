//! Interrupt-style notifications between execution contexts.
//!
//! The plant and the operator raise events from their own threads; the
//! pump controller consumes them once per decision cycle.
//!
//! ```text
//! ┌──────────────┐  raise()          ┌─────────────┐  take()   ┌──────────────────┐
//! │ Plant update │──────────────────▶│  EdgeFlag   │──────────▶│                  │
//! │ (level edge) │                   └─────────────┘           │  Pump controller │
//! ├──────────────┤  request(on/off)  ┌───────────────┐  take() │  (consumer)      │
//! │ Operator     │──────────────────▶│ ManualRequest │────────▶│                  │
//! └──────────────┘                   └───────────────┘         └──────────────────┘
//! ```
//!
//! Both are single-consumer test-and-clear cells: consumption is an atomic
//! swap, so an event raised while the consumer is mid-cycle is either seen
//! by that cycle or left pending for the next one, never lost or seen twice.

use core::sync::atomic::{AtomicBool, AtomicU8, Ordering};

/// A set-once-until-consumed flag.
///
/// Repeated `raise()` calls before a `take()` collapse into one event.
#[derive(Debug, Default)]
pub struct EdgeFlag(AtomicBool);

impl EdgeFlag {
    pub const fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    /// Mark the edge as observed.
    pub fn raise(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Consume the edge.  Returns `true` exactly once per pending edge.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }

    pub fn is_pending(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// A pending operator pump command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PumpRequest {
    On = 1,
    Off = 2,
}

const NO_REQUEST: u8 = 0;

/// One-slot mailbox for operator pump commands.
///
/// A single cell holds either "on" or "off", so the two can never be
/// pending together; a newer request overwrites an unconsumed older one.
#[derive(Debug, Default)]
pub struct ManualRequest(AtomicU8);

impl ManualRequest {
    pub const fn new() -> Self {
        Self(AtomicU8::new(NO_REQUEST))
    }

    pub fn request(&self, on: bool) {
        let req = if on { PumpRequest::On } else { PumpRequest::Off };
        self.0.store(req as u8, Ordering::Release);
    }

    /// Consume the pending request, if any.
    pub fn take(&self) -> Option<PumpRequest> {
        match self.0.swap(NO_REQUEST, Ordering::AcqRel) {
            1 => Some(PumpRequest::On),
            2 => Some(PumpRequest::Off),
            _ => None,
        }
    }

    pub fn peek(&self) -> Option<PumpRequest> {
        match self.0.load(Ordering::Acquire) {
            1 => Some(PumpRequest::On),
            2 => Some(PumpRequest::Off),
            _ => None,
        }
    }
}
