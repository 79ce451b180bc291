//! Adapters: concrete implementations of the port traits.
//!
//! | Adapter    | Implements      | Connects to               |
//! |------------|-----------------|---------------------------|
//! | `plant`    | Plant           | deterministic sump model  |
//! | `log_sink` | DashboardSink   | `log` facade (stderr)     |
//! | `time`     | TimeSource      | `Instant` / manual clock  |

pub mod log_sink;
pub mod plant;
pub mod time;
