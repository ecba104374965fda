//! Console session library
//!
//! Tracks the server session's expiry from response hints and drives the
//! idle-session alert. Exported for the CLI and integration tests.

pub mod api;
pub mod clock;
pub mod config;
pub mod session;
pub mod stub;

#[cfg(test)]
mod test_utils;

// Re-export commonly used types
pub use api::{ApiError, ConsoleApi, HttpConsoleApi};
pub use clock::{Clock, ManualClock, TokioClock};
pub use session::{
    AlertEvent, IdleAlert, IdleAlertHandle, IdleAlertHandler, SessionContext, SessionState,
    SessionTracker, View,
};
