pub mod alert;
pub mod context;
pub mod state;
pub mod tracker;

pub use alert::{AlertEvent, IdleAlert, IdleAlertHandle, IdleAlertHandler};
pub use context::{AboutInfo, Notification, SessionContext, View};
pub use state::{DEFAULT_WARNING_WINDOW, SESSION_TIMEOUT_HEADER, SessionState, parse_timeout_hint};
pub use tracker::SessionTracker;
