//! Stub controller for local development and tests
//!
//! Serves the config, identity and logout endpoints and stamps the
//! session-timeout header on authenticated responses.

pub mod routes;

pub use routes::{StubState, serve, stub_routes};
