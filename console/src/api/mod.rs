//! Controller API access
//!
//! This module provides:
//! - `ConsoleApi` trait for the config, identity and logout operations
//! - `HttpConsoleApi`, a reqwest client that feeds every response's
//!   session-timeout hint to the `SessionTracker`
//! - Wire types and `ApiError`

mod client;
mod service;
mod types;

pub use client::{CONFIG_PATH, HttpConsoleApi, LOGOUT_PATH, ME_PATH};
pub use service::ConsoleApi;
pub use types::{ApiError, ConsoleConfig, MeResponse, ServerConfig, User};
