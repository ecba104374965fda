//! Test Utilities Module
//!
//! Fakes and helpers shared by the unit tests. Only compiled for tests.

#![cfg(test)]

use crate::api::{ApiError, ConsoleApi, ServerConfig, User};
use crate::session::alert::{AlertEvent, IdleAlertHandler};
use crate::session::tracker::SessionTracker;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

// ============================================================================
// Scheduling helpers
// ============================================================================

/// Let woken tasks run after a paused-clock advance
pub async fn settle() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}

/// Collect every alert event currently queued
pub fn drain_events(events: &mut mpsc::Receiver<AlertEvent>) -> Vec<AlertEvent> {
    let mut drained = Vec::new();
    while let Ok(event) = events.try_recv() {
        drained.push(event);
    }
    drained
}

// ============================================================================
// Fixtures
// ============================================================================

pub fn test_server_config() -> ServerConfig {
    let mut extra = Map::new();
    extra.insert("time_zone".to_string(), Value::from("UTC"));
    ServerConfig {
        version: Some("4.0.0".to_string()),
        ansible_version: Some("2.9.10".to_string()),
        extra,
    }
}

pub fn test_user() -> User {
    User {
        id: 1,
        username: "admin".to_string(),
        first_name: "Ada".to_string(),
        last_name: "Admin".to_string(),
        is_superuser: true,
        is_system_auditor: false,
    }
}

// ============================================================================
// Recording alert handler
// ============================================================================

/// Counts callback invocations
#[derive(Default)]
pub struct RecordingHandler {
    logouts: AtomicUsize,
    continues: AtomicUsize,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn logouts(&self) -> usize {
        self.logouts.load(Ordering::SeqCst)
    }

    pub fn continues(&self) -> usize {
        self.continues.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdleAlertHandler for RecordingHandler {
    async fn on_logout(&self) {
        self.logouts.fetch_add(1, Ordering::SeqCst);
    }

    async fn on_continue(&self) {
        self.continues.fetch_add(1, Ordering::SeqCst);
    }
}

// ============================================================================
// Fake API
// ============================================================================

/// Scripted outcome of a fake API call
#[derive(Debug, Clone, Copy)]
pub enum FakeResponse {
    Ok,
    Status(u16),
}

impl FakeResponse {
    fn into_result(self) -> Result<(), ApiError> {
        match self {
            FakeResponse::Ok => Ok(()),
            FakeResponse::Status(status) => Err(ApiError::Status {
                status,
                message: format!("fake status {}", status),
            }),
        }
    }
}

struct FakeScript {
    config: FakeResponse,
    me: FakeResponse,
    logout: FakeResponse,
    server_config: ServerConfig,
}

/// In-memory ConsoleApi. Successful calls can stamp a session hint on the
/// tracker, standing in for the HTTP response interceptor.
pub struct FakeApi {
    script: Mutex<FakeScript>,
    session_hint: Option<(Arc<SessionTracker>, u64)>,
    config_reads: AtomicUsize,
    me_reads: AtomicUsize,
    logouts: AtomicUsize,
}

impl FakeApi {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(FakeScript {
                config: FakeResponse::Ok,
                me: FakeResponse::Ok,
                logout: FakeResponse::Ok,
                server_config: test_server_config(),
            }),
            session_hint: None,
            config_reads: AtomicUsize::new(0),
            me_reads: AtomicUsize::new(0),
            logouts: AtomicUsize::new(0),
        }
    }

    pub fn with_config(self, response: FakeResponse) -> Self {
        self.script.lock().unwrap().config = response;
        self
    }

    pub fn with_me(self, response: FakeResponse) -> Self {
        self.script.lock().unwrap().me = response;
        self
    }

    pub fn with_logout(self, response: FakeResponse) -> Self {
        self.script.lock().unwrap().logout = response;
        self
    }

    pub fn with_server_config(self, config: ServerConfig) -> Self {
        self.script.lock().unwrap().server_config = config;
        self
    }

    pub fn with_session_hint(mut self, tracker: Arc<SessionTracker>, secs: u64) -> Self {
        self.session_hint = Some((tracker, secs));
        self
    }

    pub fn set_me(&self, response: FakeResponse) {
        self.script.lock().unwrap().me = response;
    }

    pub fn config_reads(&self) -> usize {
        self.config_reads.load(Ordering::SeqCst)
    }

    pub fn me_reads(&self) -> usize {
        self.me_reads.load(Ordering::SeqCst)
    }

    pub fn logouts(&self) -> usize {
        self.logouts.load(Ordering::SeqCst)
    }

    fn stamp_hint(&self) {
        if let Some((ref tracker, secs)) = self.session_hint {
            tracker.observe_hint(secs);
        }
    }
}

#[async_trait]
impl ConsoleApi for FakeApi {
    async fn read_config(&self) -> Result<ServerConfig, ApiError> {
        self.config_reads.fetch_add(1, Ordering::SeqCst);
        let (response, config) = {
            let script = self.script.lock().unwrap();
            (script.config, script.server_config.clone())
        };
        response.into_result()?;
        self.stamp_hint();
        Ok(config)
    }

    async fn read_me(&self) -> Result<User, ApiError> {
        self.me_reads.fetch_add(1, Ordering::SeqCst);
        let response = self.script.lock().unwrap().me;
        response.into_result()?;
        self.stamp_hint();
        Ok(test_user())
    }

    async fn logout(&self) -> Result<(), ApiError> {
        self.logouts.fetch_add(1, Ordering::SeqCst);
        let response = self.script.lock().unwrap().logout;
        response.into_result()
    }
}
