//! Common Test Utilities for Integration Tests
//!
//! Starts a stub controller on an ephemeral port and wires the console
//! session components against it over real HTTP.

use console_session::clock::{Clock, TokioClock};
use console_session::session::{
    AlertEvent, IdleAlert, IdleAlertHandle, SessionContext, SessionTracker, View,
};
use console_session::stub::{self, StubState};
use console_session::HttpConsoleApi;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

/// Countdown period used by the integration tests
pub const TEST_TICK: Duration = Duration::from_millis(100);

/// Generous upper bound when waiting on events
pub const WAIT: Duration = Duration::from_secs(10);

/// Start a stub controller advertising `session_timeout` seconds
pub async fn spawn_controller(session_timeout: u64) -> (String, StubState) {
    let state = StubState::new(session_timeout);
    let (addr, _handle) = stub::serve("127.0.0.1:0".parse().unwrap(), state.clone())
        .await
        .expect("Failed to start stub controller");
    (format!("http://{}", addr), state)
}

/// Console components wired against a controller
pub struct TestConsole {
    pub tracker: Arc<SessionTracker>,
    pub context: Arc<SessionContext>,
    pub alert: IdleAlertHandle,
    pub events: mpsc::Receiver<AlertEvent>,
}

impl TestConsole {
    pub fn new(base_url: &str) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(TokioClock);
        let tracker = Arc::new(SessionTracker::new(clock.clone()));
        let api = Arc::new(
            HttpConsoleApi::new(base_url, None, Duration::from_secs(5), tracker.clone())
                .expect("Failed to build API client"),
        );
        let context = Arc::new(SessionContext::new(api, tracker.clone()));

        let (events_tx, events) = mpsc::channel(256);
        let alert = IdleAlert::new(clock, context.clone(), events_tx)
            .with_tick(TEST_TICK)
            .spawn(tracker.subscribe());

        Self {
            tracker,
            context,
            alert,
            events,
        }
    }

    /// Wait for the next alert event
    pub async fn next_event(&mut self) -> AlertEvent {
        tokio::time::timeout(WAIT, self.events.recv())
            .await
            .expect("Timed out waiting for alert event")
            .expect("Alert event channel closed")
    }

    /// Wait until the context reaches `target`
    pub async fn wait_for_view(&self, target: View) {
        let mut view: watch::Receiver<View> = self.context.view();
        tokio::time::timeout(WAIT, view.wait_for(|v| *v == target))
            .await
            .expect("Timed out waiting for view")
            .expect("View channel closed");
    }
}
