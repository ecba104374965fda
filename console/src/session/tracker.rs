use crate::clock::Clock;
use crate::session::state::{DEFAULT_WARNING_WINDOW, SessionState, parse_timeout_hint};
use axum::http::HeaderMap;
use metrics::counter;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Session tracker: owns the expiration instant derived from server hints
/// and the single warning timer.
///
/// State is published through a `watch` channel; the idle alert only reads it.
/// Hint handling spawns the warning timer on the current tokio runtime.
pub struct SessionTracker {
    clock: Arc<dyn Clock>,
    warning_window: Duration,
    state: Arc<watch::Sender<SessionState>>,
    /// The one live warning timer, if any
    warning_timer: Mutex<Option<JoinHandle<()>>>,
}

impl SessionTracker {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_warning_window(clock, DEFAULT_WARNING_WINDOW)
    }

    pub fn with_warning_window(clock: Arc<dyn Clock>, warning_window: Duration) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self {
            clock,
            warning_window,
            state: Arc::new(state),
            warning_timer: Mutex::new(None),
        }
    }

    /// Subscribe to state changes
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Current state snapshot.
    ///
    /// The published state keeps `is_warning` set until the logout handler
    /// resets the tracker; the snapshot reports it cleared once the
    /// expiration has passed.
    pub fn snapshot(&self) -> SessionState {
        let mut state = self.state.borrow().clone();
        if state
            .expiration
            .is_some_and(|expiration| expiration < self.clock.now())
        {
            state.is_warning = false;
        }
        state
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    /// Inspect response headers for a session-timeout hint.
    ///
    /// Returns true if a hint was found and applied. Responses without a hint
    /// leave the state untouched.
    pub fn observe_headers(&self, headers: &HeaderMap) -> bool {
        match parse_timeout_hint(headers) {
            Some(secs) => {
                self.observe_hint(secs);
                true
            }
            None => false,
        }
    }

    /// Resynchronize the expiration from a hint of `secs` seconds remaining.
    ///
    /// Cancels the pending warning timer and arms a new one at
    /// `now + secs - warning_window`. Hints inside the window enter the
    /// warning state immediately.
    pub fn observe_hint(&self, secs: u64) {
        counter!("console_session_hints_total").increment(1);

        let now = self.clock.now();
        let remaining = Duration::from_secs(secs);
        let fire_in = remaining.saturating_sub(self.warning_window);
        let Some(expiration) = now.checked_add(remaining) else {
            warn!("Ignoring out-of-range session hint: {}s", secs);
            return;
        };

        let mut timer = self.lock_timer();
        if let Some(previous) = timer.take() {
            previous.abort();
        }

        let mut generation = 0;
        self.state.send_modify(|state| {
            state.generation += 1;
            state.expiration = Some(expiration);
            state.is_warning = false;
            generation = state.generation;
        });
        debug!(
            "Session hint {}s (generation {}), warning in {:?}",
            secs, generation, fire_in
        );

        if fire_in.is_zero() {
            enter_warning(&self.state, generation);
            return;
        }

        // Same origin as the expiration; fire_in <= remaining, so this cannot overflow
        let deadline = now + fire_in;
        let state = Arc::clone(&self.state);
        *timer = Some(tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            enter_warning(&state, generation);
        }));
    }

    /// Discard the session: clears expiration and warning, cancels the timer
    pub fn reset(&self) {
        self.cancel_timer();
        self.state.send_modify(|state| {
            state.generation += 1;
            state.expiration = None;
            state.is_warning = false;
        });
        debug!("Session state reset");
    }

    /// Tear down: any timer still in flight becomes a no-op
    pub fn shutdown(&self) {
        self.reset();
    }

    /// Whether a warning timer is currently armed
    pub fn has_pending_timer(&self) -> bool {
        self.lock_timer()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    fn cancel_timer(&self) {
        if let Some(handle) = self.lock_timer().take() {
            handle.abort();
        }
    }

    fn lock_timer(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.warning_timer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for SessionTracker {
    fn drop(&mut self) {
        self.cancel_timer();
    }
}

/// Flip into the warning state if `generation` is still the current hint
fn enter_warning(state: &watch::Sender<SessionState>, generation: u64) {
    let entered = state.send_if_modified(|state| {
        if state.generation != generation || state.is_warning || state.expiration.is_none() {
            return false;
        }
        state.is_warning = true;
        true
    });

    if entered {
        counter!("console_idle_warnings_total").increment(1);
        info!("Session entered idle warning window (generation {})", generation);
    }
}
