//! Idle session alert
//!
//! Consumes the tracker's state and drives the countdown shown to the user
//! during the warning window. The countdown ticker only exists while the
//! warning is open, and is dropped on continue, logout, a fresh hint, or
//! when the alert is torn down.

use crate::clock::Clock;
use crate::session::state::SessionState;
use async_trait::async_trait;
use metrics::counter;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

/// Default recomputation period
pub const DEFAULT_TICK: Duration = Duration::from_secs(1);

/// Render triggers for the host UI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertEvent {
    /// Open or refresh the prompt with the seconds left
    Show { remaining: i64 },
    /// Close the prompt
    Hide { remaining: i64 },
}

/// Callbacks invoked by the alert
#[async_trait]
pub trait IdleAlertHandler: Send + Sync {
    /// The session ran out, or the user closed the prompt
    async fn on_logout(&self);

    /// The user chose to keep the session; implementations refresh it
    async fn on_continue(&self);
}

#[derive(Debug, Clone, Copy)]
enum AlertAction {
    Continue,
    Dismiss,
}

/// How a countdown ended
enum CountdownExit {
    /// Closed by logout or user action; stays closed for this generation
    Closed { generation: u64 },
    /// The tracker published a state that ends the warning
    StateChanged,
    /// Tracker or handle is gone
    Teardown,
}

/// Idle alert builder
pub struct IdleAlert {
    clock: Arc<dyn Clock>,
    tick: Duration,
    handler: Arc<dyn IdleAlertHandler>,
    events: mpsc::Sender<AlertEvent>,
}

impl IdleAlert {
    pub fn new(
        clock: Arc<dyn Clock>,
        handler: Arc<dyn IdleAlertHandler>,
        events: mpsc::Sender<AlertEvent>,
    ) -> Self {
        Self {
            clock,
            tick: DEFAULT_TICK,
            handler,
            events,
        }
    }

    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Start following `state` on the current runtime
    pub fn spawn(self, state: watch::Receiver<SessionState>) -> IdleAlertHandle {
        let (actions_tx, actions_rx) = mpsc::channel(8);
        let task = AlertTask {
            clock: self.clock,
            tick: self.tick,
            handler: self.handler,
            events: self.events,
            state,
            actions: actions_rx,
            closed_generation: None,
        };

        IdleAlertHandle {
            actions: actions_tx,
            task: tokio::spawn(task.run()),
        }
    }
}

/// Owner of a running alert. Dropping it tears the alert down.
pub struct IdleAlertHandle {
    actions: mpsc::Sender<AlertAction>,
    task: JoinHandle<()>,
}

impl IdleAlertHandle {
    /// User pressed "Continue"
    pub async fn continue_session(&self) {
        if self.actions.send(AlertAction::Continue).await.is_err() {
            debug!("Idle alert already stopped; continue ignored");
        }
    }

    /// User closed the prompt, which logs out
    pub async fn dismiss(&self) {
        if self.actions.send(AlertAction::Dismiss).await.is_err() {
            debug!("Idle alert already stopped; dismiss ignored");
        }
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    pub fn shutdown(&self) {
        self.task.abort();
    }
}

impl Drop for IdleAlertHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

struct AlertTask {
    clock: Arc<dyn Clock>,
    tick: Duration,
    handler: Arc<dyn IdleAlertHandler>,
    events: mpsc::Sender<AlertEvent>,
    state: watch::Receiver<SessionState>,
    actions: mpsc::Receiver<AlertAction>,
    /// Generation whose warning was closed (logout or continue)
    closed_generation: Option<u64>,
}

impl AlertTask {
    async fn run(mut self) {
        loop {
            let state = self.state.borrow_and_update().clone();
            if self.is_open(&state) {
                match self.countdown(state).await {
                    CountdownExit::Closed { generation } => {
                        self.closed_generation = Some(generation);
                        continue;
                    }
                    CountdownExit::StateChanged => continue,
                    CountdownExit::Teardown => return,
                }
            }

            tokio::select! {
                changed = self.state.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
                action = self.actions.recv() => match action {
                    Some(action) => debug!("No idle warning open; ignoring {:?}", action),
                    None => return,
                },
            }
        }
    }

    fn is_open(&self, state: &SessionState) -> bool {
        state.is_warning
            && state.expiration.is_some()
            && self.closed_generation != Some(state.generation)
    }

    /// Count down `state`. A fresh hint that is still inside the warning
    /// window replaces it without closing the prompt.
    async fn countdown(&mut self, mut state: SessionState) -> CountdownExit {
        let mut remaining = match state.remaining_secs(self.clock.now()) {
            Some(remaining) => remaining,
            None => return CountdownExit::StateChanged,
        };
        if remaining <= 0 {
            self.expire(remaining).await;
            return CountdownExit::Closed {
                generation: state.generation,
            };
        }
        self.emit(AlertEvent::Show { remaining });

        let mut ticker = tokio::time::interval_at(Instant::now() + self.tick, self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                changed = self.state.changed() => {
                    if changed.is_err() {
                        self.emit(AlertEvent::Hide { remaining });
                        return CountdownExit::Teardown;
                    }
                    let next = self.state.borrow_and_update().clone();
                    if !self.is_open(&next) {
                        self.emit(AlertEvent::Hide { remaining });
                        return CountdownExit::StateChanged;
                    }
                    if next.generation != state.generation {
                        debug!("Fresh hint inside warning window (generation {})", next.generation);
                    }
                    state = next;
                }
                action = self.actions.recv() => {
                    self.emit(AlertEvent::Hide { remaining });
                    return match action {
                        Some(AlertAction::Continue) => {
                            info!("Continuing session with {}s remaining", remaining);
                            self.handler.on_continue().await;
                            CountdownExit::Closed { generation: state.generation }
                        }
                        Some(AlertAction::Dismiss) => {
                            info!("Idle alert dismissed; logging out");
                            self.logout().await;
                            CountdownExit::Closed { generation: state.generation }
                        }
                        None => CountdownExit::Teardown,
                    };
                }
            }

            remaining = state.remaining_secs(self.clock.now()).unwrap_or(0);
            if remaining <= 0 {
                self.expire(remaining).await;
                return CountdownExit::Closed {
                    generation: state.generation,
                };
            }
            self.emit(AlertEvent::Show { remaining });
        }
    }

    async fn expire(&mut self, remaining: i64) {
        info!("Session expired ({}s); logging out", remaining);
        self.emit(AlertEvent::Hide { remaining });
        self.logout().await;
    }

    async fn logout(&self) {
        counter!("console_idle_logouts_total").increment(1);
        self.handler.on_logout().await;
    }

    /// Render triggers never block the countdown; a slow host misses frames
    fn emit(&self, event: AlertEvent) {
        match self.events.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(event)) => {
                debug!("Alert event receiver lagging; dropped {:?}", event);
            }
            Err(mpsc::error::TrySendError::Closed(event)) => {
                debug!("Alert event receiver dropped: {:?}", event);
            }
        }
    }
}
