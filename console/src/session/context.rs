use crate::api::{ApiError, ConsoleApi, ConsoleConfig, User};
use crate::session::alert::IdleAlertHandler;
use crate::session::tracker::SessionTracker;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{RwLock, watch};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Which top-level view the console should show
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// Configuration not loaded yet
    Loading,
    /// Authenticated and configured
    Ready,
    /// Session ended; route to login
    Login,
}

/// A dismissible error shown to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: Uuid,
    pub title: String,
    pub detail: String,
}

/// Data for the About dialog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AboutInfo {
    pub version: String,
    pub ansible_version: Option<String>,
}

/// Session context: loads configuration and identity, owns the logout flow,
/// and answers the idle alert's callbacks.
pub struct SessionContext {
    api: Arc<dyn ConsoleApi>,
    tracker: Arc<SessionTracker>,
    config: RwLock<Option<ConsoleConfig>>,
    notifications: RwLock<Vec<Notification>>,
    view: watch::Sender<View>,
}

impl SessionContext {
    pub fn new(api: Arc<dyn ConsoleApi>, tracker: Arc<SessionTracker>) -> Self {
        let (view, _) = watch::channel(View::Loading);
        Self {
            api,
            tracker,
            config: RwLock::new(None),
            notifications: RwLock::new(Vec::new()),
            view,
        }
    }

    pub fn tracker(&self) -> &Arc<SessionTracker> {
        &self.tracker
    }

    /// Load configuration and identity together.
    ///
    /// No-op once a versioned configuration is loaded. A 401 logs out
    /// silently; any other failure becomes a notification.
    pub async fn load(&self) {
        if self
            .config
            .read()
            .await
            .as_ref()
            .is_some_and(|config| config.server.version.is_some())
        {
            return;
        }

        match tokio::try_join!(self.api.read_config(), self.api.read_me()) {
            Ok((server, me)) => {
                info!(
                    "Loaded configuration (version {:?}) for user {}",
                    server.version, me.username
                );
                *self.config.write().await = Some(ConsoleConfig { server, me });
                self.view.send_replace(View::Ready);
            }
            Err(e) if e.is_unauthorized() => {
                debug!("Configuration request unauthorized; logging out");
                self.handle_logout().await;
            }
            Err(e) => {
                error!("Failed to retrieve configuration: {}", e);
                self.notify("Failed to retrieve configuration.", &e).await;
            }
        }
    }

    /// End the session. Always lands on the login view, even if the
    /// logout request fails.
    pub async fn handle_logout(&self) {
        if let Err(e) = self.api.logout().await {
            warn!("Logout request failed: {}", e);
            self.notify("Failed to log out.", &e).await;
        }

        self.tracker.reset();
        *self.config.write().await = None;
        self.view.send_replace(View::Login);
        info!("Logged out");
    }

    /// Refresh the server session by re-reading identity.
    ///
    /// The response's session-timeout hint resets the tracker.
    pub async fn refresh_session(&self) {
        match self.api.read_me().await {
            Ok(me) => {
                debug!("Session refreshed for {}", me.username);
                if let Some(config) = self.config.write().await.as_mut() {
                    config.me = me;
                }
            }
            Err(e) if e.is_unauthorized() => {
                debug!("Session refresh unauthorized; logging out");
                self.handle_logout().await;
            }
            Err(e) => {
                warn!("Failed to refresh session: {}", e);
                self.notify("Failed to refresh session.", &e).await;
            }
        }
    }

    pub async fn config(&self) -> Option<ConsoleConfig> {
        self.config.read().await.clone()
    }

    pub async fn logged_in_user(&self) -> Option<User> {
        self.config.read().await.as_ref().map(|config| config.me.clone())
    }

    /// About dialog data; `None` until a version is known
    pub async fn about(&self) -> Option<AboutInfo> {
        let config = self.config.read().await;
        let server = &config.as_ref()?.server;
        Some(AboutInfo {
            version: server.version.clone()?,
            ansible_version: server.ansible_version.clone(),
        })
    }

    pub fn view(&self) -> watch::Receiver<View> {
        self.view.subscribe()
    }

    pub fn current_view(&self) -> View {
        *self.view.borrow()
    }

    pub async fn notifications(&self) -> Vec<Notification> {
        self.notifications.read().await.clone()
    }

    /// Dismiss a notification; returns false if it was already gone
    pub async fn dismiss_notification(&self, id: Uuid) -> bool {
        let mut notifications = self.notifications.write().await;
        let before = notifications.len();
        notifications.retain(|n| n.id != id);
        notifications.len() != before
    }

    async fn notify(&self, title: &str, error: &ApiError) {
        let notification = Notification {
            id: Uuid::new_v4(),
            title: title.to_string(),
            detail: error.to_string(),
        };
        self.notifications.write().await.push(notification);
    }
}

#[async_trait]
impl IdleAlertHandler for SessionContext {
    async fn on_logout(&self) {
        self.handle_logout().await;
    }

    async fn on_continue(&self) {
        self.refresh_session().await;
    }
}
