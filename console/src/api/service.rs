//! ConsoleApi trait definition

use async_trait::async_trait;

use super::types::{ApiError, ServerConfig, User};

/// Operations the session layer needs from the controller
#[async_trait]
pub trait ConsoleApi: Send + Sync {
    /// Read server configuration
    async fn read_config(&self) -> Result<ServerConfig, ApiError>;

    /// Read the current user
    async fn read_me(&self) -> Result<User, ApiError>;

    /// End the server session
    async fn logout(&self) -> Result<(), ApiError>;
}
