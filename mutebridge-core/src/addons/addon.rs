// src/addons/addon.rs
use std::sync::Arc;

use async_trait::async_trait;

use mutebridge_common::traits::BotClient;

use crate::Error;

/// Where an addon is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddonState {
    Unloaded,
    Loading,
    Running,
    Stopping,
}

/// A feature module started against the shared client once the gateway is ready.
#[async_trait]
pub trait Addon: Send + Sync {
    /// Unique registry key.
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Start the addon. The client is lent for as long as the addon runs.
    async fn start(&self, client: Arc<dyn BotClient>) -> Result<(), Error>;

    /// Release everything `start` opened. Must be safe to call when the
    /// addon never started or was already stopped.
    async fn stop(&self) -> Result<(), Error>;
}
