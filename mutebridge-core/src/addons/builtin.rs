use std::sync::Arc;

use async_trait::async_trait;
use tracing::error;

use mutebridge_common::traits::BotClient;

use crate::addons::addon::Addon;
use crate::config::Settings;
use crate::control_plane::MuteBridgeAddon;
use crate::Error;

/// Every addon this bot ships. New addons are added here and in `builtin_addons`.
pub enum BuiltinAddon {
    MuteBridge(MuteBridgeAddon),
}

#[async_trait]
impl Addon for BuiltinAddon {
    fn name(&self) -> &str {
        match self {
            BuiltinAddon::MuteBridge(a) => a.name(),
        }
    }

    fn description(&self) -> &str {
        match self {
            BuiltinAddon::MuteBridge(a) => a.description(),
        }
    }

    async fn start(&self, client: Arc<dyn BotClient>) -> Result<(), Error> {
        match self {
            BuiltinAddon::MuteBridge(a) => a.start(client).await,
        }
    }

    async fn stop(&self) -> Result<(), Error> {
        match self {
            BuiltinAddon::MuteBridge(a) => a.stop().await,
        }
    }
}

/// The addons to start at connection-ready time, in start order.
/// Addons whose settings are absent or invalid are skipped.
pub fn builtin_addons(settings: &Settings) -> Vec<Arc<dyn Addon>> {
    let mut addons: Vec<Arc<dyn Addon>> = Vec::new();
    if let Some(mute_bridge) = &settings.mute_bridge {
        match mute_bridge.validate() {
            Ok(()) => addons.push(Arc::new(BuiltinAddon::MuteBridge(MuteBridgeAddon::new(
                mute_bridge.clone(),
            )))),
            Err(e) => error!("Mute bridge settings rejected => not starting it: {}", e),
        }
    }
    addons
}
