//! src/plugin.rs
//!
//! The bot itself: registers commands, connects the gateway, starts the
//! addons once the connection is ready, routes interactions and keeps the
//! presence in sync with the host's version.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use mutebridge_common::traits::{BotClient, CommandRegistrar, InteractionResponder};

use crate::addons::{builtin_addons, AddonRegistry};
use crate::config::Settings;
use crate::eventbus::{BridgeEvent, EventBus, RESTART_REQUESTED, VERSION};
use crate::platforms::discord::{version_presence, DiscordRuntime, GatewayEvent, ShardSet};
use crate::services::discord::{builtin_commands, CommandRegistry, InteractionRouter};
use crate::Error;

/// Why `run` returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginExit {
    /// `/restart` was used; the host should run the plugin again.
    RestartRequested,
    /// The event bus was shut down.
    Shutdown,
}

pub struct BridgePlugin {
    settings: Settings,
    events: EventBus,
    commands: Arc<CommandRegistry>,
}

impl BridgePlugin {
    /// Fails if the bot settings are invalid; nothing is registered or started then.
    pub fn new(settings: Settings, events: EventBus) -> Result<Self, Error> {
        settings.bot.validate()?;
        let commands = CommandRegistry::with_commands(builtin_commands(&settings.bot))?;
        Ok(Self {
            settings,
            events,
            commands: Arc::new(commands),
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn commands(&self) -> &CommandRegistry {
        &self.commands
    }

    /// Asks the host for its version, then replaces every configured guild's
    /// commands with ours. Any registration failure aborts.
    pub async fn init(&self, registrar: &dyn CommandRegistrar) -> Result<(), Error> {
        self.events.publish(BridgeEvent::VersionRequested).await;

        let schemas = self.commands.schemas();
        for guild_id in &self.settings.bot.guild_ids {
            debug!("Clearing commands of guild {}", guild_id);
            registrar.set_guild_commands(guild_id, &[]).await?;
            registrar.set_guild_commands(guild_id, &schemas).await?;
            info!(
                "Registered {} command(s) in guild {}: {:?}",
                schemas.len(),
                guild_id,
                self.commands.names()
            );
        }
        Ok(())
    }

    pub fn router(
        &self,
        client: Arc<dyn BotClient>,
        responder: Arc<dyn InteractionResponder>,
    ) -> InteractionRouter {
        InteractionRouter::new(
            self.commands.clone(),
            client,
            self.events.clone(),
            responder,
            self.settings.router.clone(),
        )
    }

    /// Starts the builtin addons; called on every gateway `Ready`. Addons that
    /// are already loaded (after a reconnect) are left alone.
    pub fn start_addons(&self, addons: &AddonRegistry) -> Vec<JoinHandle<()>> {
        addons.load_all(builtin_addons(&self.settings))
    }

    fn show_version(&self, shards: &ShardSet, version: &str) {
        match version_presence(version, &self.settings.bot.presence_url) {
            Ok(presence) => {
                debug!("Updating presence to 'Version {}'", version);
                shards.update_presence(&presence);
            }
            Err(e) => warn!("Couldn't build presence => {}", e),
        }
    }

    /// Connects to Discord and serves until a restart is requested or the
    /// bus shuts down. Addons and shards are stopped before returning.
    pub async fn run(&self) -> Result<PluginExit, Error> {
        let runtime = Arc::new(DiscordRuntime::new(
            &self.settings.bot.token,
            &self.settings.bot.client_id,
        )?);

        // Subscribe before init so the answer to version.requested isn't missed.
        let mut bus_rx = self.events.subscribe_to(&[VERSION, RESTART_REQUESTED], None).await;
        self.init(runtime.as_ref()).await?;

        let (shards, mut gateway_rx) = runtime.connect_gateway().await?;
        let client: Arc<dyn BotClient> = runtime.clone();
        let addons = AddonRegistry::new(client.clone());
        let router = self.router(client, runtime.clone());
        let mut shutdown_rx = self.events.shutdown_rx.clone();
        let mut version: Option<String> = None;

        let exit = loop {
            if self.events.is_shutdown() {
                break Ok(PluginExit::Shutdown);
            }
            tokio::select! {
                event = gateway_rx.recv() => match event {
                    Some(GatewayEvent::Ready { user_name }) => {
                        info!("Logged in as {}", user_name);
                        if let Some(v) = &version {
                            self.show_version(&shards, v);
                        }
                        self.start_addons(&addons);
                    }
                    Some(GatewayEvent::Interaction(interaction)) => {
                        let router = router.clone();
                        tokio::spawn(async move {
                            let id = interaction.id;
                            let outcome = router.route(interaction).await;
                            debug!("Interaction {} => {:?}", id, outcome);
                        });
                    }
                    None => {
                        error!("Every shard stopped => leaving");
                        break Err(Error::Platform("gateway connection closed".into()));
                    }
                },
                Some(event) = bus_rx.recv() => match event {
                    BridgeEvent::Version(v) => {
                        self.show_version(&shards, &v);
                        version = Some(v);
                    }
                    BridgeEvent::RestartRequested { requested_by } => {
                        info!("Restart requested by {:?} => stopping", requested_by);
                        break Ok(PluginExit::RestartRequested);
                    }
                    other => debug!("Ignoring bus event {:?}", other),
                },
                _ = shutdown_rx.changed() => {
                    info!("Shutdown signal => stopping");
                    break Ok(PluginExit::Shutdown);
                }
            }
        };

        self.stop(&addons, shards).await;
        exit
    }

    /// Unloads every addon, then closes the shards.
    pub async fn stop(&self, addons: &AddonRegistry, shards: ShardSet) {
        addons.unload_all().await;
        shards.close().await;
        info!("Bridge plugin stopped");
    }
}
