use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use mutebridge_core::config::{
    BotSettings, MuteBridgeSettings, ProtocolMode, RouterPolicy, Settings, UnknownPermissionsPolicy,
};
use mutebridge_core::eventbus::{BridgeEvent, EventBus, VERSION_REQUESTED};
use mutebridge_core::{BridgePlugin, PluginExit};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ProtocolArg {
    Legacy,
    Rest,
}

impl From<ProtocolArg> for ProtocolMode {
    fn from(arg: ProtocolArg) -> Self {
        match arg {
            ProtocolArg::Legacy => ProtocolMode::Legacy,
            ProtocolArg::Rest => ProtocolMode::Rest,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum UnknownPermissionsArg {
    Ignore,
    Deny,
}

impl From<UnknownPermissionsArg> for UnknownPermissionsPolicy {
    fn from(arg: UnknownPermissionsArg) -> Self {
        match arg {
            UnknownPermissionsArg::Ignore => UnknownPermissionsPolicy::Ignore,
            UnknownPermissionsArg::Deny => UnknownPermissionsPolicy::Deny,
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(name = "mutebridge")]
#[command(author, version, about = "Discord bot with an HTTP mute bridge for game servers")]
struct Args {
    /// JSON settings file; replaces every other option when given.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, env = "DISCORD_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Application (client) ID.
    #[arg(long, env = "DISCORD_CLIENT_ID")]
    client_id: Option<String>,

    /// Guilds to register commands in, comma separated.
    #[arg(long, env = "DISCORD_GUILD_IDS", value_delimiter = ',')]
    guild_ids: Vec<String>,

    #[arg(long, env = "QUOTE_CHANNEL_ID")]
    quote_channel_id: Option<String>,

    #[arg(long, env = "PRESENCE_URL", default_value = "https://twitch.tv/vertiKarl")]
    presence_url: String,

    /// Shared secret for the mute bridge; the bridge is off without it.
    #[arg(long, env = "MUTE_BRIDGE_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Guild whose members get muted; defaults to the first command guild.
    #[arg(long, env = "MUTE_BRIDGE_GUILD_ID")]
    bridge_guild_id: Option<String>,

    #[arg(long, env = "MUTE_BRIDGE_CHANNEL_ID", default_value = "")]
    bridge_channel_id: String,

    #[arg(long, env = "MUTE_BRIDGE_PORT", default_value_t = 37405)]
    port: u16,

    #[arg(long, env = "MUTE_BRIDGE_BIND", default_value = "0.0.0.0")]
    bind_ip: IpAddr,

    #[arg(long, value_enum, env = "MUTE_BRIDGE_PROTOCOL", default_value = "rest")]
    protocol: ProtocolArg,

    /// Don't serve the legacy endpoint at `GET /` next to the REST routes.
    #[arg(long, default_value = "false")]
    no_legacy_compat: bool,

    #[arg(long, default_value = "false")]
    debug_mode: bool,

    /// What to do with commands invoked without permission data.
    #[arg(long, value_enum, default_value = "ignore")]
    unknown_permissions: UnknownPermissionsArg,
}

impl Args {
    fn into_settings(self) -> anyhow::Result<Settings> {
        if let Some(path) = &self.config {
            return Settings::from_json_file(path)
                .with_context(|| format!("reading settings from {}", path.display()));
        }

        let (Some(token), Some(client_id)) = (self.token, self.client_id) else {
            bail!("--token and --client-id (or DISCORD_TOKEN / DISCORD_CLIENT_ID) are required");
        };

        let mute_bridge = self.api_key.map(|api_key| MuteBridgeSettings {
            api_key,
            guild_id: self
                .bridge_guild_id
                .or_else(|| self.guild_ids.first().cloned())
                .unwrap_or_default(),
            channel_id: self.bridge_channel_id,
            port: self.port,
            bind_ip: self.bind_ip,
            protocol: self.protocol.into(),
            legacy_compat: !self.no_legacy_compat,
            debug_mode: self.debug_mode,
        });

        Ok(Settings {
            bot: BotSettings {
                token,
                client_id,
                guild_ids: self.guild_ids,
                quote_channel_id: self.quote_channel_id,
                presence_url: self.presence_url,
            },
            mute_bridge,
            router: RouterPolicy {
                unknown_permissions: self.unknown_permissions.into(),
            },
        })
    }
}

fn init_tracing() -> anyhow::Result<()> {
    tracing_log::LogTracer::init().context("installing log bridge")?;
    let filter = EnvFilter::from_default_env()
        .add_directive("mutebridge=info".parse().unwrap_or_default());
    let sub = fmt().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(sub).context("setting global subscriber")?;
    Ok(())
}

/// Answers the plugin's version requests with this binary's version.
async fn spawn_version_responder(events: EventBus) {
    let mut rx = events.subscribe_to(&[VERSION_REQUESTED], None).await;
    tokio::spawn(async move {
        while rx.recv().await.is_some() {
            events
                .publish(BridgeEvent::Version(env!("CARGO_PKG_VERSION").to_string()))
                .await;
        }
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenv::dotenv();
    init_tracing()?;

    let args = Args::parse();
    let settings = args.into_settings()?;
    info!(
        "mutebridge {} starting. guilds={:?}, mute bridge={}",
        env!("CARGO_PKG_VERSION"),
        settings.bot.guild_ids,
        settings.mute_bridge.is_some()
    );

    let events = EventBus::new();
    spawn_version_responder(events.clone()).await;

    let ctrl_c_bus = events.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received => shutting down");
            ctrl_c_bus.shutdown();
        }
    });

    loop {
        let plugin = BridgePlugin::new(settings.clone(), events.clone())?;
        match plugin.run().await {
            Ok(PluginExit::RestartRequested) => {
                warn!("Restarting bridge plugin");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
            Ok(PluginExit::Shutdown) => break,
            Err(e) => {
                error!("Bridge plugin failed: {}", e);
                return Err(e.into());
            }
        }
    }

    info!("Main finished. Goodbye!");
    Ok(())
}
