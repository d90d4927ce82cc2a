//! Settings for the bot and the mute-bridge control plane.
//!
//! Loaded once at startup (CLI/env in the server binary, optionally a JSON
//! file) and validated before anything talks to Discord.

use std::net::{IpAddr, SocketAddr};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Minimum length for tokens and snowflake-like IDs; anything shorter is a placeholder.
const MIN_ID_LEN: usize = 6;

fn looks_set(value: &str) -> bool {
    value.trim().len() >= MIN_ID_LEN
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotSettings {
    pub token: String,
    /// Application ID used for command registration and interaction responses.
    pub client_id: String,
    pub guild_ids: Vec<String>,
    /// Channel the `/quote` command reads from.
    #[serde(default)]
    pub quote_channel_id: Option<String>,
    #[serde(default = "default_presence_url")]
    pub presence_url: String,
}

fn default_presence_url() -> String {
    "https://twitch.tv/vertiKarl".to_string()
}

impl BotSettings {
    pub fn validate(&self) -> Result<(), Error> {
        if !looks_set(&self.client_id) {
            return Err(Error::Config("client id is missing or too short".into()));
        }
        if !looks_set(&self.token) {
            return Err(Error::Config("bot token is missing or too short".into()));
        }
        match self.guild_ids.first() {
            Some(first) if looks_set(first) => {}
            _ => return Err(Error::Config("at least one guild id is required".into())),
        }
        if let Some(bad) = self.guild_ids.iter().find(|g| g.parse::<u64>().is_err()) {
            return Err(Error::Config(format!("guild id '{bad}' is not numeric")));
        }
        Ok(())
    }
}

/// Which wire protocol the control plane speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolMode {
    /// Every path and method is the single header-dispatched endpoint.
    Legacy,
    /// REST routes, optionally with the legacy endpoint mounted at `GET /`.
    Rest,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MuteBridgeSettings {
    /// Shared secret; callers send `Authorization: Basic <api_key>` verbatim.
    pub api_key: String,
    pub guild_id: String,
    pub channel_id: String,
    pub port: u16,
    #[serde(default = "default_bind_ip")]
    pub bind_ip: IpAddr,
    #[serde(default = "default_protocol")]
    pub protocol: ProtocolMode,
    #[serde(default = "default_true")]
    pub legacy_compat: bool,
    #[serde(default)]
    pub debug_mode: bool,
}

fn default_bind_ip() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_protocol() -> ProtocolMode {
    ProtocolMode::Rest
}

fn default_true() -> bool {
    true
}

impl MuteBridgeSettings {
    pub fn validate(&self) -> Result<(), Error> {
        if self.api_key.is_empty() {
            return Err(Error::Config("mute bridge api key is empty".into()));
        }
        if !looks_set(&self.guild_id) || self.guild_id.parse::<u64>().is_err() {
            return Err(Error::Config(format!("invalid mute bridge guild id '{}'", self.guild_id)));
        }
        if !looks_set(&self.channel_id) {
            return Err(Error::Config(format!("invalid mute bridge channel id '{}'", self.channel_id)));
        }
        if self.port == 0 {
            return Err(Error::Config("mute bridge port must not be 0".into()));
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_ip, self.port)
    }
}

/// What the router does when a command requires permissions but the
/// invoker's permission set is not in the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownPermissionsPolicy {
    /// Drop the interaction without a reply.
    #[default]
    Ignore,
    /// Answer with the ephemeral insufficient-permissions reply.
    Deny,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouterPolicy {
    #[serde(default)]
    pub unknown_permissions: UnknownPermissionsPolicy,
}

/// Everything the plugin needs, as one file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub bot: BotSettings,
    pub mute_bridge: Option<MuteBridgeSettings>,
    #[serde(default)]
    pub router: RouterPolicy,
}

impl Settings {
    pub fn from_json_file(path: &Path) -> Result<Self, Error> {
        let raw = std::fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&raw)?;
        Ok(settings)
    }
}
