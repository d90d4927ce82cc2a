use async_trait::async_trait;
use twilight_model::application::command::Command;
use twilight_model::id::marker::InteractionMarker;
use twilight_model::id::Id;

use crate::error::Error;
use crate::models::{HistoryMessage, InitialResponse, InteractionReply, MemberRecord};

/// The shared client handle lent to addons and command handlers.
///
/// IDs are passed as strings, the same way the control plane and the
/// configuration carry them; implementations parse them into snowflakes.
#[async_trait]
pub trait BotClient: Send + Sync {
    /// Whether the guild is present in the live cache.
    fn guild_available(&self, guild_id: &str) -> bool;

    /// Snapshot of the cached members of a guild, in cache iteration order.
    fn cached_members(&self, guild_id: &str) -> Vec<MemberRecord>;

    /// Fetch a single member over REST.
    async fn fetch_member(&self, guild_id: &str, member_id: &str) -> Result<MemberRecord, Error>;

    /// Server-mute or unmute a member's voice state.
    async fn set_voice_mute(
        &self,
        guild_id: &str,
        member_id: &str,
        mute: bool,
        reason: Option<&str>,
    ) -> Result<(), Error>;

    /// One page of channel history, newest first, optionally strictly older than `before`.
    async fn channel_messages(
        &self,
        channel_id: &str,
        before: Option<&str>,
        limit: u16,
    ) -> Result<Vec<HistoryMessage>, Error>;
}

/// Sends responses for an interaction.
#[async_trait]
pub trait InteractionResponder: Send + Sync {
    async fn create_response(
        &self,
        interaction_id: Id<InteractionMarker>,
        token: &str,
        response: &InitialResponse,
    ) -> Result<(), Error>;

    /// Replace the content of the original response.
    async fn edit_response(&self, token: &str, reply: &InteractionReply) -> Result<(), Error>;
}

/// Replaces a guild's registered application commands.
#[async_trait]
pub trait CommandRegistrar: Send + Sync {
    async fn set_guild_commands(&self, guild_id: &str, commands: &[Command]) -> Result<(), Error>;
}
