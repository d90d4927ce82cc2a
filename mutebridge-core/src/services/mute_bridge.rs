use std::sync::Arc;

use tracing::{error, info};

use mutebridge_common::traits::BotClient;

use crate::Error;

/// Audit log reason attached to server mutes.
pub const MUTE_REASON: &str = "dead players can't talk!";

/// Applies voice mute state to guild members.
///
/// There is no local bookkeeping: the platform's mute write is idempotent,
/// so asking for the current state again is simply another successful write.
#[derive(Clone)]
pub struct MuteBridge {
    client: Arc<dyn BotClient>,
}

impl MuteBridge {
    pub fn new(client: Arc<dyn BotClient>) -> Self {
        Self { client }
    }

    pub async fn apply_mute(&self, guild_id: &str, member_id: &str, mute: bool) -> Result<(), Error> {
        let result = self.try_apply(guild_id, member_id, mute).await;
        match &result {
            Ok(()) => info!(
                "[Mute][SetMute][Success] {} {}",
                if mute { "Muted" } else { "Unmuted" },
                member_id
            ),
            Err(e) => error!(
                "[Mute][SetMute][Error] {}: {} - {}",
                if mute { "Mute" } else { "Unmute" },
                member_id,
                e
            ),
        }
        result
    }

    async fn try_apply(&self, guild_id: &str, member_id: &str, mute: bool) -> Result<(), Error> {
        let member = self.client.fetch_member(guild_id, member_id).await?;
        let reason = if mute { Some(MUTE_REASON) } else { None };
        self.client
            .set_voice_mute(guild_id, &member.id, mute, reason)
            .await
    }
}
