// File: mutebridge-core/src/services/discord/slashcommands/restart.rs

use async_trait::async_trait;
use tracing::info;
use twilight_model::guild::Permissions;

use mutebridge_common::models::InteractionReply;
use mutebridge_common::traits::BotClient;

use crate::eventbus::{BridgeEvent, EventBus};
use crate::services::discord::interaction_handle::InteractionHandle;
use crate::services::discord::slashcommands::SlashCommand;
use crate::Error;

/// `/restart`: asks the host process to restart the bot.
pub struct RestartCommand;

#[async_trait]
impl SlashCommand for RestartCommand {
    fn name(&self) -> &str {
        "restart"
    }

    fn description(&self) -> &str {
        "Restarts the bot"
    }

    fn required_permissions(&self) -> Permissions {
        Permissions::ADMINISTRATOR
    }

    async fn execute(
        &self,
        _client: &dyn BotClient,
        interaction: &InteractionHandle,
        events: &EventBus,
    ) -> Result<bool, Error> {
        if events.is_shutdown() {
            return Err(Error::EventBus("event bus is shut down, can't restart".into()));
        }

        interaction
            .reply(InteractionReply::text("Requesting restart o7"))
            .await?;

        info!("Restart requested by {:?}", interaction.user_id());
        events
            .publish(BridgeEvent::RestartRequested {
                requested_by: interaction.user_id().map(str::to_string),
            })
            .await;
        Ok(true)
    }
}
