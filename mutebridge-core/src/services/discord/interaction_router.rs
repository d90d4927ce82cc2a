// File: mutebridge-core/src/services/discord/interaction_router.rs

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use mutebridge_common::models::{IncomingInteraction, InteractionReply};
use mutebridge_common::traits::{BotClient, InteractionResponder};

use crate::config::{RouterPolicy, UnknownPermissionsPolicy};
use crate::eventbus::EventBus;
use crate::services::discord::interaction_handle::InteractionHandle;
use crate::services::discord::slashcommands::CommandRegistry;

pub const INSUFFICIENT_PERMISSIONS_MESSAGE: &str = "Insufficient permissions!";
pub const GENERIC_FAILURE_MESSAGE: &str = "Sorry, something went wrong!";
pub const HANDLER_FAILURE_MESSAGE: &str = "Failed executing command!";

/// Where an interaction ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    NotACommand,
    UnknownCommand,
    /// The command needs permissions and the payload didn't carry any;
    /// dropped or denied depending on policy.
    PermissionsUnavailable,
    PermissionDenied,
    Handled,
    HandlerDeclined,
    HandlerFailed,
}

/// Dispatches inbound interactions to commands and guarantees each invocation
/// that reaches a handler gets exactly one answer.
#[derive(Clone)]
pub struct InteractionRouter {
    commands: Arc<CommandRegistry>,
    client: Arc<dyn BotClient>,
    events: EventBus,
    responder: Arc<dyn InteractionResponder>,
    policy: RouterPolicy,
}

impl InteractionRouter {
    pub fn new(
        commands: Arc<CommandRegistry>,
        client: Arc<dyn BotClient>,
        events: EventBus,
        responder: Arc<dyn InteractionResponder>,
        policy: RouterPolicy,
    ) -> Self {
        Self {
            commands,
            client,
            events,
            responder,
            policy,
        }
    }

    pub async fn route(&self, interaction: IncomingInteraction) -> RouteOutcome {
        let Some(name) = interaction.command_name().map(str::to_string) else {
            debug!("Ignoring non-command interaction {}", interaction.id);
            return RouteOutcome::NotACommand;
        };

        let Some(command) = self.commands.get(&name) else {
            debug!("Ignoring unknown command '/{}'", name);
            return RouteOutcome::UnknownCommand;
        };

        let handle = InteractionHandle::new(interaction, self.responder.clone());

        let required = command.required_permissions();
        if !required.is_empty() {
            match handle.interaction().member_permissions {
                None => {
                    warn!("'/{}' needs {:?} but the invoker's permissions are unknown", name, required);
                    if self.policy.unknown_permissions == UnknownPermissionsPolicy::Deny {
                        self.send(&handle, InteractionReply::ephemeral(INSUFFICIENT_PERMISSIONS_MESSAGE))
                            .await;
                    }
                    return RouteOutcome::PermissionsUnavailable;
                }
                Some(held) if !held.contains(required) => {
                    info!("{:?} lacks {:?} for '/{}'", handle.user_id(), required, name);
                    self.send(&handle, InteractionReply::ephemeral(INSUFFICIENT_PERMISSIONS_MESSAGE))
                        .await;
                    return RouteOutcome::PermissionDenied;
                }
                Some(_) => {}
            }
        }

        debug!("Executing '/{}' for {:?}", name, handle.user_id());
        match command.execute(self.client.as_ref(), &handle, &self.events).await {
            Ok(true) => RouteOutcome::Handled,
            Ok(false) => {
                if !handle.is_acknowledged().await {
                    self.send(&handle, InteractionReply::text(GENERIC_FAILURE_MESSAGE)).await;
                }
                RouteOutcome::HandlerDeclined
            }
            Err(e) => {
                error!("Command '/{}' failed => {}", name, e);
                if let Err(e) = handle
                    .reply_or_edit(InteractionReply::text(HANDLER_FAILURE_MESSAGE))
                    .await
                {
                    error!("Couldn't report failure of '/{}' => {}", name, e);
                }
                RouteOutcome::HandlerFailed
            }
        }
    }

    async fn send(&self, handle: &InteractionHandle, reply: InteractionReply) {
        if let Err(e) = handle.reply(reply).await {
            error!("Failed replying to interaction {} => {}", handle.interaction().id, e);
        }
    }
}
