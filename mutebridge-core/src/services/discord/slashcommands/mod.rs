// File: mutebridge-core/src/services/discord/slashcommands/mod.rs

pub mod quote;
pub mod restart;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};
use twilight_model::application::command::{Command, CommandType};
use twilight_model::guild::Permissions;
use twilight_util::builder::command::CommandBuilder;

use mutebridge_common::traits::BotClient;

use crate::config::BotSettings;
use crate::eventbus::EventBus;
use crate::services::discord::interaction_handle::InteractionHandle;
use crate::Error;

pub use quote::QuoteCommand;
pub use restart::RestartCommand;

/// A chat-input command: its registration schema plus its handler.
#[async_trait]
pub trait SlashCommand: Send + Sync {
    /// Wire name, unique within the registry.
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Permissions the invoker must hold. Empty means anyone.
    fn required_permissions(&self) -> Permissions {
        Permissions::empty()
    }

    fn schema(&self) -> Command {
        let builder = CommandBuilder::new(self.name(), self.description(), CommandType::ChatInput);
        let required = self.required_permissions();
        if required.is_empty() {
            builder.build()
        } else {
            builder.default_member_permissions(required).build()
        }
    }

    /// `Ok(true)` when the command handled the interaction, `Ok(false)` when it
    /// declined and left the answering to the router.
    async fn execute(
        &self,
        client: &dyn BotClient,
        interaction: &InteractionHandle,
        events: &EventBus,
    ) -> Result<bool, Error>;
}

/// Every command this bot ships.
pub enum BuiltinCommand {
    Restart(RestartCommand),
    Quote(QuoteCommand),
}

#[async_trait]
impl SlashCommand for BuiltinCommand {
    fn name(&self) -> &str {
        match self {
            BuiltinCommand::Restart(c) => c.name(),
            BuiltinCommand::Quote(c) => c.name(),
        }
    }

    fn description(&self) -> &str {
        match self {
            BuiltinCommand::Restart(c) => c.description(),
            BuiltinCommand::Quote(c) => c.description(),
        }
    }

    fn required_permissions(&self) -> Permissions {
        match self {
            BuiltinCommand::Restart(c) => c.required_permissions(),
            BuiltinCommand::Quote(c) => c.required_permissions(),
        }
    }

    async fn execute(
        &self,
        client: &dyn BotClient,
        interaction: &InteractionHandle,
        events: &EventBus,
    ) -> Result<bool, Error> {
        match self {
            BuiltinCommand::Restart(c) => c.execute(client, interaction, events).await,
            BuiltinCommand::Quote(c) => c.execute(client, interaction, events).await,
        }
    }
}

/// The commands to register, in registration order.
pub fn builtin_commands(settings: &BotSettings) -> Vec<Arc<dyn SlashCommand>> {
    vec![
        Arc::new(BuiltinCommand::Restart(RestartCommand)),
        Arc::new(BuiltinCommand::Quote(QuoteCommand::new(
            settings.quote_channel_id.clone(),
        ))),
    ]
}

/// Commands keyed by wire name, remembering registration order.
#[derive(Default)]
pub struct CommandRegistry {
    order: Vec<String>,
    commands: HashMap<String, Arc<dyn SlashCommand>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_commands(commands: Vec<Arc<dyn SlashCommand>>) -> Result<Self, Error> {
        let mut registry = Self::new();
        for command in commands {
            registry.register(command)?;
        }
        Ok(registry)
    }

    pub fn register(&mut self, command: Arc<dyn SlashCommand>) -> Result<(), Error> {
        let name = command.name().to_string();
        if self.commands.contains_key(&name) {
            warn!("Command '/{}' registered twice", name);
            return Err(Error::Command(format!("duplicate command name '{name}'")));
        }
        debug!("Registered command '/{}'", name);
        self.order.push(name.clone());
        self.commands.insert(name, command);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn SlashCommand>> {
        self.commands.get(name).cloned()
    }

    /// Registration payload, in registration order.
    pub fn schemas(&self) -> Vec<Command> {
        self.order
            .iter()
            .filter_map(|name| self.commands.get(name))
            .map(|c| c.schema())
            .collect()
    }

    pub fn names(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
