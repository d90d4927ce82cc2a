use twilight_model::application::interaction::{Interaction, InteractionData, InteractionType};
use twilight_model::channel::message::Embed;
use twilight_model::guild::Permissions;
use twilight_model::id::marker::InteractionMarker;
use twilight_model::id::Id;

/// What kind of inbound interaction we received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InteractionKind {
    /// A slash/context command invocation, carrying the wire command name.
    Command { name: String },
    /// Buttons, autocomplete, modals, pings...
    Other,
}

/// The subset of a gateway interaction the router needs.
#[derive(Debug, Clone)]
pub struct IncomingInteraction {
    pub id: Id<InteractionMarker>,
    pub token: String,
    pub kind: InteractionKind,
    /// `None` when the invoker's permissions are not part of the payload
    /// (DMs, or partial member data).
    pub member_permissions: Option<Permissions>,
    pub guild_id: Option<String>,
    pub user_id: Option<String>,
}

impl IncomingInteraction {
    pub fn command_name(&self) -> Option<&str> {
        match &self.kind {
            InteractionKind::Command { name } => Some(name.as_str()),
            InteractionKind::Other => None,
        }
    }
}

impl From<&Interaction> for IncomingInteraction {
    fn from(interaction: &Interaction) -> Self {
        let kind = match (&interaction.kind, &interaction.data) {
            (InteractionType::ApplicationCommand, Some(InteractionData::ApplicationCommand(data))) => {
                InteractionKind::Command { name: data.name.clone() }
            }
            _ => InteractionKind::Other,
        };

        let member = interaction.member.as_ref();
        let user_id = member
            .and_then(|m| m.user.as_ref())
            .or(interaction.user.as_ref())
            .map(|u| u.id.to_string());

        Self {
            id: interaction.id,
            token: interaction.token.clone(),
            kind,
            member_permissions: member.and_then(|m| m.permissions),
            guild_id: interaction.guild_id.map(|g| g.to_string()),
            user_id,
        }
    }
}

/// Message body for an interaction reply or edit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InteractionReply {
    pub content: Option<String>,
    pub embeds: Vec<Embed>,
    pub ephemeral: bool,
}

impl InteractionReply {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Default::default()
        }
    }

    pub fn ephemeral(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            embeds: Vec::new(),
            ephemeral: true,
        }
    }

    pub fn embed(embed: Embed) -> Self {
        Self {
            content: None,
            embeds: vec![embed],
            ephemeral: false,
        }
    }
}

/// The initial (and only) response the platform accepts for an interaction.
#[derive(Debug, Clone, PartialEq)]
pub enum InitialResponse {
    Message(InteractionReply),
    /// "Bot is thinking..."; the real content arrives later as an edit.
    Deferred { ephemeral: bool },
}
