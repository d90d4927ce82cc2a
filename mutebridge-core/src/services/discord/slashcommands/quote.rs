// File: mutebridge-core/src/services/discord/slashcommands/quote.rs

use async_trait::async_trait;
use rand::seq::IndexedRandom;
use tracing::{debug, error, info};
use twilight_model::channel::message::Embed;
use twilight_model::guild::Permissions;
use twilight_util::builder::embed::{EmbedAuthorBuilder, EmbedBuilder, EmbedFooterBuilder, ImageSource};

use mutebridge_common::models::{HistoryMessage, InteractionReply};
use mutebridge_common::traits::BotClient;

use crate::eventbus::EventBus;
use crate::services::discord::interaction_handle::InteractionHandle;
use crate::services::discord::slashcommands::SlashCommand;
use crate::Error;

/// Largest page the history endpoint hands out.
pub const HISTORY_PAGE_SIZE: u16 = 100;

const EMBED_TITLE_LIMIT: usize = 256;

pub const QUOTE_FAILURE_MESSAGE: &str = "Sorry, I ran into a problem. This might be caused by to many requests to the Discord-API.\nThis error has been logged!";

/// `/quote`: posts a random message from the quotes channel as an embed.
pub struct QuoteCommand {
    channel_id: Option<String>,
}

impl QuoteCommand {
    pub fn new(channel_id: Option<String>) -> Self {
        Self { channel_id }
    }

    async fn pick_quote(&self, client: &dyn BotClient, channel_id: &str) -> Result<HistoryMessage, Error> {
        let history = fetch_history(client, channel_id).await?;
        let eligible: Vec<&HistoryMessage> = history.iter().filter(|m| is_quotable(m)).collect();
        debug!(
            "Quote candidates in {}: {} of {} messages",
            channel_id,
            eligible.len(),
            history.len()
        );
        eligible
            .choose(&mut rand::rng())
            .map(|m| (*m).clone())
            .ok_or_else(|| Error::NotFound(format!("no quotable message in channel {channel_id}")))
    }
}

/// Reads the whole channel, newest first, one page at a time.
pub async fn fetch_history(client: &dyn BotClient, channel_id: &str) -> Result<Vec<HistoryMessage>, Error> {
    let mut all: Vec<HistoryMessage> = Vec::new();
    loop {
        let before = all.last().map(|m| m.id.clone());
        let page = client
            .channel_messages(channel_id, before.as_deref(), HISTORY_PAGE_SIZE)
            .await?;
        let exhausted = page.len() < usize::from(HISTORY_PAGE_SIZE);
        all.extend(page);
        if exhausted {
            return Ok(all);
        }
    }
}

fn is_image_link(content: &str) -> bool {
    [".gif", ".png", ".jpg"].iter().any(|ext| content.ends_with(ext))
}

/// Replies, system messages and bare non-image links are never quoted.
pub fn is_quotable(message: &HistoryMessage) -> bool {
    if message.is_reply || message.is_system {
        return false;
    }
    !message.content.starts_with("https://") || is_image_link(&message.content)
}

fn image_source(url: &str) -> Result<ImageSource, Error> {
    ImageSource::url(url).map_err(|e| Error::Command(format!("bad image url '{url}': {e}")))
}

pub fn build_quote_embed(message: &HistoryMessage, guild_id: Option<&str>) -> Result<Embed, Error> {
    let title = if message.content.is_empty() {
        " ".to_string()
    } else {
        message.content.chars().take(EMBED_TITLE_LIMIT).collect()
    };

    let mut author = EmbedAuthorBuilder::new(message.author_name.clone()).url(message.jump_url(guild_id));
    if let Some(avatar) = &message.author_avatar_url {
        author = author.icon_url(image_source(avatar)?);
    }

    let footer = EmbedFooterBuilder::new(message.timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string());

    let mut embed = EmbedBuilder::new()
        .title(title)
        .author(author.build())
        .footer(footer.build());

    let image = if message.content.starts_with("https://") {
        Some(message.content.as_str())
    } else {
        message.attachment_urls.first().map(String::as_str)
    };
    if let Some(url) = image {
        embed = embed.image(image_source(url)?);
    }

    Ok(embed.build())
}

#[async_trait]
impl SlashCommand for QuoteCommand {
    fn name(&self) -> &str {
        "quote"
    }

    fn description(&self) -> &str {
        "Responds with a random quote from #quotes"
    }

    fn required_permissions(&self) -> Permissions {
        Permissions::ADMINISTRATOR
    }

    async fn execute(
        &self,
        client: &dyn BotClient,
        interaction: &InteractionHandle,
        _events: &EventBus,
    ) -> Result<bool, Error> {
        interaction.defer(false).await?;

        let picked = match &self.channel_id {
            Some(channel_id) => self.pick_quote(client, channel_id).await,
            None => Err(Error::Config("no quotes channel configured".into())),
        };

        let reply = match picked.and_then(|m| build_quote_embed(&m, interaction.guild_id()).map(|e| (m, e))) {
            Ok((message, embed)) => {
                info!("Quoting message {} by {}", message.id, message.author_name);
                InteractionReply::embed(embed)
            }
            Err(e) => {
                error!("Error in quote command: {}", e);
                InteractionReply::text(QUOTE_FAILURE_MESSAGE)
            }
        };

        interaction.edit_reply(reply).await?;
        Ok(true)
    }
}
