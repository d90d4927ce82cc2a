use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use twilight_cache_inmemory::{InMemoryCache, ResourceType};
use twilight_gateway::{
    self as gateway, CloseFrame, Config, Event, EventTypeFlags, Intents, MessageSender, Shard,
    StreamExt,
};
use twilight_http::client::ClientBuilder;
use twilight_http::request::AuditLogReason;
use twilight_http::Client as HttpClient;
use twilight_model::application::command::Command;
use twilight_model::channel::message::{Message, MessageFlags, MessageType};
use twilight_model::gateway::payload::outgoing::UpdatePresence;
use twilight_model::gateway::presence::{ActivityType, MinimalActivity, Status};
use twilight_model::guild::Member;
use twilight_model::http::interaction::{InteractionResponse, InteractionResponseData, InteractionResponseType};
use twilight_model::id::marker::{ApplicationMarker, InteractionMarker};
use twilight_model::id::Id;
use twilight_model::user::User;

use mutebridge_common::models::{
    HistoryMessage, IncomingInteraction, InitialResponse, InteractionReply, MemberRecord,
};
use mutebridge_common::traits::{BotClient, CommandRegistrar, InteractionResponder};

use crate::Error;

/// What the shard runners forward to the plugin.
#[derive(Debug, Clone)]
pub enum GatewayEvent {
    Ready { user_name: String },
    Interaction(IncomingInteraction),
}

fn parse_id<T>(raw: &str, what: &str) -> Result<Id<T>, Error> {
    raw.parse::<u64>()
        .ok()
        .and_then(Id::new_checked)
        .ok_or_else(|| Error::Parse(format!("invalid {what} id '{raw}'")))
}

fn platform_err(context: &str) -> impl Fn(twilight_http::Error) -> Error + '_ {
    move |e| Error::Platform(format!("{context}: {e}"))
}

fn display_name(user: &User, nick: Option<&str>) -> String {
    nick.or(user.global_name.as_deref())
        .unwrap_or(&user.name)
        .to_string()
}

fn avatar_url(user: &User) -> Option<String> {
    user.avatar
        .map(|hash| format!("https://cdn.discordapp.com/avatars/{}/{}.png", user.id, hash))
}

fn member_record(member: &Member) -> MemberRecord {
    MemberRecord::new(
        member.user.id.to_string(),
        display_name(&member.user, member.nick.as_deref()),
        member.nick.as_deref(),
    )
}

fn history_message(message: Message) -> Result<HistoryMessage, Error> {
    let timestamp = DateTime::<Utc>::from_timestamp_micros(message.timestamp.as_micros())
        .ok_or_else(|| Error::Parse(format!("message {} has an invalid timestamp", message.id)))?;
    Ok(HistoryMessage {
        id: message.id.to_string(),
        channel_id: message.channel_id.to_string(),
        author_avatar_url: avatar_url(&message.author),
        author_name: message.author.name.clone(),
        timestamp,
        is_reply: message.kind == MessageType::Reply,
        is_system: !matches!(
            message.kind,
            MessageType::Regular
                | MessageType::Reply
                | MessageType::ChatInputCommand
                | MessageType::ContextMenuCommand
        ),
        attachment_urls: message.attachments.into_iter().map(|a| a.url).collect(),
        content: message.content,
    })
}

fn response_data(reply: &InteractionReply) -> InteractionResponseData {
    InteractionResponseData {
        content: reply.content.clone(),
        embeds: (!reply.embeds.is_empty()).then(|| reply.embeds.clone()),
        flags: reply.ephemeral.then_some(MessageFlags::EPHEMERAL),
        ..Default::default()
    }
}

/// Presence shown while the bot is online: streaming "Version <v>".
pub fn version_presence(version: &str, url: &str) -> Result<UpdatePresence, Error> {
    let activity = MinimalActivity {
        kind: ActivityType::Streaming,
        name: format!("Version {version}"),
        url: Some(url.to_string()),
    };
    UpdatePresence::new(vec![activity.into()], false, None, Status::Online)
        .map_err(|e| Error::Platform(format!("invalid presence: {e}")))
}

/// REST client plus the gateway-fed cache; the real `BotClient`.
pub struct DiscordRuntime {
    http: Arc<HttpClient>,
    cache: Arc<InMemoryCache>,
    application_id: Id<ApplicationMarker>,
    token: String,
}

impl DiscordRuntime {
    pub fn new(token: &str, client_id: &str) -> Result<Self, Error> {
        let http = ClientBuilder::new()
            .token(token.to_string())
            .timeout(Duration::from_secs(30))
            .build();

        let cache = InMemoryCache::builder()
            .resource_types(
                ResourceType::GUILD
                    | ResourceType::MEMBER
                    | ResourceType::USER
                    | ResourceType::VOICE_STATE,
            )
            .build();

        Ok(Self {
            http: Arc::new(http),
            cache: Arc::new(cache),
            application_id: parse_id(client_id, "application")?,
            token: token.to_string(),
        })
    }

    /// Opens the recommended number of shards and spawns a runner for each.
    pub async fn connect_gateway(&self) -> Result<(ShardSet, UnboundedReceiver<GatewayEvent>), Error> {
        let (tx, rx) = unbounded_channel::<GatewayEvent>();
        let config = Config::new(
            self.token.clone(),
            Intents::GUILDS | Intents::GUILD_VOICE_STATES,
        );

        let shards = gateway::create_recommended(&self.http, config, |_, b| b.build())
            .await
            .map_err(|e| Error::Platform(format!("create_recommended error: {e}")))?;

        let mut set = ShardSet {
            senders: Vec::new(),
            tasks: Vec::new(),
        };
        for shard in shards {
            set.senders.push(shard.sender());
            let tx_for_shard = tx.clone();
            let cache_for_shard = self.cache.clone();
            set.tasks.push(tokio::spawn(async move {
                shard_runner(shard, cache_for_shard, tx_for_shard).await;
            }));
        }
        info!("(DiscordRuntime) {} shard(s) started", set.senders.len());
        Ok((set, rx))
    }
}

/// The running shards.
pub struct ShardSet {
    senders: Vec<MessageSender>,
    tasks: Vec<JoinHandle<()>>,
}

impl ShardSet {
    pub fn update_presence(&self, presence: &UpdatePresence) {
        for sender in &self.senders {
            if let Err(e) = sender.command(presence) {
                warn!("Failed updating presence => {e:?}");
            }
        }
    }

    /// Closes every shard and waits for its runner to finish.
    pub async fn close(self) {
        for sender in &self.senders {
            let _ = sender.close(CloseFrame::NORMAL);
        }
        for task in self.tasks {
            let _ = task.await;
        }
    }
}

/// Updates the cache from every event and forwards the ones the bot reacts to.
async fn shard_runner(mut shard: Shard, cache: Arc<InMemoryCache>, tx: UnboundedSender<GatewayEvent>) {
    let shard_id = shard.id().number();
    info!("(ShardRunner) Shard {shard_id} started. Listening for events.");

    while let Some(item) = shard.next_event(EventTypeFlags::all()).await {
        let event = match item {
            Ok(event) => event,
            Err(err) => {
                error!("Shard {shard_id} => error receiving event: {err:?}");
                continue;
            }
        };
        cache.update(&event);

        let forwarded = match &event {
            Event::Ready(ready) => {
                info!("Shard {shard_id} => READY as {} (ID={})", ready.user.name, ready.user.id);
                Some(GatewayEvent::Ready {
                    user_name: ready.user.name.clone(),
                })
            }
            Event::InteractionCreate(create) => {
                Some(GatewayEvent::Interaction(IncomingInteraction::from(&create.0)))
            }
            Event::GatewayClose(frame) => {
                debug!("Shard {shard_id} => closed: {frame:?}");
                None
            }
            _ => {
                trace!("Shard {shard_id} => unhandled event: {:?}", event.kind());
                None
            }
        };

        if let Some(forwarded) = forwarded {
            if tx.send(forwarded).is_err() {
                debug!("Shard {shard_id} => receiver dropped, stopping runner");
                break;
            }
        }
    }

    warn!("(ShardRunner) Shard {shard_id} event loop ended.");
}

#[async_trait]
impl BotClient for DiscordRuntime {
    fn guild_available(&self, guild_id: &str) -> bool {
        parse_id(guild_id, "guild")
            .map(|id| self.cache.guild(id).is_some())
            .unwrap_or(false)
    }

    fn cached_members(&self, guild_id: &str) -> Vec<MemberRecord> {
        let Ok(guild) = parse_id(guild_id, "guild") else {
            return Vec::new();
        };
        let user_ids: Vec<_> = match self.cache.guild_members(guild) {
            Some(ids) => ids.iter().copied().collect(),
            None => return Vec::new(),
        };

        user_ids
            .into_iter()
            .filter_map(|user_id| {
                let nick = self.cache.member(guild, user_id)?.nick().map(str::to_string);
                let user = self.cache.user(user_id)?;
                Some(MemberRecord::new(
                    user_id.to_string(),
                    display_name(&user, nick.as_deref()),
                    nick.as_deref(),
                ))
            })
            .collect()
    }

    async fn fetch_member(&self, guild_id: &str, member_id: &str) -> Result<MemberRecord, Error> {
        let member = self
            .http
            .guild_member(parse_id(guild_id, "guild")?, parse_id(member_id, "member")?)
            .await
            .map_err(platform_err("fetching member"))?
            .model()
            .await
            .map_err(|e| Error::Platform(format!("decoding member: {e}")))?;
        Ok(member_record(&member))
    }

    async fn set_voice_mute(
        &self,
        guild_id: &str,
        member_id: &str,
        mute: bool,
        reason: Option<&str>,
    ) -> Result<(), Error> {
        let guild = parse_id(guild_id, "guild")?;
        let user = parse_id(member_id, "member")?;
        let request = self.http.update_guild_member(guild, user).mute(mute);
        let result = match reason {
            Some(reason) => request.reason(reason).await,
            None => request.await,
        };
        result.map_err(platform_err("updating voice mute"))?;
        Ok(())
    }

    async fn channel_messages(
        &self,
        channel_id: &str,
        before: Option<&str>,
        limit: u16,
    ) -> Result<Vec<HistoryMessage>, Error> {
        let channel = parse_id(channel_id, "channel")?;
        let request = self.http.channel_messages(channel).limit(limit);
        let response = match before {
            Some(before) => request.before(parse_id(before, "message")?).await,
            None => request.await,
        }
        .map_err(platform_err("fetching channel history"))?;

        let messages = response
            .models()
            .await
            .map_err(|e| Error::Platform(format!("decoding channel history: {e}")))?;
        messages.into_iter().map(history_message).collect()
    }
}

#[async_trait]
impl InteractionResponder for DiscordRuntime {
    async fn create_response(
        &self,
        interaction_id: Id<InteractionMarker>,
        token: &str,
        response: &InitialResponse,
    ) -> Result<(), Error> {
        let response = match response {
            InitialResponse::Message(reply) => InteractionResponse {
                kind: InteractionResponseType::ChannelMessageWithSource,
                data: Some(response_data(reply)),
            },
            InitialResponse::Deferred { ephemeral } => InteractionResponse {
                kind: InteractionResponseType::DeferredChannelMessageWithSource,
                data: ephemeral.then(|| InteractionResponseData {
                    flags: Some(MessageFlags::EPHEMERAL),
                    ..Default::default()
                }),
            },
        };

        self.http
            .interaction(self.application_id)
            .create_response(interaction_id, token, &response)
            .await
            .map_err(platform_err("creating interaction response"))?;
        Ok(())
    }

    async fn edit_response(&self, token: &str, reply: &InteractionReply) -> Result<(), Error> {
        self.http
            .interaction(self.application_id)
            .update_response(token)
            .content(reply.content.as_deref())
            .embeds(Some(reply.embeds.as_slice()))
            .await
            .map_err(platform_err("editing interaction response"))?;
        Ok(())
    }
}

#[async_trait]
impl CommandRegistrar for DiscordRuntime {
    async fn set_guild_commands(&self, guild_id: &str, commands: &[Command]) -> Result<(), Error> {
        self.http
            .interaction(self.application_id)
            .set_guild_commands(parse_id(guild_id, "guild")?, commands)
            .await
            .map_err(platform_err("registering guild commands"))?;
        Ok(())
    }
}
