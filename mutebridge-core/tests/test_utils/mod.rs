// File: mutebridge-core/tests/test_utils/mod.rs
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use twilight_model::id::marker::InteractionMarker;
use twilight_model::id::Id;

use mutebridge_common::models::{HistoryMessage, InitialResponse, InteractionReply, MemberRecord};
use mutebridge_common::traits::{BotClient, InteractionResponder};
use mutebridge_core::config::{MuteBridgeSettings, ProtocolMode};
use mutebridge_core::Error;

pub const GUILD_ID: &str = "111111111111111111";
pub const API_KEY: &str = "s3cr3t-key";

/// In-memory guild: a member list, voice-mute state and scripted failures.
#[derive(Default)]
pub struct FakeBotClient {
    pub guild_available: bool,
    pub members: Vec<MemberRecord>,
    pub muted: Mutex<HashMap<String, bool>>,
    /// Every `set_voice_mute` call, in order.
    pub mute_calls: Mutex<Vec<(String, bool, Option<String>)>>,
    /// Member IDs whose mutation fails with a platform error.
    pub failing_members: HashSet<String>,
    pub history: Vec<HistoryMessage>,
    pub fail_history: bool,
}

impl FakeBotClient {
    pub fn with_members(members: Vec<MemberRecord>) -> Self {
        Self {
            guild_available: true,
            members,
            ..Default::default()
        }
    }

    pub fn is_muted(&self, member_id: &str) -> Option<bool> {
        self.muted.lock().unwrap().get(member_id).copied()
    }

    pub fn mute_call_count(&self) -> usize {
        self.mute_calls.lock().unwrap().len()
    }
}

#[async_trait]
impl BotClient for FakeBotClient {
    fn guild_available(&self, guild_id: &str) -> bool {
        self.guild_available && guild_id == GUILD_ID
    }

    fn cached_members(&self, guild_id: &str) -> Vec<MemberRecord> {
        if self.guild_available(guild_id) {
            self.members.clone()
        } else {
            Vec::new()
        }
    }

    async fn fetch_member(&self, _guild_id: &str, member_id: &str) -> Result<MemberRecord, Error> {
        // IDs outside `members` still exist; they just aren't cached.
        Ok(self
            .members
            .iter()
            .find(|m| m.id == member_id)
            .cloned()
            .unwrap_or_else(|| MemberRecord::new(member_id, format!("user-{member_id}"), None)))
    }

    async fn set_voice_mute(
        &self,
        _guild_id: &str,
        member_id: &str,
        mute: bool,
        reason: Option<&str>,
    ) -> Result<(), Error> {
        self.mute_calls
            .lock()
            .unwrap()
            .push((member_id.to_string(), mute, reason.map(str::to_string)));
        if self.failing_members.contains(member_id) {
            return Err(Error::Platform(format!("Missing Permissions for {member_id}")));
        }
        self.muted.lock().unwrap().insert(member_id.to_string(), mute);
        Ok(())
    }

    async fn channel_messages(
        &self,
        _channel_id: &str,
        before: Option<&str>,
        limit: u16,
    ) -> Result<Vec<HistoryMessage>, Error> {
        if self.fail_history {
            return Err(Error::Platform("You are being rate limited.".into()));
        }
        let start = match before {
            Some(id) => self
                .history
                .iter()
                .position(|m| m.id == id)
                .map_or(self.history.len(), |p| p + 1),
            None => 0,
        };
        Ok(self
            .history
            .iter()
            .skip(start)
            .take(usize::from(limit))
            .cloned()
            .collect())
    }
}

/// What a responder was asked to send.
#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Reply(InteractionReply),
    Defer { ephemeral: bool },
    Edit(InteractionReply),
}

/// Records responses and, like the platform, refuses a second initial response.
#[derive(Default)]
pub struct FakeResponder {
    pub sent: Mutex<Vec<Sent>>,
}

impl FakeResponder {
    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl InteractionResponder for FakeResponder {
    async fn create_response(
        &self,
        _interaction_id: Id<InteractionMarker>,
        _token: &str,
        response: &InitialResponse,
    ) -> Result<(), Error> {
        let mut sent = self.sent.lock().unwrap();
        if sent
            .iter()
            .any(|s| matches!(s, Sent::Reply(_) | Sent::Defer { .. }))
        {
            return Err(Error::Platform("Interaction has already been acknowledged.".into()));
        }
        sent.push(match response {
            InitialResponse::Message(reply) => Sent::Reply(reply.clone()),
            InitialResponse::Deferred { ephemeral } => Sent::Defer { ephemeral: *ephemeral },
        });
        Ok(())
    }

    async fn edit_response(&self, _token: &str, reply: &InteractionReply) -> Result<(), Error> {
        self.sent.lock().unwrap().push(Sent::Edit(reply.clone()));
        Ok(())
    }
}

pub fn bridge_settings(protocol: ProtocolMode) -> MuteBridgeSettings {
    MuteBridgeSettings {
        api_key: API_KEY.to_string(),
        guild_id: GUILD_ID.to_string(),
        channel_id: "222222222222222222".to_string(),
        port: 37405,
        bind_ip: "127.0.0.1".parse().unwrap(),
        protocol,
        legacy_compat: true,
        debug_mode: false,
    }
}

pub fn member(id: &str, display_name: &str, nick: Option<&str>) -> MemberRecord {
    MemberRecord::new(id, display_name, nick)
}

pub fn shared(client: FakeBotClient) -> Arc<FakeBotClient> {
    Arc::new(client)
}
