use std::sync::Arc;

use tracing::debug;

use mutebridge_common::models::{MemberMatch, MemberRecord};
use mutebridge_common::traits::BotClient;

/// Which member field a single-string query is compared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchField {
    DisplayName,
    Nickname,
    Either,
}

/// Search terms. Empty terms are treated as absent, otherwise every
/// member would "contain" them.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemberQuery<'a> {
    pub display_name: Option<&'a str>,
    pub nickname: Option<&'a str>,
}

impl<'a> MemberQuery<'a> {
    pub fn new(query: &'a str, field: MatchField) -> Self {
        match field {
            MatchField::DisplayName => Self { display_name: Some(query), nickname: None },
            MatchField::Nickname => Self { display_name: None, nickname: Some(query) },
            MatchField::Either => Self { display_name: Some(query), nickname: Some(query) },
        }
    }

    /// Separate terms per field, as sent to `GET /id?name=&nick=`.
    pub fn by_name_and_nick(name: &'a str, nick: &'a str) -> Self {
        Self { display_name: Some(name), nickname: Some(nick) }
    }

    fn display_term(&self) -> Option<&'a str> {
        self.display_name.filter(|q| !q.is_empty())
    }

    fn nick_term(&self) -> Option<&'a str> {
        self.nickname.filter(|q| !q.is_empty())
    }
}

/// Finds a member by precedence:
///
/// 1. exact (case-sensitive) display name
/// 2. exact nickname
/// 3. display name containing the query, case-insensitive
/// 4. nickname containing the query, case-insensitive
///
/// Each rule is tried against the whole member list before the next one,
/// and within a rule the first member in `members` order wins.
pub fn resolve_member(members: &[MemberRecord], query: &MemberQuery<'_>) -> Option<MemberMatch> {
    let display = query.display_term();
    let nick = query.nick_term();
    let display_lower = display.map(str::to_lowercase);
    let nick_lower = nick.map(str::to_lowercase);

    let exact_display = |m: &MemberRecord| display.is_some_and(|q| m.display_name == q);
    let exact_nick = |m: &MemberRecord| {
        nick.is_some_and(|q| m.nickname.as_deref() == Some(q))
    };
    let contains_display = |m: &MemberRecord| {
        display_lower
            .as_deref()
            .is_some_and(|q| m.display_name.to_lowercase().contains(q))
    };
    let contains_nick = |m: &MemberRecord| {
        nick_lower.as_deref().is_some_and(|q| {
            m.nickname
                .as_deref()
                .is_some_and(|n| n.to_lowercase().contains(q))
        })
    };

    let rules: [&dyn Fn(&MemberRecord) -> bool; 4] =
        [&exact_display, &exact_nick, &contains_display, &contains_nick];

    rules
        .iter()
        .find_map(|rule| members.iter().find(|m| rule(*m)))
        .map(MemberMatch::from)
}

/// Resolves names against a guild's live member cache. Read-only; the cache
/// is only ever written by the gateway connection.
#[derive(Clone)]
pub struct MemberResolver {
    client: Arc<dyn BotClient>,
}

impl MemberResolver {
    pub fn new(client: Arc<dyn BotClient>) -> Self {
        Self { client }
    }

    pub fn resolve(&self, guild_id: &str, query: &str, field: MatchField) -> Option<MemberMatch> {
        self.resolve_query(guild_id, &MemberQuery::new(query, field))
    }

    pub fn resolve_query(&self, guild_id: &str, query: &MemberQuery<'_>) -> Option<MemberMatch> {
        let members = self.client.cached_members(guild_id);
        let found = resolve_member(&members, query);
        debug!(
            "MemberResolver: {:?} among {} cached member(s) => {:?}",
            query,
            members.len(),
            found.as_ref().map(|m| m.id.as_str())
        );
        found
    }
}
