use chrono::{DateTime, Utc};

/// A message read back from a text channel's history.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryMessage {
    pub id: String,
    pub channel_id: String,
    pub content: String,
    pub author_name: String,
    pub author_avatar_url: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub is_reply: bool,
    pub is_system: bool,
    pub attachment_urls: Vec<String>,
}

impl HistoryMessage {
    /// Link that opens the message in the client.
    pub fn jump_url(&self, guild_id: Option<&str>) -> String {
        format!(
            "https://discord.com/channels/{}/{}/{}",
            guild_id.unwrap_or("@me"),
            self.channel_id,
            self.id
        )
    }
}
