use serde::{Deserialize, Serialize};

/// A guild member as seen through the live member cache or a REST fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRecord {
    pub id: String,            // Discord user ID as a string
    pub display_name: String,  // nickname, else global name, else username
    pub nickname: Option<String>,
}

impl MemberRecord {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>, nickname: Option<&str>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            nickname: nickname.map(str::to_string),
        }
    }
}

/// Result of a successful member lookup. Never persisted; recomputed per query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberMatch {
    pub display_name: String,
    pub nickname: Option<String>,
    pub id: String,
}

impl From<&MemberRecord> for MemberMatch {
    fn from(record: &MemberRecord) -> Self {
        Self {
            display_name: record.display_name.clone(),
            nickname: record.nickname.clone(),
            id: record.id.clone(),
        }
    }
}
