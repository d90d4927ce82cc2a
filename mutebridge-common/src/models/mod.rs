// File: mutebridge-common/src/models/mod.rs
pub mod member;
pub mod interaction;
pub mod history;

pub use member::{MemberMatch, MemberRecord};
pub use interaction::{IncomingInteraction, InitialResponse, InteractionKind, InteractionReply};
pub use history::HistoryMessage;
