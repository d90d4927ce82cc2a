
// File: src/services/mod.rs

pub mod discord;
pub mod member_resolver;
pub mod mute_bridge;

pub use member_resolver::{MatchField, MemberQuery, MemberResolver};
pub use mute_bridge::MuteBridge;
