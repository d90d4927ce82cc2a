// File: mutebridge-common/src/traits/mod.rs
pub mod api;

pub use api::{BotClient, CommandRegistrar, InteractionResponder};
