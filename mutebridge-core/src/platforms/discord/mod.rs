pub mod runtime;

pub use runtime::{version_presence, DiscordRuntime, GatewayEvent, ShardSet};
