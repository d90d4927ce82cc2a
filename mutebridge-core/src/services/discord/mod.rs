pub mod interaction_handle;
pub mod interaction_router;
pub mod slashcommands;

pub use interaction_handle::{InteractionHandle, ReplyState};
pub use interaction_router::{InteractionRouter, RouteOutcome};
pub use slashcommands::{builtin_commands, BuiltinCommand, CommandRegistry, SlashCommand};
