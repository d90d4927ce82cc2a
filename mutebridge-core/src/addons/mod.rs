//! addons/mod.rs
//!
//! Feature modules started against the shared client once the gateway is ready.

pub mod addon;
pub mod builtin;
pub mod registry;

pub use addon::{Addon, AddonState};
pub use builtin::{builtin_addons, BuiltinAddon};
pub use registry::AddonRegistry;
