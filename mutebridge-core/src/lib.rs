// src/lib.rs

pub mod addons;
pub mod config;
pub mod control_plane;
pub mod eventbus;
pub mod platforms;
pub mod plugin;
pub mod services;

pub use mutebridge_common::error::Error;
pub use plugin::{BridgePlugin, PluginExit};
