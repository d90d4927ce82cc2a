//! control_plane/mod.rs
//!
//! Authenticated HTTP surface through which the game server resolves players
//! and mutes/unmutes them. Speaks the legacy header protocol and the REST one.

pub mod auth;
pub mod legacy;
pub mod responses;
pub mod rest;
pub mod server;

pub use responses::ControlPlaneError;
pub use server::{build_router, ControlPlaneState, MuteBridgeAddon, MUTE_BRIDGE_ADDON_NAME};
