//! addons/registry.rs
//!
//! Contains the `AddonRegistry`: the set of loaded addons keyed by name,
//! their lifecycle state, and the start/stop plumbing.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use mutebridge_common::traits::BotClient;

use crate::addons::addon::{Addon, AddonState};
use crate::Error;

struct AddonEntry {
    addon: Arc<dyn Addon>,
    state: AddonState,
}

/// Owns the running addons. Cloning shares the same registry.
///
/// Lifecycle operations on the *same* name are expected to be serialized by
/// the caller; the registry only guarantees that a name is never registered twice.
#[derive(Clone)]
pub struct AddonRegistry {
    addons: Arc<DashMap<String, AddonEntry>>,
    client: Arc<dyn BotClient>,
}

impl AddonRegistry {
    pub fn new(client: Arc<dyn BotClient>) -> Self {
        Self {
            addons: Arc::new(DashMap::new()),
            client,
        }
    }

    /// Registers the addon and starts it in the background.
    ///
    /// Start failures are logged, never returned: the returned handle only
    /// resolves once the start attempt is over. An addon whose start fails is
    /// stopped and removed again, so `Running` always means a confirmed start.
    ///
    /// Returns `Error::Addon` if an addon with the same name is already registered.
    pub fn load(&self, addon: Arc<dyn Addon>) -> Result<JoinHandle<()>, Error> {
        let name = addon.name().to_string();
        match self.addons.entry(name.clone()) {
            Entry::Occupied(_) => {
                warn!("Addon '{}' is already loaded => ignoring duplicate", name);
                return Err(Error::Addon(format!("Addon '{}' is already loaded", name)));
            }
            Entry::Vacant(slot) => {
                slot.insert(AddonEntry {
                    addon: addon.clone(),
                    state: AddonState::Loading,
                });
            }
        }

        debug!("Addon '{}' starting!", name);
        let registry = self.clone();
        Ok(tokio::spawn(async move {
            registry.start_addon(addon).await;
        }))
    }

    /// Loads addons in declaration order; each one starts independently.
    pub fn load_all(&self, addons: Vec<Arc<dyn Addon>>) -> Vec<JoinHandle<()>> {
        addons
            .into_iter()
            .filter_map(|addon| self.load(addon).ok())
            .collect()
    }

    async fn start_addon(&self, addon: Arc<dyn Addon>) {
        let name = addon.name().to_string();
        match addon.start(self.client.clone()).await {
            Ok(()) => {
                if self.transition(&addon, AddonState::Running) {
                    info!("Addon '{}' started!", name);
                } else {
                    // Unloaded while we were starting; don't leave it running.
                    warn!("Addon '{}' was unloaded during start => stopping it", name);
                    if let Err(e) = addon.stop().await {
                        error!("Addon '{}' failed stopping => {}", name, e);
                    }
                }
            }
            Err(e) => {
                error!("Addon '{}' failed starting => {}", name, e);
                self.addons
                    .remove_if(&name, |_, entry| Arc::ptr_eq(&entry.addon, &addon));
                if let Err(e) = addon.stop().await {
                    error!("Addon '{}' failed cleaning up after start failure => {}", name, e);
                }
            }
        }
    }

    /// Sets the state if `addon` is still the registered instance for its name.
    fn transition(&self, addon: &Arc<dyn Addon>, state: AddonState) -> bool {
        match self.addons.get_mut(addon.name()) {
            Some(mut entry) if Arc::ptr_eq(&entry.addon, addon) => {
                entry.state = state;
                true
            }
            _ => false,
        }
    }

    /// Stops the addon, then removes it from the registry if present.
    /// Unloading an addon that was never loaded still calls `stop`.
    pub async fn unload(&self, addon: &Arc<dyn Addon>) {
        let name = addon.name().to_string();
        debug!("Unloading addon '{}' (registered: {})", name, self.contains(&name));
        self.transition(addon, AddonState::Stopping);

        if let Err(e) = addon.stop().await {
            error!("Addon '{}' failed stopping => {}", name, e);
        }

        if self
            .addons
            .remove_if(&name, |_, entry| Arc::ptr_eq(&entry.addon, addon))
            .is_some()
        {
            info!("Addon '{}' unloaded!", name);
        }
    }

    /// Unloads the addon registered under `name`, if any.
    pub async fn unload_by_name(&self, name: &str) -> bool {
        let addon = self.addons.get(name).map(|entry| entry.addon.clone());
        match addon {
            Some(addon) => {
                self.unload(&addon).await;
                true
            }
            None => false,
        }
    }

    /// Unloads every registered addon.
    pub async fn unload_all(&self) {
        let addons: Vec<Arc<dyn Addon>> = self
            .addons
            .iter()
            .map(|entry| entry.value().addon.clone())
            .collect();
        for addon in addons {
            self.unload(&addon).await;
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.addons.contains_key(name)
    }

    /// Lifecycle state of `name`; `Unloaded` when it is not registered.
    pub fn state(&self, name: &str) -> AddonState {
        self.addons
            .get(name)
            .map(|entry| entry.state)
            .unwrap_or(AddonState::Unloaded)
    }

    pub fn names(&self) -> Vec<String> {
        self.addons.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.addons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addons.is_empty()
    }
}
