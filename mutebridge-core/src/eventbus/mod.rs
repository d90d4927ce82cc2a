//! src/eventbus/mod.rs
//!
//! In-process publish/subscribe bus that connects the bot to its host
//! process. Every subscriber owns a bounded MPSC queue, so delivery is
//! FIFO per subscriber and nothing is dropped while the subscriber lives.

use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};
use tracing::trace;

pub const RESTART_REQUESTED: &str = "restart.requested";
pub const VERSION_REQUESTED: &str = "version.requested";
pub const VERSION: &str = "version";

/// Signals exchanged between the bot and the host process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeEvent {
    /// Someone asked the host to restart us (`/restart`).
    RestartRequested { requested_by: Option<String> },

    /// Ask the host to announce its version; answered with `Version`.
    VersionRequested,

    /// The host's version string, shown in the bot presence.
    Version(String),
}

impl BridgeEvent {
    /// The name subscribers filter on.
    pub fn event_name(&self) -> &'static str {
        match self {
            BridgeEvent::RestartRequested { .. } => RESTART_REQUESTED,
            BridgeEvent::VersionRequested => VERSION_REQUESTED,
            BridgeEvent::Version(_) => VERSION,
        }
    }
}

struct Subscriber {
    /// `None` receives every event.
    names: Option<Vec<String>>,
    tx: mpsc::Sender<BridgeEvent>,
}

impl Subscriber {
    fn wants(&self, event: &BridgeEvent) -> bool {
        match &self.names {
            Some(names) => names.iter().any(|n| n == event.event_name()),
            None => true,
        }
    }
}

/// Each subscriber gets its own `mpsc::Sender<BridgeEvent>` for guaranteed delivery.
///
/// - If the subscriber's channel buffer fills, `publish` will await
///   until there's space (backpressure).
/// - Subscribers whose `Receiver` was dropped are pruned on the next publish.
#[derive(Clone)]
pub struct EventBus {
    subscribers: Arc<Mutex<Vec<Subscriber>>>,
    shutdown_tx: Arc<watch::Sender<bool>>,
    pub shutdown_rx: watch::Receiver<bool>,
}

const DEFAULT_BUFFER_SIZE: usize = 256;

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            subscribers: Arc::new(Mutex::new(vec![])),
            shutdown_tx: Arc::new(tx),
            shutdown_rx: rx,
        }
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    pub fn is_shutdown(&self) -> bool {
        *self.shutdown_rx.borrow()
    }

    /// Receive every event published on the bus.
    pub async fn subscribe(&self, buffer_size: Option<usize>) -> mpsc::Receiver<BridgeEvent> {
        self.add_subscriber(None, buffer_size).await
    }

    /// Receive only the events whose `event_name()` is listed.
    pub async fn subscribe_to(
        &self,
        names: &[&str],
        buffer_size: Option<usize>,
    ) -> mpsc::Receiver<BridgeEvent> {
        let names = names.iter().map(|n| n.to_string()).collect();
        self.add_subscriber(Some(names), buffer_size).await
    }

    async fn add_subscriber(
        &self,
        names: Option<Vec<String>>,
        buffer_size: Option<usize>,
    ) -> mpsc::Receiver<BridgeEvent> {
        let size = buffer_size.unwrap_or(DEFAULT_BUFFER_SIZE);
        let (tx, rx) = mpsc::channel(size);
        let mut subs = self.subscribers.lock().await;
        subs.push(Subscriber { names, tx });
        rx
    }

    /// Publish an event to all interested subscribers.
    pub async fn publish(&self, event: BridgeEvent) {
        let senders: Vec<mpsc::Sender<BridgeEvent>> = {
            let mut subs = self.subscribers.lock().await;
            subs.retain(|s| !s.tx.is_closed());
            subs.iter()
                .filter(|s| s.wants(&event))
                .map(|s| s.tx.clone())
                .collect()
        };
        trace!("(EventBus) publishing '{}' to {} subscriber(s)", event.event_name(), senders.len());
        for s in senders {
            let _ = s.send(event.clone()).await;
        }
    }
}
