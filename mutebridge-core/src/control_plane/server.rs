use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use axum_server::Handle;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use mutebridge_common::traits::BotClient;

use crate::addons::Addon;
use crate::config::{MuteBridgeSettings, ProtocolMode};
use crate::control_plane::{auth, legacy, rest};
use crate::services::member_resolver::MemberResolver;
use crate::services::mute_bridge::MuteBridge;
use crate::Error;

/// Shared state for every control-plane route.
#[derive(Clone)]
pub struct ControlPlaneState {
    pub client: Arc<dyn BotClient>,
    pub resolver: MemberResolver,
    pub mute_bridge: MuteBridge,
    pub settings: Arc<MuteBridgeSettings>,
}

impl ControlPlaneState {
    pub fn new(client: Arc<dyn BotClient>, settings: Arc<MuteBridgeSettings>) -> Self {
        Self {
            resolver: MemberResolver::new(client.clone()),
            mute_bridge: MuteBridge::new(client.clone()),
            client,
            settings,
        }
    }

    /// The configured guild, if the gateway has it cached.
    pub fn guild_id(&self) -> Option<&str> {
        let guild_id = self.settings.guild_id.as_str();
        self.client.guild_available(guild_id).then_some(guild_id)
    }
}

/// Builds the HTTP surface for the configured protocol.
pub fn build_router(state: ControlPlaneState) -> Router {
    let router = match state.settings.protocol {
        ProtocolMode::Legacy => Router::new().fallback(legacy::handle_legacy_request),
        ProtocolMode::Rest => {
            let mut router = Router::new()
                .route("/id", get(rest::get_member_id))
                .route("/mute", post(rest::post_mute));
            if state.settings.legacy_compat {
                router = router.route("/", get(legacy::handle_legacy_request));
            }
            router
                .fallback(rest::unknown_route)
                .method_not_allowed_fallback(rest::unknown_route)
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth::require_guild_and_auth,
                ))
        }
    };

    router
        .with_state(state)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}

pub const MUTE_BRIDGE_ADDON_NAME: &str = "TTT Muter";

/// Runs the control plane as an addon: one listener, opened on start and
/// shut down on stop.
pub struct MuteBridgeAddon {
    settings: Arc<MuteBridgeSettings>,
    handle: Mutex<Option<Handle>>,
}

impl MuteBridgeAddon {
    pub fn new(settings: MuteBridgeSettings) -> Self {
        Self {
            settings: Arc::new(settings),
            handle: Mutex::new(None),
        }
    }

    pub fn settings(&self) -> &MuteBridgeSettings {
        &self.settings
    }

    /// Address actually bound, once the listener is up.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        let handle = self.handle.lock().ok()?.clone()?;
        handle.listening().await
    }

    fn take_handle(&self) -> Option<Handle> {
        match self.handle.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }
    }
}

#[async_trait]
impl Addon for MuteBridgeAddon {
    fn name(&self) -> &str {
        MUTE_BRIDGE_ADDON_NAME
    }

    fn description(&self) -> &str {
        "Mutes People."
    }

    async fn start(&self, client: Arc<dyn BotClient>) -> Result<(), Error> {
        let mut slot = self
            .handle
            .lock()
            .map_err(|_| Error::Addon("mute bridge handle lock poisoned".into()))?;
        if slot.is_some() {
            return Err(Error::Addon("mute bridge listener is already running".into()));
        }

        let addr = self.settings.listen_addr();
        // Bind up front so a busy port is a start failure, not a background log line.
        let listener = std::net::TcpListener::bind(addr)?;
        listener.set_nonblocking(true)?;

        let state = ControlPlaneState::new(client.clone(), self.settings.clone());
        let app = build_router(state);

        let handle = Handle::new();
        let server = axum_server::from_tcp(listener)
            .handle(handle.clone())
            .serve(app.into_make_service());
        tokio::spawn(async move {
            if let Err(e) = server.await {
                error!("Mute bridge server error: {}", e);
            }
            info!("Mute bridge server shut down.");
        });

        *slot = Some(handle);
        info!(
            "Bot endpoint is running on port {} ({:?} protocol, legacy compat: {})",
            self.settings.port, self.settings.protocol, self.settings.legacy_compat
        );

        if !client.guild_available(&self.settings.guild_id) {
            warn!(
                "Guild {} is not cached yet; requests will be answered with 500 until it is",
                self.settings.guild_id
            );
        }
        Ok(())
    }

    async fn stop(&self) -> Result<(), Error> {
        if let Some(handle) = self.take_handle() {
            handle.graceful_shutdown(None);
            info!("Mute bridge listener on port {} stopping", self.settings.port);
        }
        Ok(())
    }
}
