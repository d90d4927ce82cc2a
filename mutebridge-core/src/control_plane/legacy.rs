//! The original single-endpoint protocol: the request type travels in the
//! `req` header and its parameters as a JSON object in the `params` header.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Json, Response};
use serde_json::{json, Map, Value};
use tracing::{debug, error, info};

use crate::control_plane::auth::check_authorization;
use crate::control_plane::responses::{no_answer, success, ControlPlaneError};
use crate::control_plane::server::ControlPlaneState;
use crate::services::member_resolver::MatchField;

pub const REQUEST_TYPE_HEADER: &str = "req";
pub const PARAMS_HEADER: &str = "params";

/// Protocol version reported by `sync`.
pub const LEGACY_PROTOCOL_VERSION: &str = "1.3.0";

fn header_str<'h>(headers: &'h HeaderMap, name: &str) -> Option<&'h str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Handles every legacy request type. Mounted as the fallback in legacy mode
/// and at `GET /` next to the REST routes.
pub async fn handle_legacy_request(
    State(state): State<ControlPlaneState>,
    headers: HeaderMap,
) -> Response {
    if let Err(e) = check_authorization(&headers, &state.settings.api_key) {
        return e.into_response();
    }

    let req_type = header_str(&headers, REQUEST_TYPE_HEADER).unwrap_or_default().to_string();

    let params = match header_str(&headers, PARAMS_HEADER).map(serde_json::from_str::<Value>) {
        Some(Ok(Value::Object(map))) => map,
        _ => {
            error!("[Unknown Request] Unknown request \"{}\"", req_type);
            return ControlPlaneError::UnknownRequest(req_type).into_response();
        }
    };
    debug!("[Legacy] req={} params={:?}", req_type, params);

    match req_type.as_str() {
        "connect" => connect(&state, &params).unwrap_or_else(|e| e.into_legacy_response()),
        "mute" => mute(&state, &params)
            .await
            .unwrap_or_else(|e| e.into_legacy_response()),
        "keep_alive" => {
            info!("[KeepAlive][Request] {:?}", params);
            success().into_response()
        }
        "sync" => {
            info!("[Sync][Request] {:?}", params);
            Json(json!({
                "success": true,
                "version": LEGACY_PROTOCOL_VERSION,
                "debugMode": state.settings.debug_mode,
                "discordGuild": state.guild_id(),
                "discordChannel": state.settings.channel_id,
            }))
            .into_response()
        }
        _ => {
            error!("[Unknown Request] Unknown request \"{}\"", req_type);
            ControlPlaneError::UnknownRequest(req_type).into_response()
        }
    }
}

fn connect(state: &ControlPlaneState, params: &Map<String, Value>) -> Result<Response, ControlPlaneError> {
    let guild_id = state.guild_id().ok_or_else(|| {
        error!("Incoming connect request but no guild is set!");
        ControlPlaneError::GuildUnavailable
    })?;

    let tag = params
        .get("tag")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            error!("[Connect][Missing Params] no tag!");
            ControlPlaneError::InvalidParams("tag missing".into())
        })?;

    info!("[Connect][Requesting] Searching for \"{}\"", tag);
    match state.resolver.resolve(guild_id, tag, MatchField::DisplayName) {
        Some(found) => {
            info!("[Connect][Success] Connecting {} ({})", found.display_name, found.id);
            Ok(Json(json!({ "tag": found.display_name, "id": found.id })).into_response())
        }
        None => {
            error!("[Connect][Error] 0 users found with tag \"{}\".", tag);
            Ok(Json(no_answer()).into_response())
        }
    }
}

async fn mute(state: &ControlPlaneState, params: &Map<String, Value>) -> Result<Response, ControlPlaneError> {
    let guild_id = state.guild_id().ok_or_else(|| {
        error!("Mute request but not in guild!");
        ControlPlaneError::GuildUnavailable
    })?;

    let id = params.get("id");
    let mute = params.get("mute");
    let (Some(Value::String(id)), Some(Value::Bool(mute))) = (id, mute) else {
        error!("[Mute][Missing Params] id: {:?}, mute: {:?}", id, mute);
        return Err(ControlPlaneError::InvalidParams("ID or Mute value missing".into()));
    };

    state
        .mute_bridge
        .apply_mute(guild_id, id, *mute)
        .await
        .map_err(|e| ControlPlaneError::Transport(e.to_string()))?;

    Ok(success().into_response())
}
