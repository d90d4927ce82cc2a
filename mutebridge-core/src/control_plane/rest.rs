//! REST routes: `GET /id` and `POST /mute`.

use axum::body::Bytes;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::control_plane::responses::{no_answer, success, ControlPlaneError};
use crate::control_plane::server::ControlPlaneState;
use crate::services::member_resolver::MemberQuery;

/// Unrouted paths and wrong methods still answer in JSON.
pub async fn unknown_route(method: Method, uri: Uri) -> ControlPlaneError {
    warn!("[Route] no handler for {} {}", method, uri.path());
    ControlPlaneError::UnknownRequest(format!("{} {}", method, uri.path()))
}

#[derive(Debug, Deserialize)]
pub struct IdQuery {
    pub name: String,
    pub nick: String,
}

/// `GET /id?name=&nick=`
pub async fn get_member_id(
    State(state): State<ControlPlaneState>,
    query: Result<Query<IdQuery>, QueryRejection>,
) -> Response {
    let Query(query) = match query {
        Ok(q) => q,
        Err(rejection) => {
            warn!("[Id] bad query: {}", rejection);
            return ControlPlaneError::InvalidParams("name and nick are required".into()).into_response();
        }
    };

    let guild_id = state.settings.guild_id.as_str();
    match state
        .resolver
        .resolve_query(guild_id, &MemberQuery::by_name_and_nick(&query.name, &query.nick))
    {
        Some(found) => {
            info!("[Id][Success] {} => {}", query.name, found.id);
            Json(json!({
                "name": found.display_name,
                "nick": found.nickname,
                "id": found.id,
            }))
            .into_response()
        }
        None => {
            info!("[Id] nobody matches name={:?} nick={:?}", query.name, query.nick);
            (StatusCode::NOT_FOUND, Json(no_answer())).into_response()
        }
    }
}

/// One validated item of a `POST /mute` body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MuteRequest {
    pub member_id: String,
    pub mute: bool,
}

impl MuteRequest {
    /// `{ "id": "<digits>", "status": <bool> }`
    pub fn from_value(item: &Value) -> Result<Self, ControlPlaneError> {
        let id = item.get("id").and_then(Value::as_str);
        let status = item.get("status").and_then(Value::as_bool);
        match (id, status) {
            (Some(id), Some(mute)) if is_snowflake_shaped(id) => Ok(Self {
                member_id: id.to_string(),
                mute,
            }),
            _ => Err(ControlPlaneError::InvalidParams(format!(
                "expected {{id: <numeric string>, status: <bool>}}, got {}",
                item
            ))),
        }
    }
}

fn is_snowflake_shaped(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_digit())
}

/// `POST /mute` with a single object or an ordered list.
///
/// Items are validated and applied one after another. The first invalid
/// item (400) or failed mute (500) ends the request; items applied before it
/// stay applied, nothing is rolled back.
pub async fn post_mute(
    State(state): State<ControlPlaneState>,
    body: Bytes,
) -> Result<Json<Value>, ControlPlaneError> {
    let parsed: Value = serde_json::from_slice(&body)
        .map_err(|e| ControlPlaneError::InvalidParams(format!("body is not JSON: {e}")))?;

    let items = match parsed {
        Value::Array(items) => items,
        item @ Value::Object(_) => vec![item],
        other => {
            return Err(ControlPlaneError::InvalidParams(format!(
                "expected an object or a list, got {other}"
            )));
        }
    };

    let guild_id = state.settings.guild_id.as_str();
    for (index, item) in items.iter().enumerate() {
        let request = MuteRequest::from_value(item).inspect_err(|e| {
            error!("[Mute][Invalid Params] item {} of {}: {}", index + 1, items.len(), e);
        })?;

        state
            .mute_bridge
            .apply_mute(guild_id, &request.member_id, request.mute)
            .await
            .map_err(|e| {
                error!("[Mute] batch aborted at item {} of {}", index + 1, items.len());
                ControlPlaneError::Transport(e.to_string())
            })?;
    }

    Ok(success())
}
