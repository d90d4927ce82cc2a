use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderMap, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::error;

use crate::control_plane::responses::ControlPlaneError;
use crate::control_plane::server::ControlPlaneState;

/// Literal comparison against `Basic <secret>`; the secret is not base64 user:pass.
pub fn is_authorized(headers: &HeaderMap, api_key: &str) -> bool {
    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    match presented {
        Some(value) => value
            .strip_prefix("Basic ")
            .is_some_and(|secret| secret == api_key),
        None => false,
    }
}

pub fn check_authorization(headers: &HeaderMap, api_key: &str) -> Result<(), ControlPlaneError> {
    if is_authorized(headers, api_key) {
        return Ok(());
    }
    if headers.contains_key(header::AUTHORIZATION) {
        error!("[Authorization Error] presented credential does not match");
    } else {
        error!("[Authorization Error] no Authorization header");
    }
    Err(ControlPlaneError::AuthorizationMismatch)
}

/// Runs before every REST route: the guild must be in the cache, then the
/// caller must present the shared secret.
pub async fn require_guild_and_auth(
    State(state): State<ControlPlaneState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if state.guild_id().is_none() {
        error!(
            "Incoming {} {} but guild {} is not available!",
            request.method(),
            request.uri().path(),
            state.settings.guild_id
        );
        return ControlPlaneError::GuildUnavailable.into_response();
    }

    if let Err(e) = check_authorization(request.headers(), &state.settings.api_key) {
        return e.into_response();
    }

    next.run(request).await
}
