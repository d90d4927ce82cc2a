use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::{json, Value};
use thiserror::Error;

/// Failures the control plane reports to its HTTP callers.
#[derive(Debug, Error)]
pub enum ControlPlaneError {
    #[error("Authorization mismatch")]
    AuthorizationMismatch,

    #[error("Guild not available")]
    GuildUnavailable,

    #[error("{0}")]
    InvalidParams(String),

    #[error("Unknown request \"{0}\"")]
    UnknownRequest(String),

    /// The Discord call itself failed.
    #[error("{0}")]
    Transport(String),
}

impl ControlPlaneError {
    pub fn error_id(&self) -> &'static str {
        match self {
            ControlPlaneError::AuthorizationMismatch => "AUTHORIZATION_MISMATCH",
            ControlPlaneError::GuildUnavailable => "GUILD_UNAVAILABLE",
            ControlPlaneError::InvalidParams(_) => "INVALID_PARAMS",
            ControlPlaneError::UnknownRequest(_) => "UNKNOWN_REQUEST",
            ControlPlaneError::Transport(_) => "DISCORD_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ControlPlaneError::AuthorizationMismatch => StatusCode::UNAUTHORIZED,
            ControlPlaneError::GuildUnavailable => StatusCode::INTERNAL_SERVER_ERROR,
            ControlPlaneError::InvalidParams(_) => StatusCode::BAD_REQUEST,
            ControlPlaneError::UnknownRequest(_) => StatusCode::NOT_FOUND,
            ControlPlaneError::Transport(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// JSON body. Failures of an attempted operation carry `success: false`.
    pub fn body(&self) -> Value {
        match self {
            ControlPlaneError::InvalidParams(_) | ControlPlaneError::Transport(_) => json!({
                "success": false,
                "errorId": self.error_id(),
                "errorMsg": self.to_string(),
            }),
            _ => json!({
                "errorId": self.error_id(),
                "errorMsg": self.to_string(),
            }),
        }
    }

    /// Legacy callers read operation failures from the body of a 200.
    pub fn into_legacy_response(self) -> Response {
        match self {
            ControlPlaneError::InvalidParams(_) | ControlPlaneError::Transport(_) => {
                (StatusCode::OK, Json(self.body())).into_response()
            }
            other => other.into_response(),
        }
    }
}

impl IntoResponse for ControlPlaneError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}

pub fn success() -> Json<Value> {
    Json(json!({ "success": true }))
}

/// "Nobody matched" answer shared by both protocols.
pub fn no_answer() -> Value {
    json!({ "answer": 0 })
}
