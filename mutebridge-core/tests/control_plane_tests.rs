// tests/control_plane_tests.rs

mod test_utils;

use std::collections::HashSet;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use mutebridge_core::config::ProtocolMode;
use mutebridge_core::control_plane::{build_router, ControlPlaneState};
use mutebridge_core::services::mute_bridge::MUTE_REASON;

use test_utils::{bridge_settings, member, shared, FakeBotClient, API_KEY};

fn app(client: Arc<FakeBotClient>, protocol: ProtocolMode) -> Router {
    build_router(ControlPlaneState::new(client, Arc::new(bridge_settings(protocol))))
}

fn auth() -> String {
    format!("Basic {API_KEY}")
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), 64 * 1024).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn post_mute(body: Value, authorization: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri("/mute")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn legacy(req: &str, params: Value, authorization: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::GET)
        .uri("/")
        .header("req", req)
        .header("params", params.to_string());
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    builder.body(Body::empty()).unwrap()
}

fn get_id(query: &str, authorization: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(format!("/id?{query}"));
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    builder.body(Body::empty()).unwrap()
}

fn guild() -> Arc<FakeBotClient> {
    shared(FakeBotClient::with_members(vec![
        member("100000000000000001", "Bob", None),
        member("100000000000000002", "bobby", Some("Bobinator")),
        member("100000000000000003", "alice", Some("Al")),
    ]))
}

#[tokio::test]
async fn test_post_mute_with_auth_mutes_member() {
    let client = guild();
    let app = app(client.clone(), ProtocolMode::Rest);

    let (status, body) = send(
        &app,
        post_mute(json!({"id": "123456789012345678", "status": true}), Some(&auth())),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true}));
    assert_eq!(client.is_muted("123456789012345678"), Some(true));

    let calls = client.mute_calls.lock().unwrap().clone();
    assert_eq!(calls[0].2.as_deref(), Some(MUTE_REASON));
}

#[tokio::test]
async fn test_missing_or_wrong_secret_is_401_everywhere() {
    let client = guild();
    let app = app(client.clone(), ProtocolMode::Rest);

    for authorization in [None, Some("Basic wrong"), Some("Bearer s3cr3t-key")] {
        let (status, body) = send(
            &app,
            post_mute(json!({"id": "123456789012345678", "status": true}), authorization),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["errorId"], "AUTHORIZATION_MISMATCH");

        let (status, _) = send(&app, get_id("name=Bob&nick=x", authorization)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        for req in ["connect", "mute", "keep_alive", "sync", "bogus"] {
            let (status, _) = send(&app, legacy(req, json!({"tag": "Bob"}), authorization)).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "legacy {req}");
        }
    }

    assert_eq!(client.mute_call_count(), 0);
}

#[tokio::test]
async fn test_mute_twice_then_unmute() {
    let client = guild();
    let app = app(client.clone(), ProtocolMode::Rest);
    let id = "100000000000000003";

    for _ in 0..2 {
        let (status, body) = send(&app, post_mute(json!({"id": id, "status": true}), Some(&auth()))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"success": true}));
        assert_eq!(client.is_muted(id), Some(true));
    }

    let (status, _) = send(&app, post_mute(json!({"id": id, "status": false}), Some(&auth()))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(client.is_muted(id), Some(false));

    let calls = client.mute_calls.lock().unwrap().clone();
    assert_eq!(calls[2].2, None, "unmuting carries no reason");
}

#[tokio::test]
async fn test_batch_stops_at_first_invalid_item() {
    let client = guild();
    let app = app(client.clone(), ProtocolMode::Rest);

    let (status, body) = send(
        &app,
        post_mute(
            json!([
                {"id": "100000000000000001", "status": true},
                {"id": "100000000000000002", "status": "yes"},
                {"id": "100000000000000003", "status": true},
            ]),
            Some(&auth()),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["errorId"], "INVALID_PARAMS");
    assert_eq!(client.is_muted("100000000000000001"), Some(true));
    assert_eq!(client.is_muted("100000000000000002"), None);
    assert_eq!(client.is_muted("100000000000000003"), None);
}

#[tokio::test]
async fn test_batch_transport_failure_is_500_without_rollback() {
    let mut fake = FakeBotClient::with_members(vec![]);
    fake.failing_members = HashSet::from(["100000000000000002".to_string()]);
    let client = shared(fake);
    let app = app(client.clone(), ProtocolMode::Rest);

    let (status, body) = send(
        &app,
        post_mute(
            json!([
                {"id": "100000000000000001", "status": true},
                {"id": "100000000000000002", "status": true},
                {"id": "100000000000000003", "status": true},
            ]),
            Some(&auth()),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["errorId"], "DISCORD_ERROR");
    assert_eq!(client.is_muted("100000000000000001"), Some(true));
    assert_eq!(client.mute_call_count(), 2);
}

#[tokio::test]
async fn test_mute_rejects_non_json_body() {
    let app = app(guild(), ProtocolMode::Rest);
    let request = Request::builder()
        .method(Method::POST)
        .uri("/mute")
        .header(header::AUTHORIZATION, auth())
        .body(Body::from("id=1&status=true"))
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_id_exact_and_substring() {
    let app = app(guild(), ProtocolMode::Rest);

    let (status, body) = send(&app, get_id("name=Bob&nick=nobody", Some(&auth()))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "100000000000000001");
    assert_eq!(body["name"], "Bob");

    // exact nickname beats substring name
    let (status, body) = send(&app, get_id("name=zzz&nick=Bobinator", Some(&auth()))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "100000000000000002");
    assert_eq!(body["nick"], "Bobinator");
}

#[tokio::test]
async fn test_get_id_no_match_is_404() {
    let app = app(guild(), ProtocolMode::Rest);
    let (status, body) = send(&app, get_id("name=Zed&nick=unused", Some(&auth()))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"answer": 0}));
}

#[tokio::test]
async fn test_get_id_missing_params_is_400() {
    let app = app(guild(), ProtocolMode::Rest);
    let (status, _) = send(&app, get_id("name=Bob", Some(&auth()))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_guild_unavailable_is_500() {
    let client = shared(FakeBotClient::default());
    let app = app(client.clone(), ProtocolMode::Rest);

    let (status, body) = send(
        &app,
        post_mute(json!({"id": "123456789012345678", "status": true}), Some(&auth())),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["errorId"], "GUILD_UNAVAILABLE");
    assert_eq!(client.mute_call_count(), 0);
}

#[tokio::test]
async fn test_legacy_connect() {
    let app = app(guild(), ProtocolMode::Rest);

    let (status, body) = send(&app, legacy("connect", json!({"tag": "nonexistent"}), Some(&auth()))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"answer": 0}));

    let (status, body) = send(&app, legacy("connect", json!({"tag": "ali"}), Some(&auth()))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"tag": "alice", "id": "100000000000000003"}));
}

#[tokio::test]
async fn test_legacy_mute_and_param_errors() {
    let client = guild();
    let app = app(client.clone(), ProtocolMode::Legacy);

    let (status, body) = send(
        &app,
        legacy("mute", json!({"id": "100000000000000001", "mute": true}), Some(&auth())),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true}));
    assert_eq!(client.is_muted("100000000000000001"), Some(true));

    let (status, body) = send(&app, legacy("mute", json!({"id": "100000000000000001"}), Some(&auth()))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert_eq!(body["errorId"], "INVALID_PARAMS");
}

#[tokio::test]
async fn test_legacy_unknown_request_and_sync() {
    let app = app(guild(), ProtocolMode::Legacy);

    let (status, body) = send(&app, legacy("reboot", json!({}), Some(&auth()))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["errorId"], "UNKNOWN_REQUEST");

    let (status, body) = send(&app, legacy("sync", json!({}), Some(&auth()))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["version"], "1.3.0");
    assert_eq!(body["discordGuild"], test_utils::GUILD_ID);

    let (status, body) = send(&app, legacy("keep_alive", json!({}), Some(&auth()))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true}));
}

#[tokio::test]
async fn test_legacy_mode_answers_on_any_path() {
    let app = app(guild(), ProtocolMode::Legacy);
    let request = Request::builder()
        .method(Method::POST)
        .uri("/whatever")
        .header(header::AUTHORIZATION, auth())
        .header("req", "keep_alive")
        .header("params", "{}")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true}));
}

fn legacy_raw(req: &str, params: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::GET)
        .uri("/")
        .header(header::AUTHORIZATION, auth())
        .header("req", req);
    if let Some(value) = params {
        builder = builder.header("params", value);
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_legacy_bad_params_header_is_unknown_request() {
    for protocol in [ProtocolMode::Legacy, ProtocolMode::Rest] {
        let client = guild();
        let app = app(client.clone(), protocol);

        for req in ["keep_alive", "sync", "mute"] {
            for params in [None, Some("not json"), Some("[1, 2]")] {
                let (status, body) = send(&app, legacy_raw(req, params)).await;
                assert_eq!(status, StatusCode::NOT_FOUND, "{protocol:?} {req} {params:?}");
                assert_eq!(body["errorId"], "UNKNOWN_REQUEST", "{protocol:?} {req} {params:?}");
            }
        }
        assert_eq!(client.mute_call_count(), 0);
    }
}

#[tokio::test]
async fn test_legacy_mute_discord_failure_is_reported_in_body() {
    let mut fake = FakeBotClient::with_members(vec![member("100000000000000005", "eve", None)]);
    fake.failing_members = HashSet::from(["100000000000000005".to_string()]);
    let client = shared(fake);

    for protocol in [ProtocolMode::Legacy, ProtocolMode::Rest] {
        let app = app(client.clone(), protocol);
        let (status, body) = send(
            &app,
            legacy("mute", json!({"id": "100000000000000005", "mute": true}), Some(&auth())),
        )
        .await;

        assert_eq!(status, StatusCode::OK, "{protocol:?}");
        assert_eq!(body["success"], false);
        assert_eq!(body["errorId"], "DISCORD_ERROR");
        assert_eq!(client.is_muted("100000000000000005"), None);
    }
    assert_eq!(client.mute_call_count(), 2);
}

#[tokio::test]
async fn test_rest_unrouted_requests_answer_json() {
    let client = guild();
    let app = app(client.clone(), ProtocolMode::Rest);

    let wrong_method = Request::builder()
        .method(Method::GET)
        .uri("/mute")
        .header(header::AUTHORIZATION, auth())
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, wrong_method).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["errorId"], "UNKNOWN_REQUEST");

    let (status, body) = send(&app, get_path("/members", Some(&auth()))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["errorId"], "UNKNOWN_REQUEST");

    // still behind the secret
    let (status, body) = send(&app, get_path("/members", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["errorId"], "AUTHORIZATION_MISMATCH");
    assert_eq!(client.mute_call_count(), 0);
}

fn get_path(path: &str, authorization: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(path);
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    builder.body(Body::empty()).unwrap()
}
