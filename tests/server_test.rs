//! HTTP endpoint tests using axum-test against a wiremock provider.
#![cfg(feature = "server")]

use std::sync::Arc;

use axum_test::TestServer;
use serde_json::{Value, json};
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use scrivener::server::auth::{NONCE_HEADER, NonceSigner, TokenTable};
use scrivener::server::handlers::actions;
use scrivener::server::{AppState, build_router};
use scrivener::subjects::MemorySubjectRepository;
use scrivener::{Requester, Scrivener, Settings, Subject};

const SECRET: &str = "server-test-secret";
const ADMIN_TOKEN: &str = "tok-admin";
const EDITOR_TOKEN: &str = "tok-editor";
const ADMIN_ID: u64 = 1;
const EDITOR_ID: u64 = 2;

struct Fixture {
    server: TestServer,
    _upstream: MockServer,
    nonces: NonceSigner,
}

async fn fixture(settings: Settings) -> Fixture {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": " Generated. "}}],
            "usage": {"total_tokens": 21}
        })))
        .mount(&upstream)
        .await;

    let generator = Scrivener::builder()
        .secret(SECRET)
        .settings(settings)
        .base_url(upstream.uri())
        .subjects(Arc::new(MemorySubjectRepository::with_subjects([
            Subject::new(10, "post", "Otters hold hands."),
            Subject::new(11, "attachment", "image.png"),
        ])))
        .build()
        .unwrap();
    generator.set_api_key("sk-server").await.unwrap();

    let tokens = TokenTable::new()
        .insert(ADMIN_TOKEN, Requester::new(ADMIN_ID, ["administrator"]))
        .insert(EDITOR_TOKEN, Requester::new(EDITOR_ID, ["editor"]));
    let nonces = NonceSigner::new(SECRET);
    let state = AppState::new(Arc::new(generator), tokens, nonces.clone());

    Fixture {
        server: TestServer::new(build_router(state)).unwrap(),
        _upstream: upstream,
        nonces,
    }
}

fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

#[tokio::test]
async fn generate_returns_success_envelope() {
    let f = fixture(Settings::default()).await;

    let response = f
        .server
        .post("/generate")
        .add_header("authorization", bearer(EDITOR_TOKEN))
        .add_header(NONCE_HEADER, f.nonces.create(actions::GENERATE, EDITOR_ID))
        .json(&json!({"subjectId": 10}))
        .await;

    assert_eq!(response.status_code(), 200);
    assert_eq!(
        response.json::<Value>(),
        json!({
            "success": true,
            "data": {"content": "Generated.", "tokensUsed": 21, "fromCache": false}
        })
    );

    // Same prompt again comes from the cache.
    let cached = f
        .server
        .post("/generate")
        .add_header("authorization", bearer(EDITOR_TOKEN))
        .add_header(NONCE_HEADER, f.nonces.create(actions::GENERATE, EDITOR_ID))
        .json(&json!({"subjectId": 10}))
        .await;
    let body = cached.json::<Value>();
    assert_eq!(body["data"]["fromCache"], true);
    assert_eq!(body["data"]["tokensUsed"], 0);
}

#[tokio::test]
async fn missing_or_unknown_token_is_unauthorized() {
    let f = fixture(Settings::default()).await;

    let response = f
        .server
        .post("/generate")
        .json(&json!({"subjectId": 10}))
        .await;
    assert_eq!(response.status_code(), 401);

    let response = f
        .server
        .post("/generate")
        .add_header("authorization", "Bearer nope")
        .json(&json!({"subjectId": 10}))
        .await;
    assert_eq!(response.status_code(), 401);
    assert_eq!(response.json::<Value>()["success"], false);
}

#[tokio::test]
async fn nonce_must_match_action_and_user() {
    let f = fixture(Settings::default()).await;

    // Nonce for another action.
    let response = f
        .server
        .post("/generate")
        .add_header("authorization", bearer(EDITOR_TOKEN))
        .add_header(NONCE_HEADER, f.nonces.create(actions::CHAT, EDITOR_ID))
        .json(&json!({"subjectId": 10}))
        .await;
    assert_eq!(response.status_code(), 403);

    // Nonce for another user.
    let response = f
        .server
        .post("/generate")
        .add_header("authorization", bearer(EDITOR_TOKEN))
        .add_header(NONCE_HEADER, f.nonces.create(actions::GENERATE, ADMIN_ID))
        .json(&json!({"subjectId": 10}))
        .await;
    assert_eq!(response.status_code(), 403);
}

#[tokio::test]
async fn issued_nonce_authorizes_request() {
    let f = fixture(Settings::default()).await;

    let issued = f
        .server
        .get("/nonce?action=chat")
        .add_header("authorization", bearer(EDITOR_TOKEN))
        .await;
    assert_eq!(issued.status_code(), 200);
    let nonce = issued.json::<Value>()["data"]["nonce"]
        .as_str()
        .unwrap()
        .to_string();

    let response = f
        .server
        .post("/chat")
        .add_header("authorization", bearer(EDITOR_TOKEN))
        .add_header(NONCE_HEADER, nonce)
        .json(&json!({"message": "Hello"}))
        .await;
    assert_eq!(response.status_code(), 200);
    assert_eq!(response.json::<Value>()["data"]["content"], "Generated.");

    let unknown = f
        .server
        .get("/nonce?action=drop_tables")
        .add_header("authorization", bearer(EDITOR_TOKEN))
        .await;
    assert_eq!(unknown.status_code(), 400);
}

#[tokio::test]
async fn domain_errors_use_failure_envelope() {
    let f = fixture(Settings::default()).await;

    let not_found = f
        .server
        .post("/generate")
        .add_header("authorization", bearer(EDITOR_TOKEN))
        .add_header(NONCE_HEADER, f.nonces.create(actions::GENERATE, EDITOR_ID))
        .json(&json!({"subjectId": 999}))
        .await;
    assert_eq!(not_found.status_code(), 404);
    assert_eq!(
        not_found.json::<Value>(),
        json!({"success": false, "data": {"error": "subject not found: 999"}})
    );

    let wrong_type = f
        .server
        .post("/generate")
        .add_header("authorization", bearer(EDITOR_TOKEN))
        .add_header(NONCE_HEADER, f.nonces.create(actions::GENERATE, EDITOR_ID))
        .json(&json!({"subjectId": 11}))
        .await;
    assert_eq!(wrong_type.status_code(), 400);
    assert_eq!(wrong_type.json::<Value>()["success"], false);
}

#[tokio::test]
async fn rate_limit_maps_to_too_many_requests() {
    let f = fixture(Settings::default().rate_limit(1).cache_ttl_secs(0)).await;

    for expected in [200, 429] {
        let response = f
            .server
            .post("/generate")
            .add_header("authorization", bearer(EDITOR_TOKEN))
            .add_header(NONCE_HEADER, f.nonces.create(actions::GENERATE, EDITOR_ID))
            .json(&json!({"subjectId": 10}))
            .await;
        assert_eq!(response.status_code(), expected);
    }
}

#[tokio::test]
async fn admin_routes_require_administrator() {
    let f = fixture(Settings::default()).await;

    let denied = f
        .server
        .post("/admin/clear-cache")
        .add_header("authorization", bearer(EDITOR_TOKEN))
        .add_header(NONCE_HEADER, f.nonces.create(actions::CLEAR_CACHE, EDITOR_ID))
        .await;
    assert_eq!(denied.status_code(), 403);

    let cleared = f
        .server
        .post("/admin/clear-cache")
        .add_header("authorization", bearer(ADMIN_TOKEN))
        .add_header(NONCE_HEADER, f.nonces.create(actions::CLEAR_CACHE, ADMIN_ID))
        .await;
    assert_eq!(cleared.status_code(), 200);
    assert_eq!(cleared.json::<Value>()["success"], true);

    let tested = f
        .server
        .post("/admin/test-connection")
        .add_header("authorization", bearer(ADMIN_TOKEN))
        .add_header(NONCE_HEADER, f.nonces.create(actions::TEST_CONNECTION, ADMIN_ID))
        .await;
    assert_eq!(tested.status_code(), 200);
    assert_eq!(tested.json::<Value>()["data"]["content"], "Generated.");
}

#[tokio::test]
async fn stats_and_errors_report_usage() {
    let f = fixture(Settings::default()).await;

    f.server
        .post("/generate")
        .add_header("authorization", bearer(EDITOR_TOKEN))
        .add_header(NONCE_HEADER, f.nonces.create(actions::GENERATE, EDITOR_ID))
        .json(&json!({"subjectId": 10}))
        .await;
    f.server
        .post("/chat")
        .add_header("authorization", bearer(EDITOR_TOKEN))
        .add_header(NONCE_HEADER, f.nonces.create(actions::CHAT, EDITOR_ID))
        .json(&json!({"message": "   "}))
        .await;

    let stats = f
        .server
        .get("/admin/stats")
        .add_header("authorization", bearer(ADMIN_TOKEN))
        .add_header(NONCE_HEADER, f.nonces.create(actions::STATS, ADMIN_ID))
        .await;
    assert_eq!(stats.status_code(), 200);
    assert_eq!(
        stats.json::<Value>()["data"],
        json!({"totalRequests": 1, "totalTokens": 21, "uniqueRequesters": 1})
    );

    let past = f
        .server
        .get("/admin/stats?date=2001-01-01")
        .add_header("authorization", bearer(ADMIN_TOKEN))
        .add_header(NONCE_HEADER, f.nonces.create(actions::STATS, ADMIN_ID))
        .await;
    assert_eq!(past.json::<Value>()["data"]["totalRequests"], 0);

    let errors = f
        .server
        .get("/admin/errors?limit=5")
        .add_header("authorization", bearer(ADMIN_TOKEN))
        .add_header(NONCE_HEADER, f.nonces.create(actions::ERRORS, ADMIN_ID))
        .await;
    let body = errors.json::<Value>();
    let rows = body["data"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["status"], "error");
    assert_eq!(rows[0]["subject_id"], 0);
}
