//! Session gate against a mock auth backend and an on-disk credential store.

use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use mainpage_gateway::locale::{Locale, LocaleSet};
use mainpage_gateway::session::credential::{ACCESS_TOKEN_KEY, EXPIRES_IN_KEY};
use mainpage_gateway::session::gate::{GateState, ProtectedAction};
use mainpage_gateway::session::{
    CredentialSlot, FileStore, HttpAuthBackend, KeyValueStore, SessionGate,
};

struct Harness {
    _dir: tempfile::TempDir,
    store: Arc<FileStore>,
    gate: SessionGate,
    en: Locale,
}

fn harness(server: &MockServer) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileStore::new(dir.path().join("credentials.json")));
    let backend = HttpAuthBackend::new(server.uri(), 5).unwrap();
    let gate = SessionGate::new(CredentialSlot::new(store.clone()), Arc::new(backend));
    let en = LocaleSet::new(["zh", "en"], "en").unwrap().default_locale().clone();
    Harness { _dir: dir, store, gate, en }
}

async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "jwt-ada",
            "token_type": "bearer",
            "expires_in": 604800
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn login_stores_both_keys_and_logout_clears_them() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    let h = harness(&server);

    assert!(!h.gate.is_authenticated());
    let next = h.gate.login("ada", "hunter22", &h.en).await.unwrap();
    assert_eq!(next, "/en");
    assert!(h.gate.is_authenticated());
    assert_eq!(h.store.get(ACCESS_TOKEN_KEY).unwrap().as_deref(), Some("jwt-ada"));
    assert_eq!(h.store.get(EXPIRES_IN_KEY).unwrap().as_deref(), Some("604800"));

    h.gate.logout();
    assert!(!h.gate.is_authenticated());
    assert_eq!(h.store.get(ACCESS_TOKEN_KEY).unwrap(), None);
    assert_eq!(h.store.get(EXPIRES_IN_KEY).unwrap(), None);
}

#[tokio::test]
async fn guard_without_credential_redirects_to_login() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/games/fogchess/token"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let h = harness(&server);

    let decision = h.gate.guard(&ProtectedAction::start_game("fogchess"), &h.en).await;
    assert!(!decision.proceed());
    assert_eq!(decision.redirect_to(), Some("/en/login"));
}

#[tokio::test]
async fn rejected_verify_purges_and_guard_then_redirects() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/auth/verify"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "detail": "无法验证凭据" })))
        .mount(&server)
        .await;
    let h = harness(&server);
    h.gate.login("ada", "hunter22", &h.en).await.unwrap();

    let verification = h.gate.verify().await;
    assert!(!verification.valid);
    assert_eq!(h.gate.state(), GateState::Unauthenticated);
    assert_eq!(h.store.get(ACCESS_TOKEN_KEY).unwrap(), None);

    let decision = h.gate.guard(&ProtectedAction::start_game("fogchess"), &h.en).await;
    assert!(!decision.proceed());
    assert_eq!(decision.redirect_to(), Some("/en/login"));
}

#[tokio::test]
async fn verified_session_starts_game_via_fragment() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/auth/verify"))
        .and(header("authorization", "Bearer jwt-ada"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "data": { "username": "ada" } })),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/games/fogchess/token"))
        .and(header("authorization", "Bearer jwt-ada"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "game_token": "g/t+1", "expires_in": 300 }
        })))
        .expect(1)
        .mount(&server)
        .await;
    let h = harness(&server);
    h.gate.login("ada", "hunter22", &h.en).await.unwrap();

    let verification = h.gate.verify().await;
    assert!(verification.valid);
    assert_eq!(h.gate.identity().unwrap().username, "ada");

    let decision = h.gate.guard(&ProtectedAction::start_game("fogchess"), &h.en).await;
    let cap = decision.capability().unwrap();
    assert_eq!(cap.expires_in(), Some(300));
    assert_eq!(
        cap.launch_url("http://localhost:5173/"),
        "http://localhost:5173/#token=g%2Ft%2B1"
    );
    // The session credential is untouched by minting.
    assert_eq!(h.store.get(ACCESS_TOKEN_KEY).unwrap().as_deref(), Some("jwt-ada"));
}

#[tokio::test]
async fn expired_credential_at_guard_time_is_purged() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/games/fogchess/token"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "detail": "expired" })))
        .mount(&server)
        .await;
    let h = harness(&server);
    h.gate.login("ada", "hunter22", &h.en).await.unwrap();

    let decision = h.gate.guard(&ProtectedAction::start_game("fogchess"), &h.en).await;
    assert_eq!(decision.redirect_to(), Some("/en/login"));
    assert!(!h.gate.is_authenticated());
}

#[tokio::test]
async fn unreachable_backend_is_treated_as_invalid() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileStore::new(dir.path().join("credentials.json")));
    store.set(ACCESS_TOKEN_KEY, "jwt").unwrap();
    let backend = HttpAuthBackend::new("http://127.0.0.1:1", 1).unwrap();
    let gate = SessionGate::new(CredentialSlot::new(store.clone()), Arc::new(backend));

    assert!(!gate.verify().await.valid);
    assert_eq!(store.get(ACCESS_TOKEN_KEY).unwrap(), None);
}
