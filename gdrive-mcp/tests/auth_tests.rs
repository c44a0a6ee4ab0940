use async_trait::async_trait;
use chrono::{Duration, Utc};
use gdrive_mcp::auth::{
    AuthorizationFlow, ClientSecret, Credential, CredentialProvider, DRIVE_SCOPE, TokenStore,
};
use gdrive_mcp::error::Result;
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Counts invocations instead of opening a browser.
struct StubFlow {
    calls: AtomicUsize,
}

impl StubFlow {
    fn new() -> Arc<Self> {
        Arc::new(Self { calls: AtomicUsize::new(0) })
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthorizationFlow for StubFlow {
    async fn authorize(&self, _secret: &ClientSecret, scopes: &[String]) -> Result<Credential> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Credential {
            access_token: "flow-token".to_string(),
            refresh_token: Some("flow-refresh".to_string()),
            expiry: Some(Utc::now() + Duration::hours(1)),
            scopes: scopes.to_vec(),
        })
    }
}

fn client_secret(token_uri: String) -> ClientSecret {
    serde_json::from_value(json!({
        "client_id": "test-client",
        "client_secret": "test-secret",
        "token_uri": token_uri,
    }))
    .unwrap()
}

fn stored(store: &TokenStore, credential: &Credential) {
    store.save(credential).unwrap();
}

fn expired_credential(refresh_token: Option<&str>) -> Credential {
    Credential {
        access_token: "stale-token".to_string(),
        refresh_token: refresh_token.map(str::to_string),
        expiry: Some(Utc::now() - Duration::hours(1)),
        scopes: vec![DRIVE_SCOPE.to_string()],
    }
}

#[tokio::test]
async fn test_valid_stored_credential_short_circuits() {
    let dir = tempfile::tempdir().unwrap();
    let store = TokenStore::new(dir.path().join("token.json"));
    let valid = Credential {
        access_token: "still-good".to_string(),
        refresh_token: None,
        expiry: Some(Utc::now() + Duration::hours(1)),
        scopes: vec![DRIVE_SCOPE.to_string()],
    };
    stored(&store, &valid);

    let flow = StubFlow::new();
    let provider = CredentialProvider::new(
        client_secret("http://127.0.0.1:1/token".to_string()),
        store,
    )
    .with_flow(flow.clone());

    let credential = provider.credential().await.unwrap();
    assert_eq!(credential.access_token, "still-good");
    assert_eq!(flow.call_count(), 0);
}

#[tokio::test]
async fn test_expired_with_refresh_token_refreshes_and_persists() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=r1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "fresh-token",
            "expires_in": 3600,
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let store = TokenStore::new(dir.path().join("token.json"));
    stored(&store, &expired_credential(Some("r1")));

    let flow = StubFlow::new();
    let provider = CredentialProvider::new(
        client_secret(format!("{}/token", server.uri())),
        store.clone(),
    )
    .with_flow(flow.clone());

    let credential = provider.credential().await.unwrap();
    assert_eq!(credential.access_token, "fresh-token");
    // Refresh token survives a response that omits one.
    assert_eq!(credential.refresh_token.as_deref(), Some("r1"));
    assert_eq!(flow.call_count(), 0);

    // The refreshed credential was persisted to the single slot.
    let reloaded = store.load().unwrap();
    assert_eq!(reloaded.access_token, "fresh-token");
}

#[tokio::test]
async fn test_refresh_failure_triggers_interactive_flow_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_grant"})))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let store = TokenStore::new(dir.path().join("token.json"));
    stored(&store, &expired_credential(Some("revoked")));

    let flow = StubFlow::new();
    let provider = CredentialProvider::new(
        client_secret(format!("{}/token", server.uri())),
        store.clone(),
    )
    .with_flow(flow.clone());

    let credential = provider.credential().await.unwrap();
    assert_eq!(credential.access_token, "flow-token");
    assert_eq!(flow.call_count(), 1);

    let reloaded = store.load().unwrap();
    assert_eq!(reloaded.access_token, "flow-token");
}

#[tokio::test]
async fn test_expired_without_refresh_token_goes_straight_to_flow() {
    let dir = tempfile::tempdir().unwrap();
    let store = TokenStore::new(dir.path().join("token.json"));
    stored(&store, &expired_credential(None));

    let flow = StubFlow::new();
    let provider = CredentialProvider::new(
        client_secret("http://127.0.0.1:1/token".to_string()),
        store,
    )
    .with_flow(flow.clone());

    let credential = provider.credential().await.unwrap();
    assert_eq!(credential.access_token, "flow-token");
    assert_eq!(flow.call_count(), 1);
}

#[tokio::test]
async fn test_empty_store_runs_flow_and_persists() {
    let dir = tempfile::tempdir().unwrap();
    let store = TokenStore::new(dir.path().join("token.json"));

    let flow = StubFlow::new();
    let provider = CredentialProvider::new(
        client_secret("http://127.0.0.1:1/token".to_string()),
        store.clone(),
    )
    .with_flow(flow.clone());

    let credential = provider.credential().await.unwrap();
    assert_eq!(credential.access_token, "flow-token");
    assert_eq!(flow.call_count(), 1);
    assert!(store.load().is_some());
}

#[tokio::test]
async fn test_corrupt_store_is_treated_as_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("token.json");
    std::fs::write(&path, "not json at all").unwrap();
    let store = TokenStore::new(path);

    let flow = StubFlow::new();
    let provider = CredentialProvider::new(
        client_secret("http://127.0.0.1:1/token".to_string()),
        store.clone(),
    )
    .with_flow(flow.clone());

    let credential = provider.credential().await.unwrap();
    assert_eq!(credential.access_token, "flow-token");
    assert_eq!(flow.call_count(), 1);
    // The corrupt slot was overwritten wholesale.
    assert!(store.load().is_some());
}
