//! OAuth credential acquisition for the Drive API.
//!
//! The provider owns the token store and is the only component allowed to run
//! interactive authorization. Everything else receives an already-valid
//! [`Credential`]. The store is a single-slot file with no locking; exactly
//! one process is assumed to hold it at a time.

use crate::{DriveError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

/// Full Drive access, the one scope this server requests.
pub const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";

const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Refresh this many seconds before the recorded expiry.
const EXPIRY_LEEWAY_SECS: i64 = 60;

/// OAuth bearer-token bundle authorizing Drive API calls.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expiry: Option<DateTime<Utc>>,
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl Credential {
    /// Whether the access token is past (or within leeway of) its expiry.
    /// A credential with no recorded expiry is treated as still valid.
    pub fn is_expired(&self) -> bool {
        match self.expiry {
            Some(expiry) => Utc::now() + Duration::seconds(EXPIRY_LEEWAY_SECS) >= expiry,
            None => false,
        }
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("expiry", &self.expiry)
            .field("scopes", &self.scopes)
            .finish()
    }
}

/// Installed-app OAuth client registration, loaded from the vendor's
/// `client_secret.json` download.
#[derive(Clone, Deserialize)]
pub struct ClientSecret {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ClientSecret {
    /// Load from a `client_secret.json` file (the `installed` section, or
    /// `web` as a fallback).
    pub fn load(path: &Path) -> Result<Self> {
        #[derive(Deserialize)]
        struct Wrapper {
            #[serde(default)]
            installed: Option<ClientSecret>,
            #[serde(default)]
            web: Option<ClientSecret>,
        }

        let raw = std::fs::read_to_string(path)?;
        let wrapper: Wrapper = serde_json::from_str(&raw)?;
        wrapper.installed.or(wrapper.web).ok_or_else(|| {
            DriveError::Authorization(
                "client secret file has neither an 'installed' nor a 'web' section".to_string(),
            )
        })
    }
}

impl std::fmt::Debug for ClientSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSecret")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("auth_uri", &self.auth_uri)
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

/// Single-slot on-disk credential store. Overwritten wholesale on every
/// refresh or re-authorization; never versioned.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored credential, if any. An unreadable or corrupt slot is
    /// treated as empty so re-authorization can overwrite it.
    pub fn load(&self) -> Option<Credential> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to read token store");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(cred) => Some(cred),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "token store is corrupt; ignoring");
                None
            }
        }
    }

    pub fn save(&self, credential: &Credential) -> Result<()> {
        let raw = serde_json::to_string_pretty(credential)?;
        std::fs::write(&self.path, raw)?;
        Ok(())
    }
}

/// Interactive authorization seam.
///
/// The default implementation opens a loopback listener and walks the user
/// through the browser consent flow; tests substitute a stub.
#[async_trait]
pub trait AuthorizationFlow: Send + Sync {
    async fn authorize(&self, secret: &ClientSecret, scopes: &[String]) -> Result<Credential>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    scope: Option<String>,
}

fn credential_from_response(
    response: TokenResponse,
    fallback_refresh: Option<String>,
    requested_scopes: &[String],
) -> Credential {
    Credential {
        access_token: response.access_token,
        refresh_token: response.refresh_token.or(fallback_refresh),
        expiry: response.expires_in.map(|secs| Utc::now() + Duration::seconds(secs)),
        scopes: response
            .scope
            .map(|s| s.split_whitespace().map(str::to_string).collect())
            .unwrap_or_else(|| requested_scopes.to_vec()),
    }
}

async fn token_request(
    http: &reqwest::Client,
    token_uri: &str,
    params: &[(&str, &str)],
) -> Result<TokenResponse> {
    let response = http.post(token_uri).form(params).send().await?;
    if !response.status().is_success() {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        return Err(DriveError::Authorization(format!(
            "token request failed ({status}): {body}"
        )));
    }
    Ok(response.json().await?)
}

#[derive(Debug, Deserialize)]
struct CallbackQuery {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Browser consent flow with a loopback redirect listener on an ephemeral
/// port. Prints the authorization URL and blocks until the redirect lands.
#[derive(Debug, Default)]
pub struct InstalledAppFlow;

impl InstalledAppFlow {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AuthorizationFlow for InstalledAppFlow {
    async fn authorize(&self, secret: &ClientSecret, scopes: &[String]) -> Result<Credential> {
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", 0)).await?;
        let port = listener.local_addr()?.port();
        let redirect_uri = format!("http://127.0.0.1:{port}");

        let (tx, rx) = tokio::sync::oneshot::channel::<CallbackQuery>();
        let tx = Arc::new(tokio::sync::Mutex::new(Some(tx)));
        let app = axum::Router::new().route(
            "/",
            axum::routing::get({
                let tx = tx.clone();
                move |axum::extract::Query(query): axum::extract::Query<CallbackQuery>| {
                    let tx = tx.clone();
                    async move {
                        if let Some(tx) = tx.lock().await.take() {
                            let _ = tx.send(query);
                        }
                        axum::response::Html(
                            "<p>Authorization received. You may close this window.</p>",
                        )
                    }
                }
            }),
        );
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let mut auth_url = Url::parse(&secret.auth_uri)
            .map_err(|e| DriveError::Authorization(format!("invalid auth URI: {e}")))?;
        auth_url
            .query_pairs_mut()
            .append_pair("client_id", &secret.client_id)
            .append_pair("redirect_uri", &redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", &scopes.join(" "))
            .append_pair("access_type", "offline")
            .append_pair("prompt", "consent");

        info!(port, "waiting for authorization redirect");
        println!("Open this URL in your browser to authorize Drive access:\n\n{auth_url}\n");

        let query = rx.await.map_err(|_| {
            DriveError::Authorization("authorization callback listener closed".to_string())
        })?;
        server.abort();

        if let Some(error) = query.error {
            return Err(DriveError::Authorization(format!("authorization denied: {error}")));
        }
        let code = query.code.ok_or_else(|| {
            DriveError::Authorization("redirect carried no authorization code".to_string())
        })?;

        let http = reqwest::Client::new();
        let response = token_request(
            &http,
            &secret.token_uri,
            &[
                ("grant_type", "authorization_code"),
                ("code", &code),
                ("client_id", &secret.client_id),
                ("client_secret", &secret.client_secret),
                ("redirect_uri", &redirect_uri),
            ],
        )
        .await?;

        Ok(credential_from_response(response, None, scopes))
    }
}

/// Scoped credential acquisition: stored token, refresh grant, or interactive
/// flow, in that order. Every path that produces a fresh credential persists
/// it back to the token store.
pub struct CredentialProvider {
    secret: ClientSecret,
    store: TokenStore,
    scopes: Vec<String>,
    flow: Arc<dyn AuthorizationFlow>,
    http: reqwest::Client,
}

impl CredentialProvider {
    pub fn new(secret: ClientSecret, store: TokenStore) -> Self {
        Self {
            secret,
            store,
            scopes: vec![DRIVE_SCOPE.to_string()],
            flow: Arc::new(InstalledAppFlow::new()),
            http: reqwest::Client::new(),
        }
    }

    /// Substitute the interactive flow (used by tests).
    pub fn with_flow(mut self, flow: Arc<dyn AuthorizationFlow>) -> Self {
        self.flow = flow;
        self
    }

    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Return a valid, non-expired credential.
    ///
    /// Stored-and-fresh credentials are returned as-is. An expired credential
    /// with a refresh token is refreshed remotely; a refresh failure falls
    /// back to the interactive flow rather than surfacing. The interactive
    /// flow runs at most once per call.
    pub async fn credential(&self) -> Result<Credential> {
        if let Some(stored) = self.store.load() {
            if !stored.is_expired() {
                debug!("stored credential is still valid");
                return Ok(stored);
            }
            if stored.refresh_token.is_some() {
                match self.refresh(&stored).await {
                    Ok(fresh) => {
                        self.store.save(&fresh)?;
                        info!("credential refreshed");
                        return Ok(fresh);
                    }
                    Err(e) => {
                        warn!(error = %e, "refresh failed; falling back to interactive authorization");
                    }
                }
            }
        }

        let credential = self.flow.authorize(&self.secret, &self.scopes).await?;
        self.store.save(&credential)?;
        info!("interactive authorization complete");
        Ok(credential)
    }

    async fn refresh(&self, credential: &Credential) -> Result<Credential> {
        let refresh_token = credential.refresh_token.as_deref().ok_or_else(|| {
            DriveError::Authorization("credential has no refresh token".to_string())
        })?;
        let response = token_request(
            &self.http,
            &self.secret.token_uri,
            &[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", &self.secret.client_id),
                ("client_secret", &self.secret.client_secret),
            ],
        )
        .await?;
        Ok(credential_from_response(
            response,
            credential.refresh_token.clone(),
            &self.scopes,
        ))
    }
}
