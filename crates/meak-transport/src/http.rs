//! HTTP backend implementation using `reqwest`.
//!
//! Talks to a GoTrue-compatible auth API under `{url}/auth/v1` and a
//! PostgREST-compatible table API under `{url}/rest/v1`. Every request
//! carries the project's anon key as `apikey`; the bearer token is the
//! session's access token when signed in, the anon key otherwise.

use std::sync::{Arc, Weak};
use std::time::Duration;

use meak_protocol::{
    AuthChange, AuthEvent, AuthResponse, AuthSession, Codec, JsonCodec, ProtocolError,
    UserIdentity, UserMetadata,
};
use reqwest::{Method, RequestBuilder};
use serde_json::{Value, json};
use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::{AuthBackend, TableBackend, TableQuery, TokenStore, TransportError};

/// How often the auto-refresh task wakes up.
const AUTO_REFRESH_TICK_SECS: u64 = 30;

/// A session is refreshed once it expires within this many ticks.
const AUTO_REFRESH_TICK_THRESHOLD: i64 = 3;

/// `get_session` refreshes first when the token has less than this left.
const EXPIRY_MARGIN_SECS: i64 = 10;

// ---------------------------------------------------------------------------
// BackendConfig
// ---------------------------------------------------------------------------

/// Connection settings for [`HttpBackend`].
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Project base URL, e.g. `https://xyz.supabase.co`.
    pub url: String,

    /// Public (anon) API key sent with every request.
    pub anon_key: String,

    /// Key under which the session JSON is kept in the token store.
    pub storage_key: String,

    /// Save the session to the token store and load it on startup.
    pub persist_session: bool,

    /// Run a background task that refreshes the access token before it
    /// expires.
    pub auto_refresh_token: bool,

    /// Whole-request timeout enforced by the HTTP client.
    pub request_timeout_secs: u64,

    /// TCP/TLS connect timeout.
    pub connect_timeout_secs: u64,

    /// Buffered session-change notifications per subscriber. A subscriber
    /// that falls further behind skips ahead.
    pub event_capacity: usize,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:54321".to_string(),
            anon_key: String::new(),
            storage_key: "meak-auth-token".to_string(),
            persist_session: true,
            auto_refresh_token: true,
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
            event_capacity: 16,
        }
    }
}

// ---------------------------------------------------------------------------
// HttpBackend
// ---------------------------------------------------------------------------

/// The remote backend over HTTP.
///
/// Holds the current session in memory (mirrored to the token store) and
/// broadcasts an [`AuthChange`] whenever it changes.
pub struct HttpBackend {
    http: reqwest::Client,
    base_url: String,
    config: BackendConfig,
    store: Box<dyn TokenStore>,
    session: Mutex<Option<AuthSession>>,
    events: broadcast::Sender<AuthChange>,
}

impl HttpBackend {
    /// Builds the HTTP client and, if `persist_session` is on, loads any
    /// session left in `store` by a previous run.
    ///
    /// # Errors
    /// Returns [`TransportError::Config`] for an empty URL or if the HTTP
    /// client can't be constructed.
    pub fn new(config: BackendConfig, store: impl TokenStore) -> Result<Self, TransportError> {
        let base_url = config.url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(TransportError::Config("backend url is empty".into()));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| TransportError::Config(e.to_string()))?;

        let store: Box<dyn TokenStore> = Box::new(store);
        let session = if config.persist_session {
            load_session(store.as_ref(), &config.storage_key)
        } else {
            None
        };
        let (events, _) = broadcast::channel(config.event_capacity.max(1));

        tracing::debug!(url = %base_url, restored = session.is_some(), "http backend ready");

        Ok(Self {
            http,
            base_url,
            config,
            store,
            session: Mutex::new(session),
            events,
        })
    }

    /// Returns the configuration this backend was built with.
    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// Exchanges the current refresh token for a new session.
    ///
    /// # Errors
    /// [`TransportError::NotAuthenticated`] without a session. If the
    /// provider rejects the refresh token the local session is dropped
    /// (and `SignedOut` emitted) before the error is returned.
    pub async fn refresh_session(&self) -> Result<AuthSession, TransportError> {
        let refresh_token = self
            .session
            .lock()
            .await
            .as_ref()
            .map(|s| s.refresh_token.clone())
            .ok_or(TransportError::NotAuthenticated)?;
        self.refresh_with(&refresh_token).await
    }

    /// Spawns the auto-refresh loop. It holds only a weak reference and
    /// stops on its own once the backend is dropped.
    pub fn start_auto_refresh(self: &Arc<Self>) -> JoinHandle<()> {
        let weak: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(Duration::from_secs(AUTO_REFRESH_TICK_SECS));
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                let Some(backend) = weak.upgrade() else {
                    break;
                };
                backend.auto_refresh_tick().await;
            }
            tracing::debug!("auto refresh stopped");
        })
    }

    async fn auto_refresh_tick(&self) {
        let margin = AUTO_REFRESH_TICK_SECS as i64 * AUTO_REFRESH_TICK_THRESHOLD;
        let due = self
            .session
            .lock()
            .await
            .as_ref()
            .is_some_and(|s| s.expires_within(now_unix(), margin));
        if !due {
            return;
        }
        if let Err(e) = self.refresh_session().await {
            tracing::warn!(error = %e, "auto refresh failed");
        }
    }

    async fn refresh_with(&self, refresh_token: &str) -> Result<AuthSession, TransportError> {
        let request = self
            .request(Method::POST, self.auth_url("token"), None)
            .query(&[("grant_type", "refresh_token")])
            .json(&json!({ "refresh_token": refresh_token }));

        let value = match self.send_json(request).await {
            Ok(value) => value,
            Err(e @ TransportError::Api { .. }) => {
                tracing::info!(error = %e, "refresh token rejected, dropping session");
                self.set_session(None, AuthEvent::SignedOut).await;
                return Err(e);
            }
            Err(e) => return Err(e),
        };

        let session = parse_session(value)?;
        tracing::debug!(user_id = %session.user.id, "session refreshed");
        self.set_session(Some(session.clone()), AuthEvent::TokenRefreshed)
            .await;
        Ok(session)
    }

    // -- Session bookkeeping ------------------------------------------------

    async fn set_session(&self, session: Option<AuthSession>, event: AuthEvent) {
        *self.session.lock().await = session.clone();
        if self.config.persist_session {
            self.persist(session.as_ref());
        }
        tracing::debug!(%event, "session changed");
        // An error here only means nobody is subscribed yet.
        let _ = self.events.send(AuthChange::new(event, session));
    }

    fn persist(&self, session: Option<&AuthSession>) {
        let key = &self.config.storage_key;
        let result = match session {
            Some(s) => JsonCodec
                .encode_string(s)
                .map_err(TransportError::from)
                .and_then(|text| self.store.set_item(key, &text)),
            None => self.store.remove_item(key),
        };
        if let Err(e) = result {
            tracing::warn!(error = %e, "failed to persist session");
        }
    }

    async fn access_token(&self) -> Option<String> {
        self.session
            .lock()
            .await
            .as_ref()
            .map(|s| s.access_token.clone())
    }

    // -- Request plumbing ---------------------------------------------------

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{path}", self.base_url)
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base_url)
    }

    fn request(&self, method: Method, url: String, bearer: Option<&str>) -> RequestBuilder {
        let anon_key = self.config.anon_key.as_str();
        self.http
            .request(method, url)
            .header("apikey", anon_key)
            .bearer_auth(bearer.unwrap_or(anon_key))
    }

    async fn send(&self, request: RequestBuilder) -> Result<String, TransportError> {
        let response = request
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        if !status.is_success() {
            let status = status.as_u16();
            let message = error_message(status, &text);
            tracing::debug!(status, %message, "backend rejected request");
            return Err(TransportError::Api { status, message });
        }
        Ok(text)
    }

    async fn send_json(&self, request: RequestBuilder) -> Result<Value, TransportError> {
        let text = self.send(request).await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| ProtocolError::Decode(e).into())
    }
}

impl AuthBackend for HttpBackend {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &UserMetadata,
    ) -> Result<AuthResponse, TransportError> {
        let request = self
            .request(Method::POST, self.auth_url("signup"), None)
            .json(&json!({ "email": email, "password": password, "data": metadata }));

        let response = parse_sign_up(self.send_json(request).await?)?;
        if let Some(session) = &response.session {
            self.set_session(Some(session.clone()), AuthEvent::SignedIn)
                .await;
        }
        tracing::info!(email, confirmed = response.session.is_some(), "sign-up accepted");
        Ok(response)
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, TransportError> {
        let request = self
            .request(Method::POST, self.auth_url("token"), None)
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }));

        let session = parse_session(self.send_json(request).await?)?;
        tracing::info!(user_id = %session.user.id, "signed in");
        self.set_session(Some(session.clone()), AuthEvent::SignedIn)
            .await;
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), TransportError> {
        let result = match self.access_token().await {
            Some(token) => {
                let request = self.request(Method::POST, self.auth_url("logout"), Some(&token));
                self.send(request).await.map(|_| ())
            }
            None => Ok(()),
        };

        // A token the provider no longer knows is already signed out.
        let result = match result {
            Err(TransportError::Api { status: 401 | 403 | 404, .. }) => Ok(()),
            other => other,
        };

        self.set_session(None, AuthEvent::SignedOut).await;
        tracing::info!(remote_ok = result.is_ok(), "signed out");
        result
    }

    async fn update_user(&self, metadata: &UserMetadata) -> Result<UserIdentity, TransportError> {
        let token = self
            .access_token()
            .await
            .ok_or(TransportError::NotAuthenticated)?;
        let request = self
            .request(Method::PUT, self.auth_url("user"), Some(&token))
            .json(&json!({ "data": metadata }));

        let user: UserIdentity = serde_json::from_value(self.send_json(request).await?)
            .map_err(ProtocolError::Decode)?;

        let updated = {
            let mut current = self.session.lock().await;
            if let Some(session) = current.as_mut() {
                session.user = user.clone();
            }
            current.clone()
        };
        self.set_session(updated, AuthEvent::UserUpdated).await;
        Ok(user)
    }

    async fn get_session(&self) -> Result<Option<AuthSession>, TransportError> {
        let current = self.session.lock().await.clone();
        match current {
            Some(session) if session.expires_within(now_unix(), EXPIRY_MARGIN_SECS) => {
                self.refresh_with(&session.refresh_token).await.map(Some)
            }
            other => Ok(other),
        }
    }

    async fn reset_password_for_email(
        &self,
        email: &str,
        redirect_to: Option<&str>,
    ) -> Result<(), TransportError> {
        let mut request = self
            .request(Method::POST, self.auth_url("recover"), None)
            .json(&json!({ "email": email }));
        if let Some(redirect_to) = redirect_to {
            request = request.query(&[("redirect_to", redirect_to)]);
        }
        self.send(request).await?;
        tracing::info!(email, "password recovery requested");
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthChange> {
        self.events.subscribe()
    }
}

impl TableBackend for HttpBackend {
    async fn select(&self, query: &TableQuery) -> Result<Vec<Value>, TransportError> {
        let token = self.access_token().await;
        let request = self
            .request(Method::GET, self.rest_url(&query.table), token.as_deref())
            .query(&query.to_query_pairs());

        match self.send_json(request).await? {
            Value::Array(rows) => Ok(rows),
            Value::Null => Ok(Vec::new()),
            other => Err(ProtocolError::InvalidMessage(format!(
                "expected an array of rows from {}, got {other}",
                query.table
            ))
            .into()),
        }
    }

    async fn insert(&self, table: &str, row: &Value) -> Result<Value, TransportError> {
        let token = self.access_token().await;
        let request = self
            .request(Method::POST, self.rest_url(table), token.as_deref())
            .header("Prefer", "return=representation")
            .json(row);

        match self.send_json(request).await? {
            Value::Array(mut rows) if !rows.is_empty() => Ok(rows.swap_remove(0)),
            obj @ Value::Object(_) => Ok(obj),
            _ => Err(ProtocolError::InvalidMessage(format!(
                "insert into {table} returned no row"
            ))
            .into()),
        }
    }

    async fn update(&self, query: &TableQuery, patch: &Value) -> Result<(), TransportError> {
        let token = self.access_token().await;
        let request = self
            .request(Method::PATCH, self.rest_url(&query.table), token.as_deref())
            .header("Prefer", "return=minimal")
            .query(&query.filter_pairs())
            .json(patch);
        self.send(request).await.map(|_| ())
    }

    async fn upsert(&self, table: &str, row: &Value) -> Result<(), TransportError> {
        let token = self.access_token().await;
        let request = self
            .request(Method::POST, self.rest_url(table), token.as_deref())
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(row);
        self.send(request).await.map(|_| ())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn now_unix() -> i64 {
    chrono::Utc::now().timestamp()
}

fn load_session(store: &dyn TokenStore, key: &str) -> Option<AuthSession> {
    let text = match store.get_item(key) {
        Ok(Some(text)) => text,
        Ok(None) => return None,
        Err(e) => {
            tracing::warn!(error = %e, "failed to read persisted session");
            return None;
        }
    };
    match JsonCodec.decode::<AuthSession>(text.as_bytes()) {
        Ok(session) => Some(session),
        Err(e) => {
            tracing::warn!(error = %e, "discarding unreadable persisted session");
            if let Err(e) = store.remove_item(key) {
                tracing::warn!(error = %e, "failed to remove persisted session");
            }
            None
        }
    }
}

fn parse_session(value: Value) -> Result<AuthSession, TransportError> {
    let session: AuthSession = serde_json::from_value(value).map_err(ProtocolError::Decode)?;
    Ok(session.with_expiry_from(now_unix()))
}

/// Sign-up answers with a full session when the account is usable right
/// away, and with the bare user (sometimes wrapped in `{"user": ...}`)
/// when email confirmation is pending.
fn parse_sign_up(value: Value) -> Result<AuthResponse, TransportError> {
    if value.get("access_token").is_some() {
        let session = parse_session(value)?;
        return Ok(AuthResponse {
            user: Some(session.user.clone()),
            session: Some(session),
        });
    }

    let nested = value.get("user").filter(|u| !u.is_null()).cloned();
    let user_value = nested.unwrap_or(value);
    if user_value.get("id").is_none() {
        return Err(ProtocolError::InvalidMessage(
            "sign-up response has neither a session nor a user".into(),
        )
        .into());
    }
    let user: UserIdentity = serde_json::from_value(user_value).map_err(ProtocolError::Decode)?;
    Ok(AuthResponse {
        user: Some(user),
        session: None,
    })
}

/// Pulls the human-readable message out of an error body.
///
/// The auth API uses `msg` or `error_description`, the table API uses
/// `message`; `error` is the last resort. A body that isn't JSON is
/// returned as-is.
pub fn error_message(status: u16, body: &str) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        for key in ["msg", "message", "error_description", "error"] {
            if let Some(Value::String(text)) = map.get(key) {
                if !text.is_empty() {
                    return text.clone();
                }
            }
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("request failed with status {status}")
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_prefers_msg() {
        let body = r#"{"code":422,"error_code":"user_already_exists","msg":"User already registered"}"#;
        assert_eq!(error_message(422, body), "User already registered");
    }

    #[test]
    fn test_error_message_reads_error_description() {
        let body = r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#;
        assert_eq!(error_message(400, body), "Invalid login credentials");
    }

    #[test]
    fn test_error_message_falls_back_to_error_then_body() {
        assert_eq!(error_message(500, r#"{"error":"boom"}"#), "boom");
        assert_eq!(error_message(502, "Bad Gateway"), "Bad Gateway");
        assert_eq!(error_message(503, "  "), "request failed with status 503");
    }

    #[test]
    fn test_parse_sign_up_with_session() {
        let value = json!({
            "access_token": "at",
            "refresh_token": "rt",
            "expires_in": 3600,
            "user": { "id": "u-1", "email": "a@b.com" }
        });

        let response = parse_sign_up(value).unwrap();

        let session = response.session.expect("session");
        assert!(session.expires_at.is_some());
        assert_eq!(response.user.unwrap().id.as_str(), "u-1");
    }

    #[test]
    fn test_parse_sign_up_confirmation_pending_returns_user_only() {
        let value = json!({ "id": "u-2", "email": "new@b.com", "confirmation_sent_at": "2025-03-09T10:00:00Z" });

        let response = parse_sign_up(value).unwrap();

        assert!(response.session.is_none());
        assert_eq!(response.user.unwrap().email.as_deref(), Some("new@b.com"));
    }

    #[test]
    fn test_parse_sign_up_wrapped_user() {
        let value = json!({ "user": { "id": "u-3" }, "session": null });
        let response = parse_sign_up(value).unwrap();
        assert_eq!(response.user.unwrap().id.as_str(), "u-3");
    }

    #[test]
    fn test_parse_sign_up_empty_object_is_invalid() {
        let result = parse_sign_up(json!({}));
        assert!(matches!(
            result,
            Err(TransportError::Protocol(ProtocolError::InvalidMessage(_)))
        ));
    }

    #[test]
    fn test_new_rejects_empty_url() {
        let config = BackendConfig {
            url: "  ".into(),
            ..BackendConfig::default()
        };
        let result = HttpBackend::new(config, crate::MemoryTokenStore::new());
        assert!(matches!(result, Err(TransportError::Config(_))));
    }

    #[test]
    fn test_new_discards_unreadable_persisted_session() {
        let store = crate::MemoryTokenStore::new();
        store.set_item("meak-auth-token", "garbage").unwrap();

        // `new` consumes the store, so check through a second handle.
        let shared = std::sync::Arc::new(store);
        let backend = HttpBackend::new(BackendConfig::default(), shared.clone()).unwrap();

        assert!(backend.session.try_lock().unwrap().is_none());
        assert_eq!(shared.get_item("meak-auth-token").unwrap(), None);
    }
}
