//! Wire types shared by every Meak crate.
//!
//! These are the shapes that travel between the client and the remote
//! backend: the identity provider's user and session objects, the
//! session-change notifications, and the rows of the `profiles`, `tasks`
//! and `reviews` tables.
//!
//! The backend owns the schema. Nothing here enforces it beyond what serde
//! needs to parse a row, so unknown fields are ignored and most columns are
//! optional.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// The identity provider's opaque user identifier (a UUID string in
/// practice, but the client never looks inside it).
///
/// `#[serde(transparent)]` keeps it a plain JSON string on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

// ---------------------------------------------------------------------------
// UserMetadata
// ---------------------------------------------------------------------------

/// Free-form profile fields stored by the identity provider alongside the
/// user (`user_metadata` on the wire).
///
/// Every field is optional. When used as a patch, `None` means "leave this
/// field alone", which is why `None` fields are skipped when serializing.
/// Keys the client doesn't know about are kept in `extra` so they survive a
/// round trip untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl UserMetadata {
    /// Copies every field that is set in `patch` over the matching field in
    /// `self`. Fields left as `None` in the patch are untouched.
    pub fn merge(&mut self, patch: &UserMetadata) {
        fn take(dst: &mut Option<String>, src: &Option<String>) {
            if let Some(value) = src {
                *dst = Some(value.clone());
            }
        }

        take(&mut self.full_name, &patch.full_name);
        take(&mut self.first_name, &patch.first_name);
        take(&mut self.last_name, &patch.last_name);
        take(&mut self.phone, &patch.phone);
        take(&mut self.postal_code, &patch.postal_code);
        take(&mut self.avatar_url, &patch.avatar_url);
        for (key, value) in &patch.extra {
            self.extra.insert(key.clone(), value.clone());
        }
    }

    /// Returns `true` if the patch would change nothing.
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none()
            && self.first_name.is_none()
            && self.last_name.is_none()
            && self.phone.is_none()
            && self.postal_code.is_none()
            && self.avatar_url.is_none()
            && self.extra.is_empty()
    }
}

// ---------------------------------------------------------------------------
// UserIdentity
// ---------------------------------------------------------------------------

/// The signed-in user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: UserId,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub email_confirmed_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,

    /// Profile fields. Called `user_metadata` by the provider.
    #[serde(rename = "user_metadata", default)]
    pub metadata: UserMetadata,
}

impl UserIdentity {
    /// Creates an identity with just an id and email, everything else empty.
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: UserId(id.into()),
            email: Some(email.into()),
            email_confirmed_at: None,
            created_at: None,
            metadata: UserMetadata::default(),
        }
    }

    /// The name to show for this user: `full_name` if present, otherwise
    /// `first_name last_name`, otherwise `None`.
    pub fn display_name(&self) -> Option<String> {
        if let Some(full) = &self.metadata.full_name {
            return Some(full.clone());
        }
        match (&self.metadata.first_name, &self.metadata.last_name) {
            (Some(first), Some(last)) => Some(format!("{first} {last}")),
            (Some(first), None) => Some(first.clone()),
            (None, Some(last)) => Some(last.clone()),
            (None, None) => None,
        }
    }

    /// The avatar URL from the user's metadata, if any.
    pub fn avatar_url(&self) -> Option<&str> {
        self.metadata.avatar_url.as_deref()
    }
}

// ---------------------------------------------------------------------------
// AuthSession
// ---------------------------------------------------------------------------

/// An authenticated session: the tokens plus the user they belong to.
///
/// This is also the exact JSON that gets persisted in the token store, so
/// a session survives process restarts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,

    #[serde(default = "default_token_type")]
    pub token_type: String,

    /// Lifetime of the access token in seconds, as issued.
    #[serde(default)]
    pub expires_in: i64,

    /// Absolute expiry as a unix timestamp (seconds). The provider doesn't
    /// always send it; see [`AuthSession::with_expiry_from`].
    #[serde(default)]
    pub expires_at: Option<i64>,

    pub user: UserIdentity,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl AuthSession {
    /// Fills in `expires_at` from `expires_in` if the provider left it out.
    pub fn with_expiry_from(mut self, now_unix: i64) -> Self {
        if self.expires_at.is_none() {
            self.expires_at = Some(now_unix + self.expires_in);
        }
        self
    }

    /// Returns `true` if the access token expires within `margin_secs` of
    /// `now_unix` (or has already expired). A session with no known expiry
    /// is treated as expiring.
    pub fn expires_within(&self, now_unix: i64, margin_secs: i64) -> bool {
        match self.expires_at {
            Some(at) => at - now_unix <= margin_secs,
            None => true,
        }
    }
}

/// The provider's answer to a sign-up or sign-in.
///
/// A sign-up that still needs email confirmation carries a `user` but no
/// `session`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthResponse {
    pub user: Option<UserIdentity>,
    pub session: Option<AuthSession>,
}

// ---------------------------------------------------------------------------
// Session-change notifications
// ---------------------------------------------------------------------------

/// What happened to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthEvent {
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
}

impl fmt::Display for AuthEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::SignedIn => "SIGNED_IN",
            Self::SignedOut => "SIGNED_OUT",
            Self::TokenRefreshed => "TOKEN_REFRESHED",
            Self::UserUpdated => "USER_UPDATED",
        };
        f.write_str(name)
    }
}

/// A push notification delivered on every session change: sign-in
/// elsewhere, token refresh, sign-out.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthChange {
    pub event: AuthEvent,
    pub session: Option<AuthSession>,
}

impl AuthChange {
    pub fn new(event: AuthEvent, session: Option<AuthSession>) -> Self {
        Self { event, session }
    }

    /// The user carried by this notification, if the session is active.
    pub fn user(&self) -> Option<&UserIdentity> {
        self.session.as_ref().map(|s| &s.user)
    }
}

// ---------------------------------------------------------------------------
// Table rows
// ---------------------------------------------------------------------------

/// A row of the `profiles` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: UserId,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Lifecycle of a booked task.
///
/// ```text
/// Pending ──(assign)──→ Assigned ──→ InProgress ──→ Completed
///    └──────────────(cancel, from any open state)──→ Cancelled
/// ```
///
/// The client doesn't enforce these transitions; the backend does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Assigned,
    InProgress,
    Completed,
    Cancelled,
}

impl TaskStatus {
    /// The value stored in the `status` column.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Assigned => "assigned",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A row of the `tasks` table (a booking).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: TaskStatus,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub location: Option<String>,
    pub postal_code: String,
    pub client_id: UserId,
    #[serde(default)]
    pub tasker_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Kept as the backend's string; the column has no timezone.
    #[serde(default)]
    pub scheduled_for: Option<String>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

/// A row of the `reviews` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: String,
    pub task_id: String,
    pub reviewer_id: UserId,
    pub reviewee_id: UserId,
    pub rating: i32,
    #[serde(default)]
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

// =========================================================================
// Tests
// =========================================================================
