//! The `profiles` table.

use std::sync::Arc;

use meak_protocol::{Profile, UserId};
use meak_transport::TableBackend;
use serde_json::{Map, Value};

use crate::RemoteError;
use crate::rows::{fetch_by_id, now_timestamp, put_if_set};

const TABLE: &str = "profiles";

/// Fields to change on a profile. `None` and empty strings are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub postal_code: Option<String>,
    pub avatar_url: Option<String>,
}

impl ProfileUpdate {
    fn to_row(&self, user_id: &UserId) -> Value {
        let mut row = Map::new();
        row.insert("id".into(), Value::String(user_id.to_string()));
        put_if_set(&mut row, "first_name", self.first_name.as_deref());
        put_if_set(&mut row, "last_name", self.last_name.as_deref());
        put_if_set(&mut row, "phone", self.phone.as_deref());
        put_if_set(&mut row, "postal_code", self.postal_code.as_deref());
        put_if_set(&mut row, "avatar_url", self.avatar_url.as_deref());
        row.insert("updated_at".into(), Value::String(now_timestamp()));
        Value::Object(row)
    }
}

pub struct ProfilesService<B: TableBackend> {
    backend: Arc<B>,
}

impl<B: TableBackend> ProfilesService<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    pub async fn get_profile(&self, user_id: &UserId) -> Result<Profile, RemoteError> {
        fetch_by_id(self.backend.as_ref(), TABLE, user_id.as_str()).await
    }

    /// Creates the profile row or merges the given fields into it, always
    /// bumping `updated_at`.
    pub async fn upsert_profile(
        &self,
        user_id: &UserId,
        update: &ProfileUpdate,
    ) -> Result<(), RemoteError> {
        self.backend.upsert(TABLE, &update.to_row(user_id)).await?;
        tracing::debug!(%user_id, "profile upserted");
        Ok(())
    }
}

impl<B: TableBackend> Clone for ProfilesService<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
        }
    }
}
