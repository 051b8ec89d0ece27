//! Row helpers shared by the services.

use chrono::{SecondsFormat, Utc};
use meak_transport::{TableBackend, TableQuery};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::RemoteError;

/// The current time as the backend stores it (RFC 3339, UTC, millis).
pub(crate) fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn decode<T: DeserializeOwned>(table: &'static str, row: Value) -> Result<T, RemoteError> {
    serde_json::from_value(row).map_err(|source| RemoteError::Decode { table, source })
}

pub(crate) fn decode_all<T: DeserializeOwned>(
    table: &'static str,
    rows: Vec<Value>,
) -> Result<Vec<T>, RemoteError> {
    rows.into_iter().map(|row| decode(table, row)).collect()
}

/// Fetches the row of `table` whose `id` is `id`.
pub(crate) async fn fetch_by_id<B, T>(backend: &B, table: &'static str, id: &str) -> Result<T, RemoteError>
where
    B: TableBackend,
    T: DeserializeOwned,
{
    let query = TableQuery::from(table).eq("id", id).limit(1);
    let row = backend
        .select(&query)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| RemoteError::NotFound {
            table,
            id: id.to_string(),
        })?;
    decode(table, row)
}

/// Inserts `value` under `key` only when it is present and non-empty.
pub(crate) fn put_if_set(row: &mut serde_json::Map<String, Value>, key: &str, value: Option<&str>) {
    if let Some(v) = value.filter(|v| !v.is_empty()) {
        row.insert(key.to_string(), Value::String(v.to_string()));
    }
}
