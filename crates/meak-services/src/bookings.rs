//! The `tasks` table: bookings from both sides.
//!
//! A client books a task; a provider ("tasker") gets assigned to it. The
//! status column moves through `pending → assigned → in_progress →
//! completed`, or to `cancelled`. The backend enforces the transitions,
//! so nothing here checks them.

use std::sync::Arc;

use meak_protocol::{Task, TaskStatus, UserId};
use meak_transport::{TableBackend, TableQuery};
use serde::Serialize;
use serde_json::json;

use crate::RemoteError;
use crate::rows::{decode, decode_all, fetch_by_id, now_timestamp};

const TABLE: &str = "tasks";

/// What a client fills in to book a task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub postal_code: String,
    pub location: Option<String>,
    pub scheduled_for: Option<String>,
}

/// The inserted row. Absent optionals are left out so the column
/// defaults apply.
#[derive(Serialize)]
struct NewTaskRow<'a> {
    title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    status: TaskStatus,
    postal_code: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<&'a str>,
    client_id: &'a UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    scheduled_for: Option<&'a str>,
    created_at: &'a str,
    updated_at: &'a str,
}

pub struct BookingsService<B: TableBackend> {
    backend: Arc<B>,
}

impl<B: TableBackend> BookingsService<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    /// Tasks booked by `client_id`, newest first.
    pub async fn client_tasks(&self, client_id: &UserId) -> Result<Vec<Task>, RemoteError> {
        self.tasks_where("client_id", client_id).await
    }

    /// Tasks assigned to `tasker_id`, newest first.
    pub async fn provider_tasks(&self, tasker_id: &UserId) -> Result<Vec<Task>, RemoteError> {
        self.tasks_where("tasker_id", tasker_id).await
    }

    async fn tasks_where(&self, column: &str, id: &UserId) -> Result<Vec<Task>, RemoteError> {
        let query = TableQuery::from(TABLE)
            .eq(column, id.as_str())
            .order("created_at", false);
        let rows = self.backend.select(&query).await?;
        decode_all(TABLE, rows)
    }

    pub async fn task_by_id(&self, task_id: &str) -> Result<Task, RemoteError> {
        fetch_by_id(self.backend.as_ref(), TABLE, task_id).await
    }

    /// Books a new task in `pending` and returns it as stored.
    pub async fn create_task(&self, client_id: &UserId, task: &NewTask) -> Result<Task, RemoteError> {
        let now = now_timestamp();
        let row = NewTaskRow {
            title: &task.title,
            description: task.description.as_deref(),
            status: TaskStatus::Pending,
            postal_code: &task.postal_code,
            location: task.location.as_deref(),
            client_id,
            scheduled_for: task.scheduled_for.as_deref(),
            created_at: &now,
            updated_at: &now,
        };
        let row = serde_json::to_value(&row).map_err(|source| RemoteError::Decode {
            table: TABLE,
            source,
        })?;

        let stored = self.backend.insert(TABLE, &row).await?;
        let task: Task = decode(TABLE, stored)?;
        tracing::info!(task_id = %task.id, %client_id, "task created");
        Ok(task)
    }

    /// Sets the status. Moving to `completed` also stamps `completed_at`.
    pub async fn update_task_status(&self, task_id: &str, status: TaskStatus) -> Result<(), RemoteError> {
        let now = now_timestamp();
        let mut patch = json!({ "status": status, "updated_at": now });
        if status == TaskStatus::Completed {
            patch["completed_at"] = json!(now);
        }
        self.update(task_id, &patch).await?;
        tracing::info!(task_id, %status, "task status updated");
        Ok(())
    }

    /// Gives the task to a provider and moves it to `assigned`.
    pub async fn assign_task(&self, task_id: &str, tasker_id: &UserId) -> Result<(), RemoteError> {
        let patch = json!({
            "tasker_id": tasker_id,
            "status": TaskStatus::Assigned,
            "updated_at": now_timestamp(),
        });
        self.update(task_id, &patch).await?;
        tracing::info!(task_id, %tasker_id, "task assigned");
        Ok(())
    }

    pub async fn cancel_task(&self, task_id: &str) -> Result<(), RemoteError> {
        let patch = json!({
            "status": TaskStatus::Cancelled,
            "updated_at": now_timestamp(),
        });
        self.update(task_id, &patch).await?;
        tracing::info!(task_id, "task cancelled");
        Ok(())
    }

    async fn update(&self, task_id: &str, patch: &serde_json::Value) -> Result<(), RemoteError> {
        let query = TableQuery::from(TABLE).eq("id", task_id);
        self.backend.update(&query, patch).await?;
        Ok(())
    }
}

impl<B: TableBackend> Clone for BookingsService<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
        }
    }
}
