// Typed record store built on top of the raw Adapter trait.
//
// Adapters speak JSON rows keyed by table name; `Records` maps those rows to
// the record structs in `safezone_core::db::models`. The same `Records`
// methods run against the shared adapter or inside a transaction.

use std::sync::Arc;

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use safezone_core::db::adapter::{
    Adapter, FindManyQuery, SchemaOptions, SchemaStatus, SortBy, TransactionAdapter, WhereClause,
};
use safezone_core::db::models::{
    status, CommunityTask, GlobalAlert, HelpRequest, NewCommunityTask, NewGlobalAlert,
    NewHelpRequest, NewPointsHistory, NewTask, NewUser, PointsHistory, Task, User,
};
use safezone_core::db::schema::{tables, Schema};
use safezone_core::error::{Result, SafezoneError};
use safezone_core::rank::compute_rank;

/// Shared handle to the storage backend.
#[derive(Debug, Clone)]
pub struct Store {
    adapter: Arc<dyn Adapter>,
}

impl Store {
    pub fn new(adapter: Arc<dyn Adapter>) -> Self {
        Self { adapter }
    }

    /// Typed operations outside any transaction.
    pub fn records(&self) -> Records<'_, dyn Adapter> {
        Records { db: &*self.adapter }
    }

    /// Create the SafeZone tables if they are missing.
    pub async fn ensure_schema(&self) -> Result<SchemaStatus> {
        self.adapter
            .create_schema(&Schema::safezone(), &SchemaOptions { auto_migrate: true })
            .await
    }

    pub async fn begin(&self) -> Result<StoreTx> {
        Ok(StoreTx {
            tx: self.adapter.begin_transaction().await?,
        })
    }
}

/// An open transaction. Dropping it without `commit` rolls back.
pub struct StoreTx {
    tx: Box<dyn TransactionAdapter>,
}

impl std::fmt::Debug for StoreTx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreTx").finish_non_exhaustive()
    }
}

impl StoreTx {
    pub fn records(&self) -> Records<'_, dyn TransactionAdapter> {
        Records { db: &*self.tx }
    }

    pub async fn commit(self) -> Result<()> {
        self.tx.commit().await
    }

    pub async fn rollback(self) -> Result<()> {
        self.tx.rollback().await
    }

    /// Commit when `result` is `Ok`, roll back otherwise, and hand the
    /// result back.
    pub async fn finish<T, E>(self, result: std::result::Result<T, E>) -> std::result::Result<T, E>
    where
        E: From<SafezoneError>,
    {
        match result {
            Ok(value) => {
                self.commit().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = self.rollback().await {
                    tracing::warn!(error = %rollback_err, "transaction rollback failed");
                }
                Err(err)
            }
        }
    }
}

fn from_row<T: DeserializeOwned>(model: &str, row: Value) -> Result<T> {
    serde_json::from_value(row)
        .map_err(|e| SafezoneError::Database(format!("Failed to decode {model} row: {e}")))
}

fn from_rows<T: DeserializeOwned>(model: &str, rows: Vec<Value>) -> Result<Vec<T>> {
    rows.into_iter().map(|row| from_row(model, row)).collect()
}

fn by_id(id: i64) -> [WhereClause; 1] {
    [WhereClause::eq("id", id)]
}

const TOGGLE_ATTEMPTS: usize = 5;

fn editable_task_fields(task: &Task) -> Value {
    serde_json::json!({
        "title": task.title,
        "description": task.description,
        "category": task.category,
        "priority": task.priority,
        "status": task.status,
        "points": task.points,
        "due_date": task.due_date,
        "assigned_to": task.assigned_to,
        "location": task.location,
    })
}

/// Typed operations over any adapter, including a transaction.
pub struct Records<'a, A: ?Sized> {
    db: &'a A,
}

impl<'a, A: Adapter + ?Sized> Records<'a, A> {
    /// Insert a record, stamping `created_at`, and decode the stored row.
    async fn insert<N: Serialize, R: DeserializeOwned>(&self, model: &str, record: &N) -> Result<R> {
        let mut data = serde_json::to_value(record)
            .map_err(|e| SafezoneError::Other(format!("Failed to encode {model} row: {e}")))?;
        if let Some(obj) = data.as_object_mut() {
            obj.insert("created_at".into(), Value::String(Utc::now().to_rfc3339()));
        }
        let row = self.db.create(model, data).await?;
        from_row(model, row)
    }

    async fn find<R: DeserializeOwned>(&self, model: &str, id: i64) -> Result<Option<R>> {
        self.db
            .find_one(model, &by_id(id))
            .await?
            .map(|row| from_row(model, row))
            .transpose()
    }

    async fn list<R: DeserializeOwned>(&self, model: &str, query: FindManyQuery) -> Result<Vec<R>> {
        from_rows(model, self.db.find_many(model, query).await?)
    }

    async fn update<R: DeserializeOwned>(&self, model: &str, id: i64, data: Value) -> Result<Option<R>> {
        self.update_where(model, id, &[], data).await
    }

    /// Update row `id` only while it also matches `guard`; `None` when it
    /// does not.
    async fn update_where<R: DeserializeOwned>(
        &self,
        model: &str,
        id: i64,
        guard: &[WhereClause],
        data: Value,
    ) -> Result<Option<R>> {
        let mut clauses = by_id(id).to_vec();
        clauses.extend_from_slice(guard);
        self.db
            .update(model, &clauses, data)
            .await?
            .map(|row| from_row(model, row))
            .transpose()
    }

    async fn increment<R: DeserializeOwned>(
        &self,
        model: &str,
        id: i64,
        field: &str,
        by: i64,
    ) -> Result<Option<R>> {
        self.db
            .increment(model, &by_id(id), field, by)
            .await?
            .map(|row| from_row(model, row))
            .transpose()
    }

    // ─── Users ───────────────────────────────────────────────────

    pub async fn create_user(&self, user: &NewUser) -> Result<User> {
        self.insert(tables::USERS, user).await
    }

    pub async fn find_user(&self, id: i64) -> Result<Option<User>> {
        self.find(tables::USERS, id).await
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.db
            .find_one(tables::USERS, &[WhereClause::eq("email", email)])
            .await?
            .map(|row| from_row(tables::USERS, row))
            .transpose()
    }

    /// Add `delta` to a user's points, recompute the rank from the new
    /// total and append the ledger entry. Call inside a transaction.
    pub async fn award_points(&self, user_id: i64, delta: i64, kind: &str, description: &str) -> Result<User> {
        let mut user: User = self
            .increment(tables::USERS, user_id, "points", delta)
            .await?
            .ok_or_else(|| SafezoneError::Database(format!("user {user_id} vanished during award")))?;

        let rank = compute_rank(user.points);
        if user.rank != rank {
            user = self
                .update(tables::USERS, user_id, serde_json::json!({ "rank": rank }))
                .await?
                .ok_or_else(|| SafezoneError::Database(format!("user {user_id} vanished during award")))?;
        }

        self.add_points_entry(&NewPointsHistory {
            user_id,
            kind: kind.to_string(),
            description: description.to_string(),
            points: delta,
        })
        .await?;

        tracing::info!(user_id, delta, total = user.points, rank = %user.rank, kind, "awarded points");
        Ok(user)
    }

    // ─── Points history ──────────────────────────────────────────

    pub async fn add_points_entry(&self, entry: &NewPointsHistory) -> Result<PointsHistory> {
        self.insert(tables::POINTS_HISTORY, entry).await
    }

    /// A user's ledger, newest first.
    pub async fn points_history(&self, user_id: i64) -> Result<Vec<PointsHistory>> {
        self.list(
            tables::POINTS_HISTORY,
            FindManyQuery::default()
                .filter(WhereClause::eq("user_id", user_id))
                .sorted(SortBy::desc("id")),
        )
        .await
    }

    // ─── Tasks ───────────────────────────────────────────────────

    pub async fn list_tasks(&self) -> Result<Vec<Task>> {
        self.list(tables::TASKS, FindManyQuery::default().sorted(SortBy::asc("id")))
            .await
    }

    pub async fn find_task(&self, id: i64) -> Result<Option<Task>> {
        self.find(tables::TASKS, id).await
    }

    pub async fn create_task(&self, task: &NewTask) -> Result<Task> {
        self.insert(tables::TASKS, task).await
    }

    /// Write the editable fields of `task` back to its row.
    pub async fn save_task(&self, task: &Task) -> Result<Option<Task>> {
        self.update(tables::TASKS, task.id, editable_task_fields(task)).await
    }

    /// Like `save_task`, but only while the stored row is not yet completed.
    /// `None` means another request completed it first.
    pub async fn save_task_completion(&self, task: &Task) -> Result<Option<Task>> {
        self.update_where(
            tables::TASKS,
            task.id,
            &[WhereClause::ne("status", status::COMPLETED)],
            editable_task_fields(task),
        )
        .await
    }

    // ─── Help requests ───────────────────────────────────────────

    /// All help requests, newest first.
    pub async fn list_help_requests(&self) -> Result<Vec<HelpRequest>> {
        self.list(tables::HELP_REQUESTS, FindManyQuery::default().sorted(SortBy::desc("id")))
            .await
    }

    pub async fn find_help_request(&self, id: i64) -> Result<Option<HelpRequest>> {
        self.find(tables::HELP_REQUESTS, id).await
    }

    pub async fn create_help_request(&self, request: &NewHelpRequest) -> Result<HelpRequest> {
        self.insert(tables::HELP_REQUESTS, request).await
    }

    /// Count one more responder; once enough have answered the request moves
    /// to "in_progress".
    pub async fn add_responder(&self, id: i64) -> Result<Option<HelpRequest>> {
        let Some(request) = self
            .increment::<HelpRequest>(tables::HELP_REQUESTS, id, "responders_count", 1)
            .await?
        else {
            return Ok(None);
        };

        if request.responders_count >= request.responders_needed && request.status != status::IN_PROGRESS {
            return self
                .update(
                    tables::HELP_REQUESTS,
                    id,
                    serde_json::json!({ "status": status::IN_PROGRESS }),
                )
                .await;
        }
        Ok(Some(request))
    }

    // ─── Global alerts ───────────────────────────────────────────

    /// All alerts, newest first.
    pub async fn list_global_alerts(&self) -> Result<Vec<GlobalAlert>> {
        self.list(tables::GLOBAL_ALERTS, FindManyQuery::default().sorted(SortBy::desc("id")))
            .await
    }

    pub async fn find_global_alert(&self, id: i64) -> Result<Option<GlobalAlert>> {
        self.find(tables::GLOBAL_ALERTS, id).await
    }

    pub async fn create_global_alert(&self, alert: &NewGlobalAlert) -> Result<GlobalAlert> {
        self.insert(tables::GLOBAL_ALERTS, alert).await
    }

    pub async fn acknowledge_alert(&self, id: i64) -> Result<Option<GlobalAlert>> {
        self.increment(tables::GLOBAL_ALERTS, id, "acknowledged_count", 1)
            .await
    }

    /// Flip `is_active`. The write is conditioned on the value just read, and
    /// a lost race re-reads and tries again.
    pub async fn toggle_alert(&self, id: i64) -> Result<Option<GlobalAlert>> {
        for _ in 0..TOGGLE_ATTEMPTS {
            let Some(alert) = self.find_global_alert(id).await? else {
                return Ok(None);
            };
            let toggled = self
                .update_where(
                    tables::GLOBAL_ALERTS,
                    id,
                    &[WhereClause::eq("is_active", alert.is_active)],
                    serde_json::json!({ "is_active": !alert.is_active }),
                )
                .await?;
            if toggled.is_some() {
                return Ok(toggled);
            }
        }
        Err(SafezoneError::Database(format!(
            "global alert {id} kept changing while toggling"
        )))
    }

    // ─── Community tasks ─────────────────────────────────────────

    /// Open community tasks, newest first.
    pub async fn list_open_community_tasks(&self) -> Result<Vec<CommunityTask>> {
        self.list(
            tables::COMMUNITY_TASKS,
            FindManyQuery::default()
                .filter(WhereClause::eq("status", status::OPEN))
                .sorted(SortBy::desc("id")),
        )
        .await
    }

    pub async fn count_community_tasks(&self) -> Result<i64> {
        self.db.count(tables::COMMUNITY_TASKS, &[]).await
    }

    pub async fn find_community_task(&self, id: i64) -> Result<Option<CommunityTask>> {
        self.find(tables::COMMUNITY_TASKS, id).await
    }

    pub async fn create_community_task(&self, task: &NewCommunityTask) -> Result<CommunityTask> {
        self.insert(tables::COMMUNITY_TASKS, task).await
    }

    /// Mark an open community task as taken by `volunteer`. `None` when the
    /// task is missing or no longer open.
    pub async fn assign_community_task(&self, id: i64, volunteer: &User) -> Result<Option<CommunityTask>> {
        self.update_where(
            tables::COMMUNITY_TASKS,
            id,
            &[WhereClause::eq("status", status::OPEN)],
            serde_json::json!({
                "status": status::ASSIGNED,
                "volunteer_id": volunteer.id,
                "volunteer_name": volunteer.display_name(),
            }),
        )
        .await
    }
}
