// Database adapter trait: the storage abstraction every backend implements.
//
// Adapters work on `serde_json::Value` rows keyed by table name so they stay
// schema-agnostic; the typed `Store` in the `safezone` crate maps rows to
// record structs. Records are never deleted, so there is no delete operation.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::db::schema::Schema;
use crate::error::SafezoneError;

/// Result type for adapter operations.
pub type AdapterResult<T> = std::result::Result<T, SafezoneError>;

// ─── Where Clause ────────────────────────────────────────────────

/// Comparison operators for WHERE clauses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    #[default]
    Eq,
    Ne,
}

/// A single WHERE condition. Clauses in a list are joined with AND.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhereClause {
    pub field: String,
    pub value: serde_json::Value,
    #[serde(default)]
    pub operator: Operator,
}

impl WhereClause {
    /// Simple equality filter.
    pub fn eq(field: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
            operator: Operator::Eq,
        }
    }

    pub fn ne(field: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Self {
            operator: Operator::Ne,
            ..Self::eq(field, value)
        }
    }
}

// ─── Sort / Limit ───────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SortBy {
    pub field: String,
    pub direction: SortDirection,
}

impl SortBy {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// Query parameters for `find_many`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FindManyQuery {
    pub where_clauses: Vec<WhereClause>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<SortBy>,
}

impl FindManyQuery {
    pub fn filter(mut self, clause: WhereClause) -> Self {
        self.where_clauses.push(clause);
        self
    }

    pub fn sorted(mut self, sort_by: SortBy) -> Self {
        self.sort_by = Some(sort_by);
        self
    }
}

// ─── Schema status ───────────────────────────────────────────────

/// Result of `create_schema`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SchemaStatus {
    UpToDate,
    /// Statements that were (or, with `auto_migrate: false`, would be) run.
    NeedsMigration { statements: Vec<String> },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaOptions {
    /// If true, apply the pending statements.
    #[serde(default)]
    pub auto_migrate: bool,
}

// ─── Adapter Trait ───────────────────────────────────────────────

/// The core database adapter trait.
///
/// Implemented by the SQLx backend and the in-memory backend. Row ids are
/// 64-bit integers assigned by the backend on `create` when the row has no
/// `id`, increasing monotonically per table.
#[async_trait]
pub trait Adapter: Send + Sync + fmt::Debug {
    /// Insert a row and return it as stored, including the assigned `id`.
    async fn create(&self, model: &str, data: serde_json::Value)
        -> AdapterResult<serde_json::Value>;

    async fn find_one(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
    ) -> AdapterResult<Option<serde_json::Value>>;

    async fn find_many(
        &self,
        model: &str,
        query: FindManyQuery,
    ) -> AdapterResult<Vec<serde_json::Value>>;

    async fn count(&self, model: &str, where_clauses: &[WhereClause]) -> AdapterResult<i64>;

    /// Update the first row matching the WHERE clauses with the fields in
    /// `data`. Returns the updated row, or `None` if nothing matched.
    async fn update(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
        data: serde_json::Value,
    ) -> AdapterResult<Option<serde_json::Value>>;

    /// Atomically add `by` to an integer column (`SET field = field + by`)
    /// and return the updated row.
    async fn increment(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
        field: &str,
        by: i64,
    ) -> AdapterResult<Option<serde_json::Value>>;

    /// Compare the live store against `schema` and create what is missing.
    async fn create_schema(
        &self,
        schema: &Schema,
        options: &SchemaOptions,
    ) -> AdapterResult<SchemaStatus>;

    /// Begin a transaction. The returned adapter runs every operation inside
    /// it until `commit` or `rollback`.
    async fn begin_transaction(&self) -> AdapterResult<Box<dyn TransactionAdapter>>;
}

/// Extension of [`Adapter`] for transaction contexts.
#[async_trait]
pub trait TransactionAdapter: Adapter {
    async fn commit(self: Box<Self>) -> AdapterResult<()>;

    async fn rollback(self: Box<Self>) -> AdapterResult<()>;
}
