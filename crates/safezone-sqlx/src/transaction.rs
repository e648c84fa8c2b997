// Transaction adapter: wraps sqlx::Transaction to implement Adapter + TransactionAdapter.
//
// The transaction sits behind a tokio Mutex so `&self` adapter methods can
// use it across await points; `commit`/`rollback` take it out.

use async_trait::async_trait;
use tokio::sync::Mutex;

use safezone_core::db::adapter::{
    Adapter, AdapterResult, FindManyQuery, SchemaOptions, SchemaStatus, TransactionAdapter,
    WhereClause,
};
use safezone_core::db::schema::Schema;
use safezone_core::error::SafezoneError;

use crate::adapter::{
    bind_query, build_count, build_select, first_row_query, prepare_binds, query_error,
    read_count, row_to_json,
};
use crate::query_builder;

/// Transaction-scoped adapter. Every operation runs inside the wrapped
/// transaction; dropping it without `commit` rolls back.
pub struct SqlxTransactionAdapter {
    tx: Mutex<Option<sqlx::Transaction<'static, sqlx::Any>>>,
}

impl std::fmt::Debug for SqlxTransactionAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlxTransactionAdapter").finish()
    }
}

impl SqlxTransactionAdapter {
    pub fn new(tx: sqlx::Transaction<'static, sqlx::Any>) -> Self {
        Self {
            tx: Mutex::new(Some(tx)),
        }
    }
}

/// Bind a fragment and fetch all rows within the transaction.
macro_rules! tx_fetch_all {
    ($self:expr, $frag:expr) => {{
        let frag = $frag;
        let binds = prepare_binds(&frag.binds);
        let mut guard = $self.tx.lock().await;
        let tx = guard
            .as_mut()
            .ok_or_else(|| SafezoneError::Database("Transaction already consumed".into()))?;
        bind_query(&frag.sql, &binds)
            .fetch_all(&mut **tx)
            .await
            .map_err(query_error)
    }};
}

/// Bind a fragment and fetch at most one row within the transaction.
macro_rules! tx_fetch_optional {
    ($self:expr, $frag:expr) => {{
        let frag = $frag;
        let binds = prepare_binds(&frag.binds);
        let mut guard = $self.tx.lock().await;
        let tx = guard
            .as_mut()
            .ok_or_else(|| SafezoneError::Database("Transaction already consumed".into()))?;
        bind_query(&frag.sql, &binds)
            .fetch_optional(&mut **tx)
            .await
            .map_err(query_error)
    }};
}

#[async_trait]
impl Adapter for SqlxTransactionAdapter {
    async fn create(&self, model: &str, data: serde_json::Value) -> AdapterResult<serde_json::Value> {
        let row = tx_fetch_optional!(self, query_builder::build_insert(model, &data))?
            .ok_or_else(|| SafezoneError::Database(format!("Insert into {model} returned no row")))?;
        Ok(row_to_json(&row))
    }

    async fn find_one(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
    ) -> AdapterResult<Option<serde_json::Value>> {
        let row = tx_fetch_optional!(self, build_select(model, &first_row_query(where_clauses)))?;
        Ok(row.as_ref().map(row_to_json))
    }

    async fn find_many(
        &self,
        model: &str,
        query: FindManyQuery,
    ) -> AdapterResult<Vec<serde_json::Value>> {
        let rows = tx_fetch_all!(self, build_select(model, &query))?;
        Ok(rows.iter().map(row_to_json).collect())
    }

    async fn count(&self, model: &str, where_clauses: &[WhereClause]) -> AdapterResult<i64> {
        let row = tx_fetch_optional!(self, build_count(model, where_clauses))?
            .ok_or_else(|| SafezoneError::Database("Count returned no rows".into()))?;
        read_count(&row)
    }

    async fn update(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
        data: serde_json::Value,
    ) -> AdapterResult<Option<serde_json::Value>> {
        let row = tx_fetch_optional!(self, query_builder::build_update(model, where_clauses, &data))?;
        Ok(row.as_ref().map(row_to_json))
    }

    async fn increment(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
        field: &str,
        by: i64,
    ) -> AdapterResult<Option<serde_json::Value>> {
        let row = tx_fetch_optional!(
            self,
            query_builder::build_increment(model, where_clauses, field, by)
        )?;
        Ok(row.as_ref().map(row_to_json))
    }

    async fn create_schema(
        &self,
        _schema: &Schema,
        _options: &SchemaOptions,
    ) -> AdapterResult<SchemaStatus> {
        Err(SafezoneError::Database(
            "create_schema not supported inside a transaction".into(),
        ))
    }

    async fn begin_transaction(&self) -> AdapterResult<Box<dyn TransactionAdapter>> {
        Err(SafezoneError::Database(
            "Nested transactions are not supported".into(),
        ))
    }
}

#[async_trait]
impl TransactionAdapter for SqlxTransactionAdapter {
    async fn commit(self: Box<Self>) -> AdapterResult<()> {
        let tx = self
            .tx
            .into_inner()
            .ok_or_else(|| SafezoneError::Database("Transaction already consumed".into()))?;
        tx.commit()
            .await
            .map_err(|e| SafezoneError::Database(format!("Commit failed: {e}")))
    }

    async fn rollback(self: Box<Self>) -> AdapterResult<()> {
        let tx = self
            .tx
            .into_inner()
            .ok_or_else(|| SafezoneError::Database("Transaction already consumed".into()))?;
        tx.rollback()
            .await
            .map_err(|e| SafezoneError::Database(format!("Rollback failed: {e}")))
    }
}
