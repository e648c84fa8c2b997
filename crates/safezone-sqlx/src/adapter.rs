// SqlxAdapter: implementation of the core Adapter trait using sqlx::Any.
//
// The `Any` driver lets one pool type serve SQLite and Postgres. Inserts and
// updates use `RETURNING *` so the stored row, including its assigned id,
// comes back in the same statement.

use async_trait::async_trait;
use sqlx::any::{AnyArguments, AnyPoolOptions, AnyRow};
use sqlx::query::Query;
use sqlx::{Any, AnyPool, Column, Row};

use safezone_core::db::adapter::{
    Adapter, AdapterResult, FindManyQuery, SchemaOptions, SchemaStatus, TransactionAdapter,
    WhereClause,
};
use safezone_core::db::schema::Schema;
use safezone_core::error::SafezoneError;

use crate::query_builder::{self, SqlFragment};
use crate::schema::{self, DatabaseType};
use crate::transaction::SqlxTransactionAdapter;

/// SQLx-based database adapter.
#[derive(Debug, Clone)]
pub struct SqlxAdapter {
    pool: AnyPool,
    db_type: DatabaseType,
}

impl SqlxAdapter {
    pub fn new(pool: AnyPool, db_type: DatabaseType) -> Self {
        Self { pool, db_type }
    }

    /// Connect to a database URL (`sqlite:...` or `postgres://...`).
    pub async fn connect(url: &str) -> Result<Self, SafezoneError> {
        let db_type = DatabaseType::from_url(url)?;
        sqlx::any::install_default_drivers();

        // Every connection to "sqlite::memory:" opens a separate database,
        // and closing the last one drops it.
        let in_memory = url.contains(":memory:") || url.contains("mode=memory");
        let max_connections = if in_memory { 1 } else { 10 };
        let mut pool_options = AnyPoolOptions::new().max_connections(max_connections);
        if in_memory {
            pool_options = pool_options.idle_timeout(None).max_lifetime(None);
        }
        let pool = pool_options
            .connect(url)
            .await
            .map_err(|e| SafezoneError::Database(format!("Database connection failed: {e}")))?;

        tracing::debug!(?db_type, max_connections, "connected to database");
        Ok(Self { pool, db_type })
    }

    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    pub fn database_type(&self) -> DatabaseType {
        self.db_type
    }

    /// DDL that `create_schema` would run right now.
    pub async fn pending_statements(&self, schema: &Schema) -> Result<Vec<String>, SafezoneError> {
        schema::pending_statements(&self.pool, self.db_type, schema).await
    }
}

/// Convert an `AnyRow` into a JSON object.
pub(crate) fn row_to_json(row: &AnyRow) -> serde_json::Value {
    let mut map = serde_json::Map::new();

    for col in row.columns() {
        let name = col.name();
        let value = if let Ok(v) = row.try_get::<String, _>(name) {
            serde_json::Value::String(v)
        } else if let Ok(v) = row.try_get::<i64, _>(name) {
            serde_json::Value::Number(v.into())
        } else if let Ok(v) = row.try_get::<i32, _>(name) {
            serde_json::Value::Number(v.into())
        } else if let Ok(v) = row.try_get::<f64, _>(name) {
            serde_json::Number::from_f64(v)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null)
        } else if let Ok(v) = row.try_get::<bool, _>(name) {
            serde_json::Value::Bool(v)
        } else {
            // NULL or unsupported type
            serde_json::Value::Null
        };

        map.insert(name.to_string(), value);
    }

    serde_json::Value::Object(map)
}

/// Owned bind value, so the query can borrow from it.
#[derive(Debug, Clone)]
pub(crate) enum BindValue {
    Text(String),
    Int(i64),
    Float(f64),
    Null,
}

pub(crate) fn prepare_binds(binds: &[serde_json::Value]) -> Vec<BindValue> {
    binds
        .iter()
        .map(|v| match v {
            serde_json::Value::String(s) => BindValue::Text(s.clone()),
            serde_json::Value::Number(n) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => BindValue::Int(i),
                (None, Some(f)) => BindValue::Float(f),
                (None, None) => BindValue::Text(n.to_string()),
            },
            serde_json::Value::Bool(b) => BindValue::Int(i64::from(*b)),
            serde_json::Value::Null => BindValue::Null,
            other => BindValue::Text(other.to_string()),
        })
        .collect()
}

/// Build a query and bind every value in order.
pub(crate) fn bind_query<'q>(sql: &'q str, binds: &'q [BindValue]) -> Query<'q, Any, AnyArguments<'q>> {
    binds.iter().fold(sqlx::query(sql), |query, bv| match bv {
        BindValue::Text(s) => query.bind(s.as_str()),
        BindValue::Int(i) => query.bind(*i),
        BindValue::Float(f) => query.bind(*f),
        BindValue::Null => query.bind(Option::<String>::None),
    })
}

pub(crate) fn query_error(e: sqlx::Error) -> SafezoneError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            SafezoneError::Duplicate(db.message().to_string())
        }
        _ => SafezoneError::Database(format!("Query failed: {e}")),
    }
}

/// The SELECT used by `find_one`/`find_many`.
pub(crate) fn build_select(model: &str, query: &FindManyQuery) -> SqlFragment {
    let where_frag = query_builder::build_where(&query.where_clauses, 0);
    SqlFragment {
        sql: format!(
            "SELECT * FROM {}{}{}{}",
            query_builder::quote_identifier(model),
            where_frag.sql,
            query_builder::build_order_by(query),
            query_builder::build_limit(query)
        ),
        binds: where_frag.binds,
    }
}

pub(crate) fn build_count(model: &str, where_clauses: &[WhereClause]) -> SqlFragment {
    let where_frag = query_builder::build_where(where_clauses, 0);
    SqlFragment {
        sql: format!(
            "SELECT COUNT(*) AS count FROM {}{}",
            query_builder::quote_identifier(model),
            where_frag.sql
        ),
        binds: where_frag.binds,
    }
}

pub(crate) fn first_row_query(where_clauses: &[WhereClause]) -> FindManyQuery {
    FindManyQuery {
        where_clauses: where_clauses.to_vec(),
        limit: Some(1),
        ..Default::default()
    }
}

pub(crate) fn read_count(row: &AnyRow) -> AdapterResult<i64> {
    row.try_get::<i64, _>("count")
        .or_else(|_| row.try_get::<i32, _>("count").map(i64::from))
        .map_err(|e| SafezoneError::Database(format!("Count decode failed: {e}")))
}

impl SqlxAdapter {
    async fn fetch_all(&self, frag: SqlFragment) -> AdapterResult<Vec<AnyRow>> {
        let binds = prepare_binds(&frag.binds);
        bind_query(&frag.sql, &binds)
            .fetch_all(&self.pool)
            .await
            .map_err(query_error)
    }

    async fn fetch_optional(&self, frag: SqlFragment) -> AdapterResult<Option<AnyRow>> {
        let binds = prepare_binds(&frag.binds);
        bind_query(&frag.sql, &binds)
            .fetch_optional(&self.pool)
            .await
            .map_err(query_error)
    }
}

#[async_trait]
impl Adapter for SqlxAdapter {
    async fn create(&self, model: &str, data: serde_json::Value) -> AdapterResult<serde_json::Value> {
        let frag = query_builder::build_insert(model, &data);
        let row = self
            .fetch_optional(frag)
            .await?
            .ok_or_else(|| SafezoneError::Database(format!("Insert into {model} returned no row")))?;
        Ok(row_to_json(&row))
    }

    async fn find_one(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
    ) -> AdapterResult<Option<serde_json::Value>> {
        let frag = build_select(model, &first_row_query(where_clauses));
        Ok(self.fetch_optional(frag).await?.as_ref().map(row_to_json))
    }

    async fn find_many(
        &self,
        model: &str,
        query: FindManyQuery,
    ) -> AdapterResult<Vec<serde_json::Value>> {
        let rows = self.fetch_all(build_select(model, &query)).await?;
        Ok(rows.iter().map(row_to_json).collect())
    }

    async fn count(&self, model: &str, where_clauses: &[WhereClause]) -> AdapterResult<i64> {
        let row = self
            .fetch_optional(build_count(model, where_clauses))
            .await?
            .ok_or_else(|| SafezoneError::Database("Count returned no rows".into()))?;
        read_count(&row)
    }

    async fn update(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
        data: serde_json::Value,
    ) -> AdapterResult<Option<serde_json::Value>> {
        let frag = query_builder::build_update(model, where_clauses, &data);
        Ok(self.fetch_optional(frag).await?.as_ref().map(row_to_json))
    }

    async fn increment(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
        field: &str,
        by: i64,
    ) -> AdapterResult<Option<serde_json::Value>> {
        let frag = query_builder::build_increment(model, where_clauses, field, by);
        Ok(self.fetch_optional(frag).await?.as_ref().map(row_to_json))
    }

    async fn create_schema(
        &self,
        schema: &Schema,
        options: &SchemaOptions,
    ) -> AdapterResult<SchemaStatus> {
        schema::create_schema(&self.pool, self.db_type, schema, options).await
    }

    async fn begin_transaction(&self) -> AdapterResult<Box<dyn TransactionAdapter>> {
        // SQLite: take the write lock up front. A deferred transaction that
        // reads first gets SQLITE_BUSY from a concurrent writer instead of waiting.
        let begun = match self.db_type {
            DatabaseType::Sqlite => self.pool.begin_with("BEGIN IMMEDIATE").await,
            DatabaseType::Postgres => self.pool.begin().await,
        };
        let tx = begun.map_err(|e| SafezoneError::Database(format!("Transaction begin failed: {e}")))?;
        Ok(Box::new(SqlxTransactionAdapter::new(tx)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_prepare_binds() {
        let binds = prepare_binds(&[json!("a"), json!(3), json!(1.5), json!(true), json!(null)]);
        assert!(matches!(binds[0], BindValue::Text(ref s) if s == "a"));
        assert!(matches!(binds[1], BindValue::Int(3)));
        assert!(matches!(binds[2], BindValue::Float(f) if f == 1.5));
        assert!(matches!(binds[3], BindValue::Int(1)));
        assert!(matches!(binds[4], BindValue::Null));
    }

    #[test]
    fn test_find_one_selects_single_row() {
        let frag = build_select("users", &first_row_query(&[WhereClause::eq("email", "a@b.ph")]));
        assert_eq!(
            frag.sql,
            "SELECT * FROM \"users\" WHERE \"email\" = $1 LIMIT 1"
        );
    }

    #[test]
    fn test_count_sql() {
        let frag = build_count("community_tasks", &[]);
        assert_eq!(frag.sql, "SELECT COUNT(*) AS count FROM \"community_tasks\"");
        assert!(frag.binds.is_empty());
    }
}
