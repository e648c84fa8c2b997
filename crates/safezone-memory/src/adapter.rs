// In-memory database adapter: HashMap-based store implementing the core Adapter trait.
//
// Rows live in `HashMap<String, Vec<serde_json::Value>>` keyed by table name,
// behind a `tokio::sync::RwLock`. Integer ids are assigned as `max(id) + 1`
// per table; rows are never removed, so ids only grow.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{Mutex, OwnedRwLockWriteGuard, RwLock};

use safezone_core::db::adapter::{
    Adapter, AdapterResult, FindManyQuery, Operator, SchemaOptions, SchemaStatus,
    SortDirection, TransactionAdapter, WhereClause,
};
use safezone_core::db::schema::Schema;
use safezone_core::error::SafezoneError;

/// The table map shared by the adapter and its transactions.
#[derive(Debug, Clone, Default)]
struct Tables {
    rows: HashMap<String, Vec<Value>>,
}

impl Tables {
    fn table(&self, model: &str) -> &[Value] {
        self.rows.get(model).map(Vec::as_slice).unwrap_or(&[])
    }

    fn next_id(&self, model: &str) -> i64 {
        self.table(model)
            .iter()
            .filter_map(|r| r.get("id").and_then(Value::as_i64))
            .max()
            .unwrap_or(0)
            + 1
    }

    fn create(&mut self, model: &str, data: Value) -> AdapterResult<Value> {
        let mut record = data;
        let id = self.next_id(model);
        let obj = record.as_object_mut().ok_or_else(|| {
            SafezoneError::Database(format!("cannot insert a non-object row into {model}"))
        })?;
        if obj.get("id").map_or(true, Value::is_null) {
            obj.insert("id".to_string(), Value::from(id));
        }

        self.rows
            .entry(model.to_string())
            .or_default()
            .push(record.clone());
        Ok(record)
    }

    fn find_one(&self, model: &str, where_clauses: &[WhereClause]) -> Option<Value> {
        self.table(model)
            .iter()
            .find(|r| matches_where(r, where_clauses))
            .cloned()
    }

    fn find_many(&self, model: &str, query: &FindManyQuery) -> Vec<Value> {
        let mut result: Vec<Value> = self
            .table(model)
            .iter()
            .filter(|r| matches_where(r, &query.where_clauses))
            .cloned()
            .collect();

        sort_records(&mut result, query);

        let limit = query.limit.map_or(usize::MAX, |l| l.max(0) as usize);
        result.truncate(limit);
        result
    }

    fn count(&self, model: &str, where_clauses: &[WhereClause]) -> i64 {
        self.table(model)
            .iter()
            .filter(|r| matches_where(r, where_clauses))
            .count() as i64
    }

    fn find_mut(&mut self, model: &str, where_clauses: &[WhereClause]) -> Option<&mut Value> {
        self.rows
            .get_mut(model)?
            .iter_mut()
            .find(|r| matches_where(r, where_clauses))
    }

    fn update(&mut self, model: &str, where_clauses: &[WhereClause], data: &Value) -> Option<Value> {
        let record = self.find_mut(model, where_clauses)?;
        merge_update(record, data);
        Some(record.clone())
    }

    fn increment(
        &mut self,
        model: &str,
        where_clauses: &[WhereClause],
        field: &str,
        by: i64,
    ) -> AdapterResult<Option<Value>> {
        let Some(record) = self.find_mut(model, where_clauses) else {
            return Ok(None);
        };
        let current = match record.get(field) {
            None | Some(Value::Null) => 0,
            Some(v) => v.as_i64().ok_or_else(|| {
                SafezoneError::Database(format!("{model}.{field} is not an integer column"))
            })?,
        };
        let total = current.checked_add(by).ok_or_else(|| {
            SafezoneError::Database(format!("{model}.{field} overflows a 64-bit integer"))
        })?;
        if let Some(obj) = record.as_object_mut() {
            obj.insert(field.to_string(), Value::from(total));
        }
        Ok(Some(record.clone()))
    }
}

/// In-memory database adapter.
///
/// Data is lost when the last clone of the adapter is dropped.
#[derive(Debug, Clone, Default)]
pub struct MemoryAdapter {
    store: Arc<RwLock<Tables>>,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows in `model` (for tests).
    pub async fn model_count(&self, model: &str) -> usize {
        self.store.read().await.table(model).len()
    }
}

/// Check if a record matches every WHERE clause.
fn matches_where(record: &Value, clauses: &[WhereClause]) -> bool {
    clauses.iter().all(|clause| {
        let field_val = record.get(&clause.field).unwrap_or(&Value::Null);
        match clause.operator {
            Operator::Eq => values_equal(field_val, &clause.value),
            Operator::Ne => !values_equal(field_val, &clause.value),
        }
    })
}

/// Equality that treats a boolean and its 0/1 integer form as equal, so
/// filters behave like they do against SQL storage.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Bool(x), Value::Number(n)) | (Value::Number(n), Value::Bool(x)) => {
            n.as_i64() == Some(i64::from(*x))
        }
        _ => a == b,
    }
}

fn compare_json(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(an), Value::Number(bn)) => an.as_f64()?.partial_cmp(&bn.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn sort_records(records: &mut [Value], query: &FindManyQuery) {
    if let Some(ref sort) = query.sort_by {
        records.sort_by(|a, b| {
            let cmp = match (a.get(&sort.field), b.get(&sort.field)) {
                (Some(av), Some(bv)) => compare_json(av, bv).unwrap_or(Ordering::Equal),
                (Some(_), None) => Ordering::Greater,
                (None, Some(_)) => Ordering::Less,
                (None, None) => Ordering::Equal,
            };
            match sort.direction {
                SortDirection::Asc => cmp,
                SortDirection::Desc => cmp.reverse(),
            }
        });
    }
}

fn merge_update(record: &mut Value, data: &Value) {
    if let (Some(rec_obj), Some(data_obj)) = (record.as_object_mut(), data.as_object()) {
        for (k, v) in data_obj {
            rec_obj.insert(k.clone(), v.clone());
        }
    }
}

#[async_trait]
impl Adapter for MemoryAdapter {
    async fn create(&self, model: &str, data: Value) -> AdapterResult<Value> {
        self.store.write().await.create(model, data)
    }

    async fn find_one(&self, model: &str, where_clauses: &[WhereClause]) -> AdapterResult<Option<Value>> {
        Ok(self.store.read().await.find_one(model, where_clauses))
    }

    async fn find_many(&self, model: &str, query: FindManyQuery) -> AdapterResult<Vec<Value>> {
        Ok(self.store.read().await.find_many(model, &query))
    }

    async fn count(&self, model: &str, where_clauses: &[WhereClause]) -> AdapterResult<i64> {
        Ok(self.store.read().await.count(model, where_clauses))
    }

    async fn update(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
        data: Value,
    ) -> AdapterResult<Option<Value>> {
        Ok(self.store.write().await.update(model, where_clauses, &data))
    }

    async fn increment(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
        field: &str,
        by: i64,
    ) -> AdapterResult<Option<Value>> {
        self.store
            .write()
            .await
            .increment(model, where_clauses, field, by)
    }

    async fn create_schema(
        &self,
        _schema: &Schema,
        _options: &SchemaOptions,
    ) -> AdapterResult<SchemaStatus> {
        // Tables are created lazily on first insert.
        Ok(SchemaStatus::UpToDate)
    }

    async fn begin_transaction(&self) -> AdapterResult<Box<dyn TransactionAdapter>> {
        let guard = self.store.clone().write_owned().await;
        let working = Tables::clone(&guard);
        Ok(Box::new(MemoryTransactionAdapter {
            guard,
            working: Mutex::new(working),
        }))
    }
}

// ─── Transaction Adapter ─────────────────────────────────────────

/// In-memory transaction adapter.
///
/// Holds the parent store's write lock for its whole lifetime, so
/// transactions are serialized and plain reads wait until it finishes.
/// Operations run against a working copy that replaces the store on commit;
/// rollback (or drop) discards it. While a transaction is open, use only the
/// transaction handle: the parent adapter would block on the lock.
struct MemoryTransactionAdapter {
    guard: OwnedRwLockWriteGuard<Tables>,
    working: Mutex<Tables>,
}

impl std::fmt::Debug for MemoryTransactionAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTransactionAdapter").finish()
    }
}

#[async_trait]
impl Adapter for MemoryTransactionAdapter {
    async fn create(&self, model: &str, data: Value) -> AdapterResult<Value> {
        self.working.lock().await.create(model, data)
    }

    async fn find_one(&self, model: &str, where_clauses: &[WhereClause]) -> AdapterResult<Option<Value>> {
        Ok(self.working.lock().await.find_one(model, where_clauses))
    }

    async fn find_many(&self, model: &str, query: FindManyQuery) -> AdapterResult<Vec<Value>> {
        Ok(self.working.lock().await.find_many(model, &query))
    }

    async fn count(&self, model: &str, where_clauses: &[WhereClause]) -> AdapterResult<i64> {
        Ok(self.working.lock().await.count(model, where_clauses))
    }

    async fn update(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
        data: Value,
    ) -> AdapterResult<Option<Value>> {
        Ok(self.working.lock().await.update(model, where_clauses, &data))
    }

    async fn increment(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
        field: &str,
        by: i64,
    ) -> AdapterResult<Option<Value>> {
        self.working
            .lock()
            .await
            .increment(model, where_clauses, field, by)
    }

    async fn create_schema(&self, _schema: &Schema, _options: &SchemaOptions) -> AdapterResult<SchemaStatus> {
        Ok(SchemaStatus::UpToDate)
    }

    async fn begin_transaction(&self) -> AdapterResult<Box<dyn TransactionAdapter>> {
        Err(SafezoneError::Other(
            "Nested transactions are not supported in the memory adapter".into(),
        ))
    }
}

#[async_trait]
impl TransactionAdapter for MemoryTransactionAdapter {
    async fn commit(self: Box<Self>) -> AdapterResult<()> {
        let MemoryTransactionAdapter { mut guard, working } = *self;
        *guard = working.into_inner();
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AdapterResult<()> {
        // Dropping the guard discards the working copy.
        Ok(())
    }
}
