// DDL generation and schema creation for the SQLx adapter.
//
// Compares the tables present in the live database with the target `Schema`
// and produces CREATE TABLE statements for the missing ones. Existing tables
// are left untouched.

use std::collections::HashSet;

use sqlx::{AnyPool, Row};

use safezone_core::db::adapter::{SchemaOptions, SchemaStatus};
use safezone_core::db::schema::{FieldType, Schema, SchemaField, Table};
use safezone_core::error::SafezoneError;

use crate::query_builder::quote_identifier;

/// SQL dialects supported by the adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseType {
    Sqlite,
    Postgres,
}

impl DatabaseType {
    /// Detect the dialect from a connection URL.
    pub fn from_url(url: &str) -> Result<Self, SafezoneError> {
        if url.starts_with("sqlite:") {
            Ok(Self::Sqlite)
        } else if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            Ok(Self::Postgres)
        } else {
            Err(SafezoneError::Config(format!(
                "Unsupported database URL {url:?}; expected sqlite: or postgres://"
            )))
        }
    }
}

/// Map a field type to the column type for a dialect. Booleans are stored
/// as 0/1 integers and timestamps as RFC 3339 text on both dialects.
pub fn column_type(field_type: FieldType, db_type: DatabaseType) -> &'static str {
    match (field_type, db_type) {
        (FieldType::Id, DatabaseType::Sqlite) => "INTEGER PRIMARY KEY AUTOINCREMENT",
        (FieldType::Id, DatabaseType::Postgres) => "BIGSERIAL PRIMARY KEY",
        (FieldType::Integer | FieldType::Boolean, DatabaseType::Sqlite) => "INTEGER",
        (FieldType::Integer | FieldType::Boolean, DatabaseType::Postgres) => "BIGINT",
        (FieldType::Text | FieldType::Timestamp, _) => "TEXT",
    }
}

fn default_literal(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Bool(b) => i64::from(*b).to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => format!("'{}'", s.replace('\'', "''")),
        other => format!("'{}'", other.to_string().replace('\'', "''")),
    }
}

fn column_definition(name: &str, field: &SchemaField, db_type: DatabaseType) -> String {
    let mut def = format!("{} {}", quote_identifier(name), column_type(field.field_type, db_type));
    if field.field_type == FieldType::Id {
        return def;
    }
    if field.required {
        def.push_str(" NOT NULL");
    }
    if field.unique {
        def.push_str(" UNIQUE");
    }
    if let Some(ref default) = field.default_value {
        def.push_str(" DEFAULT ");
        def.push_str(&default_literal(default));
    }
    def
}

/// Generate the CREATE TABLE statement for one table.
pub fn generate_create_table(table: &Table, db_type: DatabaseType) -> String {
    let columns: Vec<String> = table
        .fields
        .iter()
        .map(|(name, field)| format!("    {}", column_definition(name, field, db_type)))
        .collect();
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n{}\n)",
        quote_identifier(&table.name),
        columns.join(",\n")
    )
}

/// Generate DDL for every table in `schema`, in declaration order.
pub fn generate_ddl(schema: &Schema, db_type: DatabaseType) -> Vec<String> {
    schema
        .tables
        .iter()
        .map(|t| generate_create_table(t, db_type))
        .collect()
}

/// Names of the tables that already exist.
pub async fn existing_tables(
    pool: &AnyPool,
    db_type: DatabaseType,
) -> Result<HashSet<String>, SafezoneError> {
    let sql = match db_type {
        DatabaseType::Sqlite => {
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'"
        }
        DatabaseType::Postgres => {
            "SELECT CAST(table_name AS TEXT) AS name FROM information_schema.tables \
             WHERE table_schema = current_schema() AND table_type = 'BASE TABLE'"
        }
    };

    let rows = sqlx::query(sql)
        .fetch_all(pool)
        .await
        .map_err(|e| SafezoneError::Database(format!("Table introspection failed: {e}")))?;

    rows.iter()
        .map(|row| {
            row.try_get::<String, _>("name")
                .map_err(|e| SafezoneError::Database(format!("Failed to read table name: {e}")))
        })
        .collect()
}

/// Statements needed to bring the database up to `schema`.
pub async fn pending_statements(
    pool: &AnyPool,
    db_type: DatabaseType,
    schema: &Schema,
) -> Result<Vec<String>, SafezoneError> {
    let existing = existing_tables(pool, db_type).await?;
    Ok(schema
        .tables
        .iter()
        .filter(|t| !existing.contains(&t.name))
        .map(|t| generate_create_table(t, db_type))
        .collect())
}

/// Create missing tables (when `auto_migrate` is set) and report what was
/// or would be run.
pub async fn create_schema(
    pool: &AnyPool,
    db_type: DatabaseType,
    schema: &Schema,
    options: &SchemaOptions,
) -> Result<SchemaStatus, SafezoneError> {
    let statements = pending_statements(pool, db_type, schema).await?;
    if statements.is_empty() {
        return Ok(SchemaStatus::UpToDate);
    }

    if options.auto_migrate {
        for stmt in &statements {
            sqlx::query(stmt).execute(pool).await.map_err(|e| {
                SafezoneError::Database(format!("Migration failed: {e}\nSQL: {stmt}"))
            })?;
        }
        tracing::info!(count = statements.len(), "created missing tables");
    }

    Ok(SchemaStatus::NeedsMigration { statements })
}

#[cfg(test)]
mod tests {
    use super::*;
    use safezone_core::db::schema::tables;

    #[test]
    fn test_detect_from_url() {
        assert_eq!(
            DatabaseType::from_url("sqlite://safezoneph_dev.db?mode=rwc").unwrap(),
            DatabaseType::Sqlite
        );
        assert_eq!(
            DatabaseType::from_url("sqlite::memory:").unwrap(),
            DatabaseType::Sqlite
        );
        assert_eq!(
            DatabaseType::from_url("postgresql://localhost/safezone").unwrap(),
            DatabaseType::Postgres
        );
        assert!(DatabaseType::from_url("mysql://localhost/safezone").is_err());
    }

    #[test]
    fn test_sqlite_users_table() {
        let schema = Schema::safezone();
        let ddl = generate_create_table(schema.get(tables::USERS).unwrap(), DatabaseType::Sqlite);
        assert!(ddl.starts_with("CREATE TABLE IF NOT EXISTS \"users\""));
        assert!(ddl.contains("\"id\" INTEGER PRIMARY KEY AUTOINCREMENT"));
        assert!(ddl.contains("\"email\" TEXT NOT NULL UNIQUE"));
        assert!(ddl.contains("\"points\" INTEGER NOT NULL DEFAULT 100"));
        assert!(ddl.contains("\"rank\" TEXT NOT NULL DEFAULT 'Newcomer'"));
        assert!(ddl.contains("\"is_active\" INTEGER NOT NULL DEFAULT 1"));
        assert!(ddl.contains("\"phone\" TEXT,"));
    }

    #[test]
    fn test_postgres_types() {
        let schema = Schema::safezone();
        let ddl = generate_create_table(
            schema.get(tables::COMMUNITY_TASKS).unwrap(),
            DatabaseType::Postgres,
        );
        assert!(ddl.contains("\"id\" BIGSERIAL PRIMARY KEY"));
        assert!(ddl.contains("\"volunteer_id\" BIGINT"));
        assert!(ddl.contains("\"status\" TEXT NOT NULL DEFAULT 'open'"));
    }

    #[test]
    fn test_generate_ddl_covers_schema() {
        assert_eq!(generate_ddl(&Schema::safezone(), DatabaseType::Sqlite).len(), 6);
    }

    #[test]
    fn test_default_literal_escapes_quotes() {
        assert_eq!(default_literal(&serde_json::json!("O'Brien")), "'O''Brien'");
        assert_eq!(default_literal(&serde_json::json!(false)), "0");
    }
}
