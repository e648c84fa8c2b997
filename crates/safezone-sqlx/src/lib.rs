// safezone-sqlx: SQLx storage adapter for the SafeZone backend.
//
// Implements the core Adapter trait on a `sqlx::AnyPool`, supporting SQLite
// and Postgres. MySQL is not supported: it has no `RETURNING`.

pub mod adapter;
pub mod query_builder;
pub mod schema;
pub mod transaction;

pub use adapter::SqlxAdapter;
pub use schema::DatabaseType;
pub use transaction::SqlxTransactionAdapter;
