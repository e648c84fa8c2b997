// safezone-memory: in-memory storage adapter for the SafeZone backend.
//
// Used by the test suites and for quick local runs without a database.

pub mod adapter;

pub use adapter::MemoryAdapter;
