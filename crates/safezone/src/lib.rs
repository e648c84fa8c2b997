// safezone: credential, session and community-record operations.
//
// Wires together crypto, the typed store, the application context and the
// framework-independent route handlers. HTTP bindings live in safezone-axum.

pub mod context;
pub mod crypto;
pub mod routes;
pub mod session;
pub mod store;

pub use context::AppContext;
pub use store::{Records, Store, StoreTx};
