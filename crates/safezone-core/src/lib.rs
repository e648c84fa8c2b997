//! Core types shared by the SafeZone community backend crates: the error
//! taxonomy, record models, the storage adapter trait, the schema DSL, the
//! rank table and process configuration.

pub mod db;
pub mod env;
pub mod error;
pub mod options;
pub mod rank;

pub use db::adapter::{Adapter, TransactionAdapter};
pub use db::models::{CommunityTask, GlobalAlert, HelpRequest, PointsHistory, Task, TaskPatch, User};
pub use error::{ApiError, ErrorCode, SafezoneError};
pub use options::SafezoneOptions;
pub use rank::compute_rank;
