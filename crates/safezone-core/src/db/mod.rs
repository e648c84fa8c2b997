pub mod adapter;
pub mod models;
pub mod schema;
