//! Direct database access
//!
//! - `pool`: `sqlx` Postgres pool with a health check
//! - `migrations`: the embedded notes schema

pub mod migrations;
pub mod pool;
