//! # notekeep shared library
//!
//! Types and services used by both the API server and the terminal client.
//!
//! ## Module Organization
//!
//! - `error`: the classified error taxonomy and provider-failure classifier
//! - `validation`: email, password and note field rules
//! - `models`: notes, users, sessions
//! - `provider`: hosted backend-as-a-service connection settings
//! - `auth`: the `AuthProvider` seam with hosted and local implementations
//! - `notes`: the owner-scoped `NoteRepository` and its backends
//! - `db`: `sqlx` pool and embedded migrations for the direct Postgres backend

pub mod auth;
pub mod db;
pub mod error;
pub mod models;
pub mod notes;
pub mod provider;
pub mod validation;

/// Current version of the shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
