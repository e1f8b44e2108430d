/// API route handlers
///
/// - `health`: provider reachability
/// - `auth`: registration and login
/// - `notes`: owner-scoped note CRUD

pub mod auth;
pub mod health;
pub mod notes;
