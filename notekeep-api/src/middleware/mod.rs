/// Middleware for the API server
///
/// - `auth`: bearer-token resolution into an `AuthContext`
/// - `security`: response hardening headers

pub mod auth;
pub mod security;
