//! # notekeep API server library
//!
//! HTTP route layer in front of the auth provider and the note repository.
//!
//! ## Modules
//!
//! - `app`: application state and router builder
//! - `config`: configuration from the environment
//! - `error`: classified errors mapped to HTTP responses
//! - `middleware`: bearer authentication and security headers
//! - `routes`: route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
