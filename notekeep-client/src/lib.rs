//! # notekeep client
//!
//! Client-side pieces of notekeep: the session store, the HTTP client for
//! the notekeep API, and the `notekeep` terminal front end built on them.
//!
//! ## Modules
//!
//! - `session`: owner of the current identity, with change subscriptions
//! - `signup`: the transient-failure fallback for registration
//! - `api`: typed client for the notekeep HTTP API
//! - `messages`: user-visible rendering of classified errors
//! - `settings`: layered client configuration
//! - `session_file`: the session persisted between runs
//! - `commands`: the terminal commands

pub mod api;
pub mod commands;
pub mod messages;
pub mod session;
pub mod session_file;
pub mod settings;
pub mod signup;
