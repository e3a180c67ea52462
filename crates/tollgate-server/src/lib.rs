//! # tollgate-server
//!
//! HTTP boundary over the session engine: registration and login against a bundled
//! SQLite user store, bearer-credential middleware, and the session management
//! routes. The `tollgate` binary wraps it with key-management commands.

pub mod commands;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod users;
