//! Casebook API server library.
//!
//! Exposes config, state, error handling, and the route tree so that
//! integration tests and the binary entrypoint can both build the app.

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod query;
pub mod response;
pub mod routes;
pub mod state;
