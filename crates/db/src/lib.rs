//! Persistence for versioned composites (test cases and fixtures).
//!
//! Repositories are zero-sized structs generic over a [`VersionedComposite`]
//! kind, exposing async functions over a pool or an open connection. The
//! transactional coordinators ([`store`], [`snapshot`], [`revert`],
//! [`clone`]) compose them so that every live-state change commits together
//! with exactly one new history snapshot.

use sqlx::postgres::PgPoolOptions;

pub mod clone;
pub mod composite;
pub mod error;
pub mod models;
pub mod repositories;
pub mod revert;
mod retry;
pub mod snapshot;
pub mod store;

pub use clone::CloneCoordinator;
pub use composite::{Fixtures, TestCases, VersionedComposite};
pub use error::StoreError;
pub use revert::RevertCoordinator;
pub use snapshot::SnapshotEngine;
pub use store::VersionedEntityStore;

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// Round-trip a trivial query to confirm the database is reachable.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply all pending migrations from `crates/db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
