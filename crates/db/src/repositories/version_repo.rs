//! Repository for snapshot tables.
//!
//! History is append-only: this repository inserts and reads, nothing else.

use std::marker::PhantomData;

use casebook_core::types::DbId;
use sqlx::{PgConnection, PgExecutor};

use crate::composite::VersionedComposite;
use crate::models::step::StepContent;
use crate::models::version::{StepSnapshot, VersionSnapshot};

/// Column list for version snapshot queries.
const COLUMNS: &str = "id, parent_id, version, name, description, created_by, created_at";

/// Column list for snapshot step queries.
const STEP_COLUMNS: &str =
    "id, version_id, step_order, action, data, expected, disabled, fixture_id, script";

/// Snapshot reads and inserts for kind `C`.
pub struct VersionRepo<C>(PhantomData<C>);

impl<C: VersionedComposite> VersionRepo<C> {
    /// Insert a snapshot header.
    pub async fn insert(
        conn: &mut PgConnection,
        parent_id: DbId,
        version: &str,
        name: &str,
        description: Option<&str>,
        created_by: DbId,
    ) -> Result<VersionSnapshot, sqlx::Error> {
        let query = format!(
            "INSERT INTO {} (parent_id, version, name, description, created_by)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}",
            C::VERSION_TABLE
        );
        sqlx::query_as::<_, VersionSnapshot>(&query)
            .bind(parent_id)
            .bind(version)
            .bind(name)
            .bind(description)
            .bind(created_by)
            .fetch_one(conn)
            .await
    }

    /// Insert one snapshot step.
    pub async fn insert_step(
        conn: &mut PgConnection,
        version_id: DbId,
        step_order: i32,
        content: &StepContent,
    ) -> Result<StepSnapshot, sqlx::Error> {
        let query = format!(
            "INSERT INTO {}
                (version_id, step_order, action, data, expected, disabled, fixture_id, script)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {STEP_COLUMNS}",
            C::VERSION_STEP_TABLE
        );
        sqlx::query_as::<_, StepSnapshot>(&query)
            .bind(version_id)
            .bind(step_order)
            .bind(&content.action)
            .bind(&content.data)
            .bind(&content.expected)
            .bind(content.disabled)
            .bind(content.fixture_id)
            .bind(&content.script)
            .fetch_one(conn)
            .await
    }

    /// All snapshots of a parent, newest first.
    pub async fn list_by_parent<'e, E: PgExecutor<'e>>(
        executor: E,
        parent_id: DbId,
    ) -> Result<Vec<VersionSnapshot>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM {}
             WHERE parent_id = $1
             ORDER BY id DESC",
            C::VERSION_TABLE
        );
        sqlx::query_as::<_, VersionSnapshot>(&query)
            .bind(parent_id)
            .fetch_all(executor)
            .await
    }

    /// Find a snapshot only if it belongs to `parent_id`.
    pub async fn find_for_parent<'e, E: PgExecutor<'e>>(
        executor: E,
        parent_id: DbId,
        version_id: DbId,
    ) -> Result<Option<VersionSnapshot>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM {} WHERE id = $1 AND parent_id = $2",
            C::VERSION_TABLE
        );
        sqlx::query_as::<_, VersionSnapshot>(&query)
            .bind(version_id)
            .bind(parent_id)
            .fetch_optional(executor)
            .await
    }

    /// Newest snapshot of a parent, if any.
    pub async fn find_latest<'e, E: PgExecutor<'e>>(
        executor: E,
        parent_id: DbId,
    ) -> Result<Option<VersionSnapshot>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM {}
             WHERE parent_id = $1
             ORDER BY id DESC
             LIMIT 1",
            C::VERSION_TABLE
        );
        sqlx::query_as::<_, VersionSnapshot>(&query)
            .bind(parent_id)
            .fetch_optional(executor)
            .await
    }

    /// Steps of a snapshot, ordered by `step_order`.
    pub async fn list_steps<'e, E: PgExecutor<'e>>(
        executor: E,
        version_id: DbId,
    ) -> Result<Vec<StepSnapshot>, sqlx::Error> {
        let query = format!(
            "SELECT {STEP_COLUMNS} FROM {}
             WHERE version_id = $1
             ORDER BY step_order ASC",
            C::VERSION_STEP_TABLE
        );
        sqlx::query_as::<_, StepSnapshot>(&query)
            .bind(version_id)
            .fetch_all(executor)
            .await
    }

    /// Number of snapshots recorded for a parent.
    pub async fn count_by_parent<'e, E: PgExecutor<'e>>(
        executor: E,
        parent_id: DbId,
    ) -> Result<i64, sqlx::Error> {
        let query = format!("SELECT COUNT(*) FROM {} WHERE parent_id = $1", C::VERSION_TABLE);
        let row: (i64,) = sqlx::query_as(&query)
            .bind(parent_id)
            .fetch_one(executor)
            .await?;
        Ok(row.0)
    }
}
