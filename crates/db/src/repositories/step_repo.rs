//! Repository for live step tables (`test_case_steps`, `fixture_steps`).
//!
//! The `(parent_id, step_order)` uniqueness constraint is deferred to commit,
//! so shifts and reorders may pass through duplicate orders mid-transaction.

use std::marker::PhantomData;

use casebook_core::types::DbId;
use sqlx::{PgConnection, PgExecutor};

use crate::composite::VersionedComposite;
use crate::models::step::{Step, StepContent};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, parent_id, step_order, action, data, expected, disabled, \
    fixture_id, script, created_at, updated_at";

/// Live step operations for kind `C`.
pub struct StepRepo<C>(PhantomData<C>);

impl<C: VersionedComposite> StepRepo<C> {
    /// All live steps of a parent, ordered by `step_order`.
    pub async fn list_by_parent<'e, E: PgExecutor<'e>>(
        executor: E,
        parent_id: DbId,
    ) -> Result<Vec<Step>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM {}
             WHERE parent_id = $1
             ORDER BY step_order ASC",
            C::STEP_TABLE
        );
        sqlx::query_as::<_, Step>(&query)
            .bind(parent_id)
            .fetch_all(executor)
            .await
    }

    /// Find a step only if it belongs to `parent_id`.
    pub async fn find_for_parent<'e, E: PgExecutor<'e>>(
        executor: E,
        parent_id: DbId,
        step_id: DbId,
    ) -> Result<Option<Step>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM {} WHERE id = $1 AND parent_id = $2",
            C::STEP_TABLE
        );
        sqlx::query_as::<_, Step>(&query)
            .bind(step_id)
            .bind(parent_id)
            .fetch_optional(executor)
            .await
    }

    /// Insert a step at `step_order`. The caller keeps orders contiguous.
    pub async fn insert(
        conn: &mut PgConnection,
        parent_id: DbId,
        step_order: i32,
        content: &StepContent,
    ) -> Result<Step, sqlx::Error> {
        let query = format!(
            "INSERT INTO {}
                (parent_id, step_order, action, data, expected, disabled, fixture_id, script)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {COLUMNS}",
            C::STEP_TABLE
        );
        sqlx::query_as::<_, Step>(&query)
            .bind(parent_id)
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

    /// Replace the content of a step, keeping its id and order.
    pub async fn update_content(
        conn: &mut PgConnection,
        step_id: DbId,
        content: &StepContent,
    ) -> Result<Step, sqlx::Error> {
        let query = format!(
            "UPDATE {} SET
                action = $2,
                data = $3,
                expected = $4,
                disabled = $5,
                fixture_id = $6,
                script = $7
             WHERE id = $1
             RETURNING {COLUMNS}",
            C::STEP_TABLE
        );
        sqlx::query_as::<_, Step>(&query)
            .bind(step_id)
            .bind(&content.action)
            .bind(&content.data)
            .bind(&content.expected)
            .bind(content.disabled)
            .bind(content.fixture_id)
            .bind(&content.script)
            .fetch_one(conn)
            .await
    }

    /// Move every step at or after `from_order` by `delta` positions.
    pub async fn shift_orders(
        conn: &mut PgConnection,
        parent_id: DbId,
        from_order: i32,
        delta: i32,
    ) -> Result<u64, sqlx::Error> {
        let query = format!(
            "UPDATE {} SET step_order = step_order + $3
             WHERE parent_id = $1 AND step_order >= $2",
            C::STEP_TABLE
        );
        let result = sqlx::query(&query)
            .bind(parent_id)
            .bind(from_order)
            .bind(delta)
            .execute(conn)
            .await?;
        Ok(result.rows_affected())
    }

    /// Set the order of a single step.
    pub async fn set_order(
        conn: &mut PgConnection,
        step_id: DbId,
        step_order: i32,
    ) -> Result<(), sqlx::Error> {
        let query = format!("UPDATE {} SET step_order = $2 WHERE id = $1", C::STEP_TABLE);
        sqlx::query(&query)
            .bind(step_id)
            .bind(step_order)
            .execute(conn)
            .await?;
        Ok(())
    }

    /// Delete one step. Returns `true` if a row was removed.
    pub async fn delete(conn: &mut PgConnection, step_id: DbId) -> Result<bool, sqlx::Error> {
        let query = format!("DELETE FROM {} WHERE id = $1", C::STEP_TABLE);
        let result = sqlx::query(&query).bind(step_id).execute(conn).await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete every live step of a parent. Returns the number removed.
    pub async fn delete_all(conn: &mut PgConnection, parent_id: DbId) -> Result<u64, sqlx::Error> {
        let query = format!("DELETE FROM {} WHERE parent_id = $1", C::STEP_TABLE);
        let result = sqlx::query(&query).bind(parent_id).execute(conn).await?;
        Ok(result.rows_affected())
    }
}
