//! Repository for the parent tables (`test_cases`, `fixtures`).

use std::marker::PhantomData;

use casebook_core::types::DbId;
use sqlx::{PgConnection, PgExecutor, PgPool};

use crate::composite::VersionedComposite;
use crate::models::parent::{CreateParent, Parent};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, name, description, live_version, created_by, created_at, updated_at";

/// CRUD for parent rows of kind `C`.
pub struct ParentRepo<C>(PhantomData<C>);

impl<C: VersionedComposite> ParentRepo<C> {
    /// Insert a parent with no live version yet.
    ///
    /// The caller must capture the first snapshot in the same transaction.
    pub async fn insert(
        conn: &mut PgConnection,
        input: &CreateParent,
        created_by: DbId,
    ) -> Result<Parent, sqlx::Error> {
        let query = format!(
            "INSERT INTO {} (name, description, created_by)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}",
            C::PARENT_TABLE
        );
        sqlx::query_as::<_, Parent>(&query)
            .bind(&input.name)
            .bind(&input.description)
            .bind(created_by)
            .fetch_one(conn)
            .await
    }

    /// Find a parent by its primary key.
    pub async fn find_by_id<'e, E: PgExecutor<'e>>(
        executor: E,
        id: DbId,
    ) -> Result<Option<Parent>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM {} WHERE id = $1", C::PARENT_TABLE);
        sqlx::query_as::<_, Parent>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Find a parent and hold a row lock on it until the transaction ends.
    ///
    /// Serialises all writers of one parent so version numbers are never
    /// skipped or duplicated.
    pub async fn lock_for_update(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<Option<Parent>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM {} WHERE id = $1 FOR UPDATE",
            C::PARENT_TABLE
        );
        sqlx::query_as::<_, Parent>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// Whether a parent with this id exists.
    pub async fn exists<'e, E: PgExecutor<'e>>(executor: E, id: DbId) -> Result<bool, sqlx::Error> {
        let query = format!("SELECT EXISTS(SELECT 1 FROM {} WHERE id = $1)", C::PARENT_TABLE);
        let row: (bool,) = sqlx::query_as(&query).bind(id).fetch_one(executor).await?;
        Ok(row.0)
    }

    /// List parents, most recently created first.
    pub async fn list(pool: &PgPool, limit: i64, offset: i64) -> Result<Vec<Parent>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM {}
             ORDER BY id DESC
             LIMIT $1 OFFSET $2",
            C::PARENT_TABLE
        );
        sqlx::query_as::<_, Parent>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Overwrite the parent's own fields.
    pub async fn update_details(
        conn: &mut PgConnection,
        id: DbId,
        name: &str,
        description: Option<&str>,
    ) -> Result<Parent, sqlx::Error> {
        let query = format!(
            "UPDATE {} SET name = $2, description = $3
             WHERE id = $1
             RETURNING {COLUMNS}",
            C::PARENT_TABLE
        );
        sqlx::query_as::<_, Parent>(&query)
            .bind(id)
            .bind(name)
            .bind(description)
            .fetch_one(conn)
            .await
    }

    /// Advance `live_version` from `expected` to `next`.
    ///
    /// Returns `false` when the stored version no longer equals `expected`.
    pub async fn compare_and_set_version(
        conn: &mut PgConnection,
        id: DbId,
        expected: Option<&str>,
        next: &str,
    ) -> Result<bool, sqlx::Error> {
        let query = format!(
            "UPDATE {} SET live_version = $3
             WHERE id = $1 AND live_version IS NOT DISTINCT FROM $2",
            C::PARENT_TABLE
        );
        let result = sqlx::query(&query)
            .bind(id)
            .bind(expected)
            .bind(next)
            .execute(conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a parent. Steps and history go with it by cascade.
    ///
    /// A fixture still referenced by a live test-case step is refused with a
    /// foreign-key violation.
    ///
    /// Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let query = format!("DELETE FROM {} WHERE id = $1", C::PARENT_TABLE);
        let result = sqlx::query(&query).bind(id).execute(pool).await?;
        Ok(result.rows_affected() > 0)
    }
}
