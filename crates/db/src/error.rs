use casebook_core::composite::CompositeKind;
use casebook_core::error::CoreError;
use casebook_core::types::DbId;

/// PostgreSQL `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

/// PostgreSQL `foreign_key_violation`.
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Error returned by the transactional coordinators.
///
/// Domain failures travel as [`CoreError`]; anything the database reports
/// that has no domain meaning stays a raw [`sqlx::Error`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Core(core) if core.is_retryable())
    }

    pub(crate) fn not_found(entity: &'static str, id: DbId) -> Self {
        StoreError::Core(CoreError::NotFound { entity, id })
    }

    pub(crate) fn concurrent(kind: CompositeKind, parent_id: DbId) -> Self {
        StoreError::Core(CoreError::ConcurrentModification {
            entity: kind.parent_entity(),
            id: parent_id,
        })
    }

    /// Translate a failed snapshot insert.
    ///
    /// A duplicate `(parent_id, version)` means another writer already took
    /// the version this transaction computed.
    pub(crate) fn from_version_insert(err: sqlx::Error, kind: CompositeKind, parent_id: DbId) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            let duplicate_version = db_err.code().as_deref() == Some(UNIQUE_VIOLATION)
                && db_err
                    .constraint()
                    .is_some_and(|c| c.ends_with("_parent_version"));
            if duplicate_version {
                return Self::concurrent(kind, parent_id);
            }
        }
        StoreError::Database(err)
    }

    /// Translate a failed parent delete.
    ///
    /// Fixtures still referenced by live test-case steps are refused by the
    /// foreign key; that surfaces as a validation error naming the fixture.
    pub(crate) fn from_parent_delete(err: sqlx::Error, kind: CompositeKind, parent_id: DbId) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.code().as_deref() == Some(FOREIGN_KEY_VIOLATION) {
                return StoreError::Core(CoreError::Validation(format!(
                    "{} {parent_id} is still referenced by test case steps",
                    kind.parent_entity()
                )));
            }
        }
        StoreError::Database(err)
    }
}
