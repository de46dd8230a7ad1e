use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A parent, step, or snapshot is missing, or belongs to a different parent.
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    /// A reorder payload is not a permutation of the parent's live step ids.
    #[error("Invalid step order: {0}")]
    InvalidOrder(String),

    #[error("Invalid version format: '{0}'")]
    InvalidVersionFormat(String),

    /// The parent's live version moved underneath an in-flight mutation.
    #[error("Concurrent modification of {entity} with id {id}")]
    ConcurrentModification { entity: &'static str, id: DbId },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Whether the whole operation may be retried from scratch.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::ConcurrentModification { .. })
    }
}
