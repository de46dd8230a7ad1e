//! Bounded retry for mutations that lose the optimistic version check.

use std::future::Future;

use casebook_core::composite::CompositeKind;
use casebook_core::types::DbId;
use casebook_core::versioning::MAX_CAPTURE_ATTEMPTS;

use crate::error::StoreError;

/// Run `attempt` until it succeeds, fails with a non-retryable error, or
/// [`MAX_CAPTURE_ATTEMPTS`] attempts have been made.
///
/// Each attempt must open and finish its own transaction so a retry starts
/// from freshly read state.
pub(crate) async fn with_retry<T, F, Fut>(
    kind: CompositeKind,
    parent_id: DbId,
    mut attempt: F,
) -> Result<T, StoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    let mut tries = 1;
    loop {
        match attempt().await {
            Err(e) if e.is_retryable() && tries < MAX_CAPTURE_ATTEMPTS => {
                tracing::warn!(
                    kind = %kind,
                    parent_id,
                    attempt = tries,
                    "Live version changed during mutation, retrying"
                );
                tries += 1;
            }
            other => return other,
        }
    }
}
