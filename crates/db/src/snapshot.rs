//! Snapshot capture.
//!
//! [`SnapshotEngine::capture`] copies a parent and its live steps into a new
//! immutable version row plus one snapshot step per live step, and advances
//! the parent's live version. It only ever runs on a connection that is
//! inside the transaction of the mutation being recorded.

use std::marker::PhantomData;

use casebook_core::error::CoreError;
use casebook_core::steps::is_contiguous;
use casebook_core::types::DbId;
use casebook_core::versioning::next_version;
use sqlx::PgConnection;

use crate::composite::VersionedComposite;
use crate::error::StoreError;
use crate::models::version::VersionSnapshot;
use crate::repositories::{ParentRepo, StepRepo, VersionRepo};

/// Captures point-in-time copies of composites of kind `C`.
pub struct SnapshotEngine<C>(PhantomData<C>);

impl<C: VersionedComposite> SnapshotEngine<C> {
    /// Append a snapshot of the parent's current live state.
    ///
    /// `expected_version` is the live version the caller read when its
    /// transaction started (`None` for a parent created in this transaction).
    /// If the stored version differs, nothing is written and
    /// `ConcurrentModification` is returned so the caller can retry.
    pub async fn capture(
        conn: &mut PgConnection,
        parent_id: DbId,
        expected_version: Option<&str>,
        actor: DbId,
    ) -> Result<VersionSnapshot, StoreError> {
        let parent = ParentRepo::<C>::find_by_id(&mut *conn, parent_id)
            .await?
            .ok_or_else(|| StoreError::not_found(C::KIND.parent_entity(), parent_id))?;

        if parent.live_version.as_deref() != expected_version {
            return Err(StoreError::concurrent(C::KIND, parent_id));
        }

        let next = next_version(parent.live_version.as_deref())?;
        let steps = StepRepo::<C>::list_by_parent(&mut *conn, parent_id).await?;

        let orders: Vec<i32> = steps.iter().map(|s| s.step_order).collect();
        if !is_contiguous(&orders) {
            return Err(CoreError::Internal(format!(
                "{} {parent_id} has non-contiguous step orders {orders:?}",
                C::KIND
            ))
            .into());
        }

        let snapshot = VersionRepo::<C>::insert(
            &mut *conn,
            parent_id,
            &next,
            &parent.name,
            parent.description.as_deref(),
            actor,
        )
        .await
        .map_err(|e| StoreError::from_version_insert(e, C::KIND, parent_id))?;

        for step in &steps {
            VersionRepo::<C>::insert_step(&mut *conn, snapshot.id, step.step_order, &step.content())
                .await?;
        }

        let advanced =
            ParentRepo::<C>::compare_and_set_version(&mut *conn, parent_id, expected_version, &next)
                .await?;
        if !advanced {
            return Err(StoreError::concurrent(C::KIND, parent_id));
        }

        tracing::debug!(
            kind = %C::KIND,
            parent_id,
            version = %snapshot.version,
            step_count = steps.len(),
            "Snapshot captured"
        );

        Ok(snapshot)
    }
}
