//! Revert a composite to a historical snapshot.
//!
//! Reverting never rewrites history. Live steps are replaced with copies of
//! the target snapshot's steps and a new forward snapshot is appended, so the
//! resulting version is always greater than the one active before the revert.

use std::marker::PhantomData;

use casebook_core::types::DbId;
use sqlx::PgPool;

use crate::composite::VersionedComposite;
use crate::error::StoreError;
use crate::models::parent::VersionedParent;
use crate::models::step::StepContent;
use crate::repositories::{ParentRepo, StepRepo, VersionRepo};
use crate::retry::with_retry;
use crate::store::{capture_and_commit, lock_parent, prune_missing_fixture_refs};

/// Restores live state of kind `C` from history.
pub struct RevertCoordinator<C>(PhantomData<C>);

impl<C: VersionedComposite> RevertCoordinator<C> {
    /// Make the live parent match snapshot `version_id` and record that as a
    /// new version.
    ///
    /// Fails `NotFound` if the parent or snapshot is missing, or if the
    /// snapshot belongs to another parent. Reverting to the active version is
    /// allowed and appends an identical-content snapshot.
    pub async fn revert_to(
        pool: &PgPool,
        parent_id: DbId,
        version_id: DbId,
        actor: DbId,
    ) -> Result<VersionedParent, StoreError> {
        with_retry(C::KIND, parent_id, || {
            Self::revert_once(pool, parent_id, version_id, actor)
        })
        .await
    }

    async fn revert_once(
        pool: &PgPool,
        parent_id: DbId,
        version_id: DbId,
        actor: DbId,
    ) -> Result<VersionedParent, StoreError> {
        let mut tx = pool.begin().await?;
        let locked = lock_parent::<C>(&mut tx, parent_id).await?;

        let target = VersionRepo::<C>::find_for_parent(&mut *tx, parent_id, version_id)
            .await?
            .ok_or_else(|| StoreError::not_found(C::KIND.version_entity(), version_id))?;
        let snapshot_steps = VersionRepo::<C>::list_steps(&mut *tx, target.id).await?;

        let mut contents: Vec<StepContent> =
            snapshot_steps.iter().map(|s| s.content()).collect();
        prune_missing_fixture_refs::<C>(&mut tx, parent_id, &mut contents).await?;

        StepRepo::<C>::delete_all(&mut tx, parent_id).await?;
        for (snapshot_step, content) in snapshot_steps.iter().zip(&contents) {
            StepRepo::<C>::insert(&mut tx, parent_id, snapshot_step.step_order, content).await?;
        }
        ParentRepo::<C>::update_details(
            &mut tx,
            parent_id,
            &target.name,
            target.description.as_deref(),
        )
        .await?;

        let result = capture_and_commit::<C>(tx, &locked, actor).await?;

        tracing::info!(
            kind = %C::KIND,
            parent_id,
            reverted_to = %target.version,
            previous_version = ?locked.live_version,
            version = %result.version.version,
            "Parent reverted"
        );
        Ok(result)
    }
}
