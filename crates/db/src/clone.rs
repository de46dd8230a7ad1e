//! Deep-copy a live composite into a new, independently versioned one.

use std::marker::PhantomData;

use casebook_core::naming::CloneNaming;
use casebook_core::steps::validate_name;
use casebook_core::types::DbId;
use sqlx::PgPool;

use crate::composite::VersionedComposite;
use crate::error::StoreError;
use crate::models::parent::{CreateParent, VersionedParent};
use crate::repositories::{ParentRepo, StepRepo};
use crate::snapshot::SnapshotEngine;
use crate::store::{lock_parent, reload_parent};

/// Clones composites of kind `C`.
pub struct CloneCoordinator<C>(PhantomData<C>);

impl<C: VersionedComposite> CloneCoordinator<C> {
    /// Copy the live parent `parent_id` and its steps into a new parent.
    ///
    /// The clone gets a fresh id, a name from `naming`, new step ids with the
    /// same order, content, and fixture references, and a history of exactly
    /// one snapshot. No history rows are shared with the source.
    pub async fn clone_parent(
        pool: &PgPool,
        parent_id: DbId,
        naming: &dyn CloneNaming,
        actor: DbId,
    ) -> Result<VersionedParent, StoreError> {
        let mut tx = pool.begin().await?;

        // Locking the source keeps its name and steps consistent with each other.
        let source = lock_parent::<C>(&mut tx, parent_id).await?;
        let steps = StepRepo::<C>::list_by_parent(&mut *tx, parent_id).await?;

        let name = naming.derive_cloned_name(&source.name);
        validate_name(&name)?;

        let input = CreateParent {
            name,
            description: source.description.clone(),
        };
        let clone = ParentRepo::<C>::insert(&mut tx, &input, actor).await?;
        for step in &steps {
            StepRepo::<C>::insert(&mut tx, clone.id, step.step_order, &step.content()).await?;
        }

        let version = SnapshotEngine::<C>::capture(&mut tx, clone.id, None, actor).await?;
        let parent = reload_parent::<C>(&mut tx, clone.id).await?;
        tx.commit().await?;

        tracing::info!(
            kind = %C::KIND,
            source_id = parent_id,
            clone_id = parent.id,
            step_count = steps.len(),
            version = %version.version,
            "Parent cloned"
        );
        Ok(VersionedParent { parent, version })
    }
}
