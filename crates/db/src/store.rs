//! Live parent and step CRUD with atomic history capture.
//!
//! Every mutating call opens one transaction, locks the parent row, applies
//! its change to live rows, and calls [`SnapshotEngine::capture`] before
//! committing. Either the live change and its snapshot both land, or
//! neither does.

use std::marker::PhantomData;

use casebook_core::composite::CompositeKind;
use casebook_core::error::CoreError;
use casebook_core::steps::{
    resolve_insert_position, validate_action, validate_description, validate_fixture_ref,
    validate_name, validate_reorder, validate_step_text,
};
use casebook_core::types::DbId;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};

use crate::composite::{Fixtures, VersionedComposite};
use crate::error::StoreError;
use crate::models::parent::{CreateParent, Parent, ParentWithSteps, UpdateParent, VersionedParent};
use crate::models::step::{CreateStep, StepContent, StepOp, UpdateStep};
use crate::models::version::{StepSnapshot, VersionSnapshot, VersionWithSteps};
use crate::repositories::{ParentRepo, StepRepo, VersionRepo};
use crate::retry::with_retry;
use crate::snapshot::SnapshotEngine;

/// Owns live state for composites of kind `C`.
pub struct VersionedEntityStore<C>(PhantomData<C>);

impl<C: VersionedComposite> VersionedEntityStore<C> {
    // ── Parent lifecycle ─────────────────────────────────────────────

    /// Create a parent with no steps and its initial `1.0.0` snapshot.
    pub async fn create_parent(
        pool: &PgPool,
        input: &CreateParent,
        actor: DbId,
    ) -> Result<VersionedParent, StoreError> {
        validate_name(&input.name)?;
        validate_description(input.description.as_deref())?;

        let mut tx = pool.begin().await?;
        let parent = ParentRepo::<C>::insert(&mut tx, input, actor).await?;
        let version = SnapshotEngine::<C>::capture(&mut tx, parent.id, None, actor).await?;
        let parent = reload_parent::<C>(&mut tx, parent.id).await?;
        tx.commit().await?;

        tracing::info!(
            kind = %C::KIND,
            parent_id = parent.id,
            version = %version.version,
            "Parent created"
        );
        Ok(VersionedParent { parent, version })
    }

    /// Edit the parent's name and/or description, recording a new version.
    pub async fn update_parent(
        pool: &PgPool,
        parent_id: DbId,
        input: &UpdateParent,
        actor: DbId,
    ) -> Result<VersionedParent, StoreError> {
        if let Some(name) = &input.name {
            validate_name(name)?;
        }
        if let Some(description) = &input.description {
            validate_description(description.as_deref())?;
        }

        with_retry(C::KIND, parent_id, || {
            Self::update_parent_once(pool, parent_id, input, actor)
        })
        .await
    }

    async fn update_parent_once(
        pool: &PgPool,
        parent_id: DbId,
        input: &UpdateParent,
        actor: DbId,
    ) -> Result<VersionedParent, StoreError> {
        let mut tx = pool.begin().await?;
        let locked = lock_parent::<C>(&mut tx, parent_id).await?;

        let name = input.name.as_deref().unwrap_or(&locked.name);
        let description = match &input.description {
            Some(description) => description.as_deref(),
            None => locked.description.as_deref(),
        };
        ParentRepo::<C>::update_details(&mut tx, parent_id, name, description).await?;

        let result = capture_and_commit::<C>(tx, &locked, actor).await?;
        tracing::info!(
            kind = %C::KIND,
            parent_id,
            version = %result.version.version,
            "Parent details updated"
        );
        Ok(result)
    }

    /// Delete a parent together with its steps and history.
    pub async fn delete_parent(pool: &PgPool, parent_id: DbId) -> Result<(), StoreError> {
        let removed = ParentRepo::<C>::delete(pool, parent_id)
            .await
            .map_err(|e| StoreError::from_parent_delete(e, C::KIND, parent_id))?;
        if !removed {
            return Err(StoreError::not_found(C::KIND.parent_entity(), parent_id));
        }
        tracing::info!(kind = %C::KIND, parent_id, "Parent deleted");
        Ok(())
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// A live parent with its ordered steps.
    pub async fn get_parent(pool: &PgPool, parent_id: DbId) -> Result<ParentWithSteps, StoreError> {
        let parent = ParentRepo::<C>::find_by_id(pool, parent_id)
            .await?
            .ok_or_else(|| StoreError::not_found(C::KIND.parent_entity(), parent_id))?;
        let steps = StepRepo::<C>::list_by_parent(pool, parent_id).await?;
        Ok(ParentWithSteps { parent, steps })
    }

    pub async fn list_parents(
        pool: &PgPool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Parent>, StoreError> {
        Ok(ParentRepo::<C>::list(pool, limit, offset).await?)
    }

    /// History of a parent, newest first.
    pub async fn list_versions(
        pool: &PgPool,
        parent_id: DbId,
    ) -> Result<Vec<VersionSnapshot>, StoreError> {
        ensure_parent_exists::<C>(pool, parent_id).await?;
        Ok(VersionRepo::<C>::list_by_parent(pool, parent_id).await?)
    }

    /// A snapshot of this parent with its ordered steps.
    pub async fn get_version(
        pool: &PgPool,
        parent_id: DbId,
        version_id: DbId,
    ) -> Result<VersionWithSteps, StoreError> {
        let version = find_version::<C>(pool, parent_id, version_id).await?;
        let steps = VersionRepo::<C>::list_steps(pool, version.id).await?;
        Ok(VersionWithSteps { version, steps })
    }

    /// Ordered steps of a snapshot of this parent.
    pub async fn get_version_steps(
        pool: &PgPool,
        parent_id: DbId,
        version_id: DbId,
    ) -> Result<Vec<StepSnapshot>, StoreError> {
        let version = find_version::<C>(pool, parent_id, version_id).await?;
        Ok(VersionRepo::<C>::list_steps(pool, version.id).await?)
    }

    // ── Step mutations ───────────────────────────────────────────────

    pub async fn add_step(
        pool: &PgPool,
        parent_id: DbId,
        input: CreateStep,
        actor: DbId,
    ) -> Result<VersionedParent, StoreError> {
        Self::mutate_steps(pool, parent_id, &StepOp::Add(input), actor).await
    }

    pub async fn update_step(
        pool: &PgPool,
        parent_id: DbId,
        step_id: DbId,
        changes: UpdateStep,
        actor: DbId,
    ) -> Result<VersionedParent, StoreError> {
        Self::mutate_steps(pool, parent_id, &StepOp::Update { step_id, changes }, actor).await
    }

    pub async fn delete_step(
        pool: &PgPool,
        parent_id: DbId,
        step_id: DbId,
        actor: DbId,
    ) -> Result<VersionedParent, StoreError> {
        Self::mutate_steps(pool, parent_id, &StepOp::Delete { step_id }, actor).await
    }

    pub async fn reorder_steps(
        pool: &PgPool,
        parent_id: DbId,
        step_ids: Vec<DbId>,
        actor: DbId,
    ) -> Result<VersionedParent, StoreError> {
        Self::mutate_steps(pool, parent_id, &StepOp::Reorder { step_ids }, actor).await
    }

    /// Apply one step mutation and record the resulting version.
    ///
    /// Payload validation happens before any database work; membership and
    /// permutation checks happen under the parent lock. Any failure leaves
    /// live state and history untouched.
    pub async fn mutate_steps(
        pool: &PgPool,
        parent_id: DbId,
        op: &StepOp,
        actor: DbId,
    ) -> Result<VersionedParent, StoreError> {
        validate_op(C::KIND, op)?;

        let result = with_retry(C::KIND, parent_id, || {
            Self::mutate_steps_once(pool, parent_id, op, actor)
        })
        .await?;

        tracing::info!(
            kind = %C::KIND,
            parent_id,
            op = op_name(op),
            version = %result.version.version,
            "Steps mutated"
        );
        Ok(result)
    }

    async fn mutate_steps_once(
        pool: &PgPool,
        parent_id: DbId,
        op: &StepOp,
        actor: DbId,
    ) -> Result<VersionedParent, StoreError> {
        let mut tx = pool.begin().await?;
        let locked = lock_parent::<C>(&mut tx, parent_id).await?;

        match op {
            StepOp::Add(input) => Self::apply_add(&mut tx, parent_id, input).await?,
            StepOp::Update { step_id, changes } => {
                Self::apply_update(&mut tx, parent_id, *step_id, changes).await?
            }
            StepOp::Delete { step_id } => Self::apply_delete(&mut tx, parent_id, *step_id).await?,
            StepOp::Reorder { step_ids } => {
                Self::apply_reorder(&mut tx, parent_id, step_ids).await?
            }
        }

        capture_and_commit::<C>(tx, &locked, actor).await
    }

    async fn apply_add(
        conn: &mut PgConnection,
        parent_id: DbId,
        input: &CreateStep,
    ) -> Result<(), StoreError> {
        ensure_fixture_ref::<C>(conn, input.fixture_id).await?;

        let steps = StepRepo::<C>::list_by_parent(&mut *conn, parent_id).await?;
        let position = resolve_insert_position(input.position, steps.len())?;

        StepRepo::<C>::shift_orders(conn, parent_id, position, 1).await?;
        StepRepo::<C>::insert(conn, parent_id, position, &input.content()).await?;
        Ok(())
    }

    async fn apply_update(
        conn: &mut PgConnection,
        parent_id: DbId,
        step_id: DbId,
        changes: &UpdateStep,
    ) -> Result<(), StoreError> {
        let step = StepRepo::<C>::find_for_parent(&mut *conn, parent_id, step_id)
            .await?
            .ok_or_else(|| StoreError::not_found(C::KIND.step_entity(), step_id))?;

        let content = changes.apply(step.content());
        if changes.fixture_id.is_some() {
            ensure_fixture_ref::<C>(conn, content.fixture_id).await?;
        }
        StepRepo::<C>::update_content(conn, step_id, &content).await?;
        Ok(())
    }

    async fn apply_delete(
        conn: &mut PgConnection,
        parent_id: DbId,
        step_id: DbId,
    ) -> Result<(), StoreError> {
        let step = StepRepo::<C>::find_for_parent(&mut *conn, parent_id, step_id)
            .await?
            .ok_or_else(|| StoreError::not_found(C::KIND.step_entity(), step_id))?;

        StepRepo::<C>::delete(conn, step_id).await?;
        StepRepo::<C>::shift_orders(conn, parent_id, step.step_order + 1, -1).await?;
        Ok(())
    }

    async fn apply_reorder(
        conn: &mut PgConnection,
        parent_id: DbId,
        step_ids: &[DbId],
    ) -> Result<(), StoreError> {
        let steps = StepRepo::<C>::list_by_parent(&mut *conn, parent_id).await?;
        let current: Vec<DbId> = steps.iter().map(|s| s.id).collect();
        validate_reorder(&current, step_ids)?;

        for (order, step_id) in (0..).zip(step_ids) {
            StepRepo::<C>::set_order(conn, *step_id, order).await?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Shared transaction helpers
// ---------------------------------------------------------------------------

/// Lock the parent row for the rest of the transaction, or fail `NotFound`.
pub(crate) async fn lock_parent<C: VersionedComposite>(
    conn: &mut PgConnection,
    parent_id: DbId,
) -> Result<Parent, StoreError> {
    ParentRepo::<C>::lock_for_update(conn, parent_id)
        .await?
        .ok_or_else(|| StoreError::not_found(C::KIND.parent_entity(), parent_id))
}

/// Capture a snapshot against the version read at lock time, then commit.
pub(crate) async fn capture_and_commit<C: VersionedComposite>(
    mut tx: Transaction<'_, Postgres>,
    locked: &Parent,
    actor: DbId,
) -> Result<VersionedParent, StoreError> {
    let version =
        SnapshotEngine::<C>::capture(&mut tx, locked.id, locked.live_version.as_deref(), actor)
            .await?;
    let parent = reload_parent::<C>(&mut tx, locked.id).await?;
    tx.commit().await?;
    Ok(VersionedParent { parent, version })
}

pub(crate) async fn reload_parent<C: VersionedComposite>(
    conn: &mut PgConnection,
    parent_id: DbId,
) -> Result<Parent, StoreError> {
    ParentRepo::<C>::find_by_id(conn, parent_id)
        .await?
        .ok_or_else(|| StoreError::not_found(C::KIND.parent_entity(), parent_id))
}

/// Check that a step's fixture reference is allowed for this kind and
/// points at an existing fixture.
pub(crate) async fn ensure_fixture_ref<C: VersionedComposite>(
    conn: &mut PgConnection,
    fixture_id: Option<DbId>,
) -> Result<(), StoreError> {
    validate_fixture_ref(C::KIND, fixture_id)?;
    if let Some(id) = fixture_id {
        if !ParentRepo::<Fixtures>::exists(conn, id).await? {
            return Err(StoreError::not_found(Fixtures::KIND.parent_entity(), id));
        }
    }
    Ok(())
}

/// Drop references to fixtures deleted since the content was captured.
///
/// Historical snapshots keep the fixture id they were taken with; when such
/// content is copied back into live rows the reference must resolve.
pub(crate) async fn prune_missing_fixture_refs<C: VersionedComposite>(
    conn: &mut PgConnection,
    parent_id: DbId,
    contents: &mut [StepContent],
) -> Result<(), StoreError> {
    for content in contents.iter_mut() {
        let Some(fixture_id) = content.fixture_id else {
            continue;
        };
        if !C::KIND.allows_fixture_refs()
            || !ParentRepo::<Fixtures>::exists(&mut *conn, fixture_id).await?
        {
            tracing::warn!(
                kind = %C::KIND,
                parent_id,
                fixture_id,
                "Dropping reference to a fixture that no longer exists"
            );
            content.fixture_id = None;
        }
    }
    Ok(())
}

async fn ensure_parent_exists<C: VersionedComposite>(
    pool: &PgPool,
    parent_id: DbId,
) -> Result<(), StoreError> {
    if !ParentRepo::<C>::exists(pool, parent_id).await? {
        return Err(StoreError::not_found(C::KIND.parent_entity(), parent_id));
    }
    Ok(())
}

async fn find_version<C: VersionedComposite>(
    pool: &PgPool,
    parent_id: DbId,
    version_id: DbId,
) -> Result<VersionSnapshot, StoreError> {
    ensure_parent_exists::<C>(pool, parent_id).await?;
    VersionRepo::<C>::find_for_parent(pool, parent_id, version_id)
        .await?
        .ok_or_else(|| StoreError::not_found(C::KIND.version_entity(), version_id))
}

/// Pure payload checks that need no database access.
fn validate_op(kind: CompositeKind, op: &StepOp) -> Result<(), CoreError> {
    match op {
        StepOp::Add(input) => {
            validate_action(&input.action)?;
            validate_step_text(
                input.data.as_deref(),
                input.expected.as_deref(),
                input.script.as_deref(),
            )?;
            validate_fixture_ref(kind, input.fixture_id)
        }
        StepOp::Update { changes, .. } => {
            if let Some(action) = &changes.action {
                validate_action(action)?;
            }
            validate_step_text(
                changes.data.as_ref().and_then(|d| d.as_deref()),
                changes.expected.as_ref().and_then(|e| e.as_deref()),
                changes.script.as_ref().and_then(|s| s.as_deref()),
            )?;
            validate_fixture_ref(kind, changes.fixture_id.flatten())
        }
        StepOp::Delete { .. } | StepOp::Reorder { .. } => Ok(()),
    }
}

fn op_name(op: &StepOp) -> &'static str {
    match op {
        StepOp::Add(_) => "add",
        StepOp::Update { .. } => "update",
        StepOp::Delete { .. } => "delete",
        StepOp::Reorder { .. } => "reorder",
    }
}
