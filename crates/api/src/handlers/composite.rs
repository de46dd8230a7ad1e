//! Handlers for versioned composites (test cases and fixtures).
//!
//! Every handler is generic over the composite kind `C`; the router mounts
//! one instantiation per kind. Mutations return the parent after commit
//! together with the snapshot they produced, then publish a
//! [`VersionCreated`] event so codegen can run off the request path.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use casebook_core::pagination::{clamp_limit, clamp_offset, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT};
use casebook_core::types::DbId;
use casebook_db::models::parent::{CreateParent, UpdateParent, VersionedParent};
use casebook_db::models::step::{CreateStep, ReorderSteps, UpdateStep};
use casebook_db::{CloneCoordinator, RevertCoordinator, VersionedComposite, VersionedEntityStore};
use casebook_events::VersionCreated;

use crate::error::AppResult;
use crate::extract::AppJson;
use crate::middleware::rbac::{RequireAuth, RequireCreator};
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

/* --------------------------------------------------------------------------
Helpers
-------------------------------------------------------------------------- */

/// Announce a committed snapshot. Never fails the request.
fn publish_version<C: VersionedComposite>(state: &AppState, result: &VersionedParent, actor: DbId) {
    let event = VersionCreated {
        kind: C::KIND,
        parent_id: result.parent.id,
        version: result.version.version.clone(),
    }
    .into_event(actor);
    state.event_bus.publish(event);
}

/* --------------------------------------------------------------------------
Parents
-------------------------------------------------------------------------- */

/// GET /{kind}
pub async fn list_parents<C: VersionedComposite>(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> AppResult<impl IntoResponse> {
    let limit = clamp_limit(params.limit, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT);
    let offset = clamp_offset(params.offset);

    let parents = VersionedEntityStore::<C>::list_parents(&state.pool, limit, offset).await?;
    Ok(Json(DataResponse { data: parents }))
}

/// POST /{kind}
///
/// Create a parent with no steps; its history starts at `1.0.0`.
pub async fn create_parent<C: VersionedComposite>(
    RequireCreator(user): RequireCreator,
    State(state): State<AppState>,
    AppJson(input): AppJson<CreateParent>,
) -> AppResult<impl IntoResponse> {
    let created = VersionedEntityStore::<C>::create_parent(&state.pool, &input, user.user_id).await?;

    tracing::info!(
        user_id = user.user_id,
        kind = %C::KIND,
        parent_id = created.parent.id,
        "Parent created"
    );
    publish_version::<C>(&state, &created, user.user_id);

    Ok((StatusCode::CREATED, Json(DataResponse { data: created })))
}

/// GET /{kind}/{id}
pub async fn get_parent<C: VersionedComposite>(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let parent = VersionedEntityStore::<C>::get_parent(&state.pool, id).await?;
    Ok(Json(DataResponse { data: parent }))
}

/// PUT /{kind}/{id}
pub async fn update_parent<C: VersionedComposite>(
    RequireCreator(user): RequireCreator,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    AppJson(input): AppJson<UpdateParent>,
) -> AppResult<impl IntoResponse> {
    let updated =
        VersionedEntityStore::<C>::update_parent(&state.pool, id, &input, user.user_id).await?;

    tracing::info!(
        user_id = user.user_id,
        kind = %C::KIND,
        parent_id = id,
        version = %updated.version.version,
        "Parent updated"
    );
    publish_version::<C>(&state, &updated, user.user_id);

    Ok(Json(DataResponse { data: updated }))
}

/// DELETE /{kind}/{id}
pub async fn delete_parent<C: VersionedComposite>(
    RequireCreator(user): RequireCreator,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    VersionedEntityStore::<C>::delete_parent(&state.pool, id).await?;

    tracing::info!(user_id = user.user_id, kind = %C::KIND, parent_id = id, "Parent deleted");
    Ok(StatusCode::NO_CONTENT)
}

/* --------------------------------------------------------------------------
Steps
-------------------------------------------------------------------------- */

/// POST /{kind}/{id}/steps
pub async fn add_step<C: VersionedComposite>(
    RequireCreator(user): RequireCreator,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    AppJson(input): AppJson<CreateStep>,
) -> AppResult<impl IntoResponse> {
    let result = VersionedEntityStore::<C>::add_step(&state.pool, id, input, user.user_id).await?;

    tracing::info!(
        user_id = user.user_id,
        kind = %C::KIND,
        parent_id = id,
        version = %result.version.version,
        "Step added"
    );
    publish_version::<C>(&state, &result, user.user_id);

    Ok(Json(DataResponse { data: result }))
}

/// PUT /{kind}/{id}/steps/{step_id}
pub async fn update_step<C: VersionedComposite>(
    RequireCreator(user): RequireCreator,
    State(state): State<AppState>,
    Path((id, step_id)): Path<(DbId, DbId)>,
    AppJson(changes): AppJson<UpdateStep>,
) -> AppResult<impl IntoResponse> {
    let result =
        VersionedEntityStore::<C>::update_step(&state.pool, id, step_id, changes, user.user_id)
            .await?;

    tracing::info!(
        user_id = user.user_id,
        kind = %C::KIND,
        parent_id = id,
        step_id,
        version = %result.version.version,
        "Step updated"
    );
    publish_version::<C>(&state, &result, user.user_id);

    Ok(Json(DataResponse { data: result }))
}

/// DELETE /{kind}/{id}/steps/{step_id}
pub async fn delete_step<C: VersionedComposite>(
    RequireCreator(user): RequireCreator,
    State(state): State<AppState>,
    Path((id, step_id)): Path<(DbId, DbId)>,
) -> AppResult<impl IntoResponse> {
    let result =
        VersionedEntityStore::<C>::delete_step(&state.pool, id, step_id, user.user_id).await?;

    tracing::info!(
        user_id = user.user_id,
        kind = %C::KIND,
        parent_id = id,
        step_id,
        version = %result.version.version,
        "Step deleted"
    );
    publish_version::<C>(&state, &result, user.user_id);

    Ok(Json(DataResponse { data: result }))
}

/// PUT /{kind}/{id}/steps/order
///
/// The body must list every live step id exactly once.
pub async fn reorder_steps<C: VersionedComposite>(
    RequireCreator(user): RequireCreator,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    AppJson(input): AppJson<ReorderSteps>,
) -> AppResult<impl IntoResponse> {
    let result =
        VersionedEntityStore::<C>::reorder_steps(&state.pool, id, input.step_ids, user.user_id)
            .await?;

    tracing::info!(
        user_id = user.user_id,
        kind = %C::KIND,
        parent_id = id,
        version = %result.version.version,
        "Steps reordered"
    );
    publish_version::<C>(&state, &result, user.user_id);

    Ok(Json(DataResponse { data: result }))
}

/* --------------------------------------------------------------------------
History
-------------------------------------------------------------------------- */

/// GET /{kind}/{id}/versions
pub async fn list_versions<C: VersionedComposite>(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let versions = VersionedEntityStore::<C>::list_versions(&state.pool, id).await?;
    Ok(Json(DataResponse { data: versions }))
}

/// GET /{kind}/{id}/versions/{version_id}
pub async fn get_version<C: VersionedComposite>(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    Path((id, version_id)): Path<(DbId, DbId)>,
) -> AppResult<impl IntoResponse> {
    let version = VersionedEntityStore::<C>::get_version(&state.pool, id, version_id).await?;
    Ok(Json(DataResponse { data: version }))
}

/// GET /{kind}/{id}/versions/{version_id}/steps
pub async fn get_version_steps<C: VersionedComposite>(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    Path((id, version_id)): Path<(DbId, DbId)>,
) -> AppResult<impl IntoResponse> {
    let steps = VersionedEntityStore::<C>::get_version_steps(&state.pool, id, version_id).await?;
    Ok(Json(DataResponse { data: steps }))
}

/// POST /{kind}/{id}/versions/{version_id}/revert
pub async fn revert<C: VersionedComposite>(
    RequireCreator(user): RequireCreator,
    State(state): State<AppState>,
    Path((id, version_id)): Path<(DbId, DbId)>,
) -> AppResult<impl IntoResponse> {
    let result = RevertCoordinator::<C>::revert_to(&state.pool, id, version_id, user.user_id).await?;

    tracing::info!(
        user_id = user.user_id,
        kind = %C::KIND,
        parent_id = id,
        version_id,
        version = %result.version.version,
        "Parent reverted"
    );
    publish_version::<C>(&state, &result, user.user_id);

    Ok(Json(DataResponse { data: result }))
}

/// POST /{kind}/{id}/clone
pub async fn clone_parent<C: VersionedComposite>(
    RequireCreator(user): RequireCreator,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let cloned =
        CloneCoordinator::<C>::clone_parent(&state.pool, id, state.naming.as_ref(), user.user_id)
            .await?;

    tracing::info!(
        user_id = user.user_id,
        kind = %C::KIND,
        source_id = id,
        parent_id = cloned.parent.id,
        "Parent cloned"
    );
    publish_version::<C>(&state, &cloned, user.user_id);

    Ok((StatusCode::CREATED, Json(DataResponse { data: cloned })))
}
