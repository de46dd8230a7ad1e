//! Route definitions shared by every versioned composite kind.

use axum::routing::{get, post, put};
use axum::Router;
use casebook_db::VersionedComposite;

use crate::handlers::composite;
use crate::state::AppState;

/// Routes for one composite kind, nested under `/test-cases` or `/fixtures`.
///
/// ```text
/// GET    /                                     list_parents
/// POST   /                                     create_parent
/// GET    /{id}                                 get_parent
/// PUT    /{id}                                 update_parent
/// DELETE /{id}                                 delete_parent
/// POST   /{id}/steps                           add_step
/// PUT    /{id}/steps/order                     reorder_steps
/// PUT    /{id}/steps/{step_id}                 update_step
/// DELETE /{id}/steps/{step_id}                 delete_step
/// GET    /{id}/versions                        list_versions
/// GET    /{id}/versions/{version_id}           get_version
/// GET    /{id}/versions/{version_id}/steps     get_version_steps
/// POST   /{id}/versions/{version_id}/revert    revert
/// POST   /{id}/clone                           clone_parent
/// ```
pub fn router<C: VersionedComposite>() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(composite::list_parents::<C>).post(composite::create_parent::<C>),
        )
        .route(
            "/{id}",
            get(composite::get_parent::<C>)
                .put(composite::update_parent::<C>)
                .delete(composite::delete_parent::<C>),
        )
        .route("/{id}/steps", post(composite::add_step::<C>))
        .route("/{id}/steps/order", put(composite::reorder_steps::<C>))
        .route(
            "/{id}/steps/{step_id}",
            put(composite::update_step::<C>).delete(composite::delete_step::<C>),
        )
        .route("/{id}/versions", get(composite::list_versions::<C>))
        .route(
            "/{id}/versions/{version_id}",
            get(composite::get_version::<C>),
        )
        .route(
            "/{id}/versions/{version_id}/steps",
            get(composite::get_version_steps::<C>),
        )
        .route(
            "/{id}/versions/{version_id}/revert",
            post(composite::revert::<C>),
        )
        .route("/{id}/clone", post(composite::clone_parent::<C>))
}
