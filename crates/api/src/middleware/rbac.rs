//! Role-based access control extractors.
//!
//! Reads are open to any authenticated user; anything that writes live state
//! or history needs an authoring role.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use casebook_core::error::CoreError;
use casebook_core::roles::{ROLE_ADMIN, ROLE_CREATOR};

use super::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

/// Requires `creator` or `admin` role. Rejects with 403 Forbidden otherwise.
pub struct RequireCreator(pub AuthUser);

impl FromRequestParts<AppState> for RequireCreator {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if user.role != ROLE_ADMIN && user.role != ROLE_CREATOR {
            return Err(AppError::Core(CoreError::Forbidden(
                "Creator or Admin role required".into(),
            )));
        }
        Ok(RequireCreator(user))
    }
}

/// Requires any authenticated user.
pub struct RequireAuth(pub AuthUser);

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        Ok(RequireAuth(user))
    }
}
