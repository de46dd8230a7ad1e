pub mod composite;
pub mod health;

use axum::Router;
use casebook_db::{Fixtures, TestCases};

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /test-cases/...        versioned test cases   (see composite::router)
/// /fixtures/...          versioned fixtures     (see composite::router)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/test-cases", composite::router::<TestCases>())
        .nest("/fixtures", composite::router::<Fixtures>())
}
