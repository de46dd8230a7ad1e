use std::sync::Arc;

use casebook_core::naming::CloneNaming;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheap to clone: everything is behind an `Arc` or is itself a handle.
#[derive(Clone)]
pub struct AppState {
    pub pool: casebook_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// Post-commit events; the codegen dispatcher subscribes to it.
    pub event_bus: Arc<casebook_events::EventBus>,
    /// Names the copy produced by a clone.
    pub naming: Arc<dyn CloneNaming>,
}
