//! Parent entity model (a test case or a fixture) and DTOs.

use casebook_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::double_option;
use super::step::Step;
use super::version::VersionSnapshot;

/// A row from `test_cases` or `fixtures`.
///
/// `live_version` is only `None` inside the transaction that creates the
/// row; every committed parent carries the version of its newest snapshot.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Parent {
    pub id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub live_version: Option<String>,
    pub created_by: DbId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a parent. It starts without steps.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateParent {
    pub name: String,
    pub description: Option<String>,
}

/// DTO for editing a parent's own fields. `description: null` clears it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateParent {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
}

/// A live parent together with its ordered live steps.
#[derive(Debug, Clone, Serialize)]
pub struct ParentWithSteps {
    #[serde(flatten)]
    pub parent: Parent,
    pub steps: Vec<Step>,
}

/// Result of any mutation: the parent after commit and the snapshot it produced.
#[derive(Debug, Clone, Serialize)]
pub struct VersionedParent {
    pub parent: Parent,
    pub version: VersionSnapshot,
}
