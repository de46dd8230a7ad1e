//! Version snapshot models.
//!
//! Snapshots are immutable: rows are inserted by the snapshot engine and
//! only ever removed by cascade when their parent is deleted.

use casebook_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

use super::step::StepContent;

/// A row from `test_case_versions` or `fixture_versions`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct VersionSnapshot {
    pub id: DbId,
    pub parent_id: DbId,
    pub version: String,
    /// Parent name at capture time.
    pub name: String,
    pub description: Option<String>,
    pub created_by: DbId,
    pub created_at: Timestamp,
}

/// A row from `test_case_version_steps` or `fixture_version_steps`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StepSnapshot {
    pub id: DbId,
    pub version_id: DbId,
    pub step_order: i32,
    pub action: String,
    pub data: Option<String>,
    pub expected: Option<String>,
    pub disabled: bool,
    pub fixture_id: Option<DbId>,
    pub script: Option<String>,
}

impl StepSnapshot {
    pub fn content(&self) -> StepContent {
        StepContent {
            action: self.action.clone(),
            data: self.data.clone(),
            expected: self.expected.clone(),
            disabled: self.disabled,
            fixture_id: self.fixture_id,
            script: self.script.clone(),
        }
    }
}

/// A snapshot header with its ordered steps.
#[derive(Debug, Clone, Serialize)]
pub struct VersionWithSteps {
    #[serde(flatten)]
    pub version: VersionSnapshot,
    pub steps: Vec<StepSnapshot>,
}
