//! Live step model, step content, and mutation DTOs.

use casebook_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::double_option;

/// A row from `test_case_steps` or `fixture_steps`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Step {
    pub id: DbId,
    pub parent_id: DbId,
    pub step_order: i32,
    pub action: String,
    pub data: Option<String>,
    pub expected: Option<String>,
    pub disabled: bool,
    /// Non-owning reference to a fixture (test-case steps only).
    pub fixture_id: Option<DbId>,
    pub script: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Step {
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

/// The copyable payload of a step, identical between live rows and snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepContent {
    pub action: String,
    pub data: Option<String>,
    pub expected: Option<String>,
    pub disabled: bool,
    pub fixture_id: Option<DbId>,
    pub script: Option<String>,
}

/// DTO for adding a step. `position` defaults to the end of the list.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateStep {
    pub action: String,
    pub data: Option<String>,
    pub expected: Option<String>,
    #[serde(default)]
    pub disabled: bool,
    pub fixture_id: Option<DbId>,
    pub script: Option<String>,
    pub position: Option<i32>,
}

impl CreateStep {
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

/// DTO for editing a step. Absent fields are kept; nullable fields sent as
/// `null` are cleared.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateStep {
    pub action: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub data: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub expected: Option<Option<String>>,
    pub disabled: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    pub fixture_id: Option<Option<DbId>>,
    #[serde(default, deserialize_with = "double_option")]
    pub script: Option<Option<String>>,
}

impl UpdateStep {
    /// Overlay these changes on the current content of a step.
    pub fn apply(&self, current: StepContent) -> StepContent {
        StepContent {
            action: self.action.clone().unwrap_or(current.action),
            data: self.data.clone().unwrap_or(current.data),
            expected: self.expected.clone().unwrap_or(current.expected),
            disabled: self.disabled.unwrap_or(current.disabled),
            fixture_id: self.fixture_id.unwrap_or(current.fixture_id),
            script: self.script.clone().unwrap_or(current.script),
        }
    }
}

/// Request body for reordering: every live step id, in the new order.
#[derive(Debug, Clone, Deserialize)]
pub struct ReorderSteps {
    pub step_ids: Vec<DbId>,
}

/// One mutation of a parent's live steps.
#[derive(Debug, Clone)]
pub enum StepOp {
    Add(CreateStep),
    Update { step_id: DbId, changes: UpdateStep },
    Delete { step_id: DbId },
    Reorder { step_ids: Vec<DbId> },
}
