//! Step field validation and ordering rules.
//!
//! Live steps of a parent always carry the orders `0..n` with no gaps or
//! duplicates. The helpers here check mutation payloads before anything
//! touches the database.

use std::collections::HashSet;

use crate::composite::CompositeKind;
use crate::error::CoreError;
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

/// Maximum length of a parent name in characters.
pub const MAX_NAME_LENGTH: usize = 255;

/// Maximum length of a parent description in characters.
pub const MAX_DESCRIPTION_LENGTH: usize = 5_000;

/// Maximum length of a step action in characters.
pub const MAX_ACTION_LENGTH: usize = 2_000;

/// Maximum length of step `data` / `expected` in characters.
pub const MAX_STEP_TEXT_LENGTH: usize = 10_000;

/// Maximum length of an embedded step script in characters.
pub const MAX_SCRIPT_LENGTH: usize = 100_000;

// ---------------------------------------------------------------------------
// Parent fields
// ---------------------------------------------------------------------------

/// Validate a parent name (non-blank, <= 255 chars).
pub fn validate_name(name: &str) -> Result<(), CoreError> {
    if name.trim().is_empty() {
        return Err(CoreError::Validation("Name must not be empty".into()));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(CoreError::Validation(format!(
            "Name must be at most {MAX_NAME_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Validate an optional parent description.
pub fn validate_description(description: Option<&str>) -> Result<(), CoreError> {
    validate_max_len("Description", description, MAX_DESCRIPTION_LENGTH)
}

// ---------------------------------------------------------------------------
// Step fields
// ---------------------------------------------------------------------------

/// Validate a step action (non-blank, <= 2000 chars).
pub fn validate_action(action: &str) -> Result<(), CoreError> {
    if action.trim().is_empty() {
        return Err(CoreError::Validation("Step action must not be empty".into()));
    }
    if action.chars().count() > MAX_ACTION_LENGTH {
        return Err(CoreError::Validation(format!(
            "Step action must be at most {MAX_ACTION_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Validate the optional free-text fields of a step.
pub fn validate_step_text(
    data: Option<&str>,
    expected: Option<&str>,
    script: Option<&str>,
) -> Result<(), CoreError> {
    validate_max_len("Step data", data, MAX_STEP_TEXT_LENGTH)?;
    validate_max_len("Step expected result", expected, MAX_STEP_TEXT_LENGTH)?;
    validate_max_len("Step script", script, MAX_SCRIPT_LENGTH)
}

/// Reject fixture references on kinds whose steps cannot carry them.
pub fn validate_fixture_ref(kind: CompositeKind, fixture_id: Option<DbId>) -> Result<(), CoreError> {
    if fixture_id.is_some() && !kind.allows_fixture_refs() {
        return Err(CoreError::Validation(format!(
            "Steps of a {kind} cannot reference a fixture"
        )));
    }
    Ok(())
}

fn validate_max_len(label: &str, value: Option<&str>, max: usize) -> Result<(), CoreError> {
    match value {
        Some(v) if v.chars().count() > max => Err(CoreError::Validation(format!(
            "{label} must be at most {max} characters"
        ))),
        _ => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Ordering
// ---------------------------------------------------------------------------

/// Resolve where a new step goes among `step_count` existing steps.
///
/// `None` appends. An explicit position must lie in `0..=step_count`.
pub fn resolve_insert_position(position: Option<i32>, step_count: usize) -> Result<i32, CoreError> {
    let count = i32::try_from(step_count)
        .map_err(|_| CoreError::Validation("Too many steps".into()))?;
    match position {
        None => Ok(count),
        Some(p) if (0..=count).contains(&p) => Ok(p),
        Some(p) => Err(CoreError::Validation(format!(
            "Step position {p} is out of range 0..={count}"
        ))),
    }
}

/// Check that `requested` is exactly a permutation of `current`.
pub fn validate_reorder(current: &[DbId], requested: &[DbId]) -> Result<(), CoreError> {
    if requested.len() != current.len() {
        return Err(CoreError::InvalidOrder(format!(
            "Expected {} step ids, got {}",
            current.len(),
            requested.len()
        )));
    }

    let mut seen = HashSet::with_capacity(requested.len());
    for id in requested {
        if !seen.insert(*id) {
            return Err(CoreError::InvalidOrder(format!("Step id {id} appears more than once")));
        }
    }

    let current: HashSet<DbId> = current.iter().copied().collect();
    if let Some(unknown) = requested.iter().find(|id| !current.contains(id)) {
        return Err(CoreError::InvalidOrder(format!(
            "Step id {unknown} does not belong to this parent"
        )));
    }
    Ok(())
}

/// Whether `orders` is exactly `{0, 1, ..., n-1}` in any arrangement.
pub fn is_contiguous(orders: &[i32]) -> bool {
    let mut sorted = orders.to_vec();
    sorted.sort_unstable();
    sorted
        .iter()
        .enumerate()
        .all(|(i, order)| usize::try_from(*order).is_ok_and(|o| o == i))
}
