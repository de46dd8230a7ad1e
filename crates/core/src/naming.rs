//! Naming collaborator used when cloning a parent.

use crate::steps::MAX_NAME_LENGTH;

/// Suffix appended to the name of a cloned parent.
pub const CLONE_SUFFIX: &str = " (Copy)";

/// Derives the display name of a clone from the original's name.
pub trait CloneNaming: Send + Sync {
    fn derive_cloned_name(&self, original: &str) -> String;
}

/// Appends [`CLONE_SUFFIX`], trimming the original so the result stays
/// within [`MAX_NAME_LENGTH`] characters.
#[derive(Debug, Clone, Copy, Default)]
pub struct CopySuffixNaming;

impl CloneNaming for CopySuffixNaming {
    fn derive_cloned_name(&self, original: &str) -> String {
        let budget = MAX_NAME_LENGTH - CLONE_SUFFIX.chars().count();
        let base: String = original.trim().chars().take(budget).collect();
        format!("{}{CLONE_SUFFIX}", base.trim_end())
    }
}
