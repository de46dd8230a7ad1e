//! The two kinds of versioned composite record.
//!
//! A composite is a parent row plus an ordered list of child steps. Test
//! cases and fixtures share the same versioning engine; the kind only decides
//! which tables are used and whether steps may point at a fixture.

use serde::{Deserialize, Serialize};

/// Which family of tables a versioned composite lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositeKind {
    TestCase,
    Fixture,
}

impl CompositeKind {
    /// Snake-case name, used in events and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            CompositeKind::TestCase => "test_case",
            CompositeKind::Fixture => "fixture",
        }
    }

    /// Entity name reported in `NotFound` errors for the parent.
    pub fn parent_entity(self) -> &'static str {
        self.as_str()
    }

    /// Entity name reported in `NotFound` errors for a live step.
    pub fn step_entity(self) -> &'static str {
        match self {
            CompositeKind::TestCase => "test_case_step",
            CompositeKind::Fixture => "fixture_step",
        }
    }

    /// Entity name reported in `NotFound` errors for a version snapshot.
    pub fn version_entity(self) -> &'static str {
        match self {
            CompositeKind::TestCase => "test_case_version",
            CompositeKind::Fixture => "fixture_version",
        }
    }

    /// Only test-case steps may reference a fixture.
    pub fn allows_fixture_refs(self) -> bool {
        matches!(self, CompositeKind::TestCase)
    }
}

impl std::fmt::Display for CompositeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
