//! Table families for each versioned composite kind.
//!
//! One generic engine serves both kinds; a kind is a marker type naming the
//! four tables it owns. All four families share identical column shapes.

use casebook_core::composite::CompositeKind;

/// A parent table plus its live steps, snapshots, and snapshot steps.
pub trait VersionedComposite: Send + Sync + 'static {
    const KIND: CompositeKind;
    const PARENT_TABLE: &'static str;
    const STEP_TABLE: &'static str;
    const VERSION_TABLE: &'static str;
    const VERSION_STEP_TABLE: &'static str;
}

/// Test cases: steps may reference a fixture.
#[derive(Debug, Clone, Copy)]
pub struct TestCases;

impl VersionedComposite for TestCases {
    const KIND: CompositeKind = CompositeKind::TestCase;
    const PARENT_TABLE: &'static str = "test_cases";
    const STEP_TABLE: &'static str = "test_case_steps";
    const VERSION_TABLE: &'static str = "test_case_versions";
    const VERSION_STEP_TABLE: &'static str = "test_case_version_steps";
}

/// Fixtures: reusable step sequences referenced from test cases.
#[derive(Debug, Clone, Copy)]
pub struct Fixtures;

impl VersionedComposite for Fixtures {
    const KIND: CompositeKind = CompositeKind::Fixture;
    const PARENT_TABLE: &'static str = "fixtures";
    const STEP_TABLE: &'static str = "fixture_steps";
    const VERSION_TABLE: &'static str = "fixture_versions";
    const VERSION_STEP_TABLE: &'static str = "fixture_version_steps";
}
