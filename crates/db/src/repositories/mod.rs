//! Repository layer.
//!
//! Each repository is a zero-sized struct, generic over a
//! [`VersionedComposite`](crate::composite::VersionedComposite) kind, whose
//! async functions accept either a pool or an open connection. Functions
//! that issue more than one statement take `&mut PgConnection` so they can
//! run inside a caller's transaction.

pub mod parent_repo;
pub mod step_repo;
pub mod version_repo;

pub use parent_repo::ParentRepo;
pub use step_repo::StepRepo;
pub use version_repo::VersionRepo;
