//! Casebook domain core.
//!
//! Pure rules shared by the repository and HTTP layers: identifiers, the
//! error taxonomy, version numbering, step validation and ordering, and the
//! clone naming collaborator. No I/O lives here.

pub mod composite;
pub mod error;
pub mod naming;
pub mod pagination;
pub mod roles;
pub mod steps;
pub mod types;
pub mod versioning;
