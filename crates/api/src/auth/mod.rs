//! Authentication primitives.
//!
//! Tokens are issued by the identity service; this server only validates
//! them and reads the user id and role.

pub mod jwt;
