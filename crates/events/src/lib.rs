//! Casebook event bus and post-commit side effects.
//!
//! - [`EventBus`] is the in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`PlatformEvent`] is the event envelope; [`VersionCreated`] is the
//!   payload published after every committed snapshot.
//! - [`Codegen`] is the collaborator that regenerates artifacts from live
//!   state, with [`HttpCodegen`] and [`NoopCodegen`] implementations.
//! - [`CodegenDispatcher`] is the background task connecting the two.

pub mod bus;
pub mod codegen;
pub mod dispatcher;

pub use bus::{EventBus, PlatformEvent, VersionCreated};
pub use codegen::{Codegen, CodegenError, HttpCodegen, NoopCodegen};
pub use dispatcher::CodegenDispatcher;
