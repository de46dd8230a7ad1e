//! Background task forwarding committed versions to the codegen collaborator.
//!
//! [`CodegenDispatcher`] subscribes to the [`EventBus`](crate::bus::EventBus)
//! and calls [`Codegen::regenerate`] for every [`VersionCreated`] event.
//! Request handlers only publish, so regeneration never delays a response.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::bus::{PlatformEvent, VersionCreated};
use crate::codegen::Codegen;

pub struct CodegenDispatcher {
    codegen: Arc<dyn Codegen>,
}

impl CodegenDispatcher {
    pub fn new(codegen: Arc<dyn Codegen>) -> Self {
        Self { codegen }
    }

    /// Run until `cancel` fires or the bus is dropped.
    pub async fn run(
        &self,
        mut receiver: broadcast::Receiver<PlatformEvent>,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Codegen dispatcher cancelled");
                    break;
                }
                received = receiver.recv() => match received {
                    Ok(event) => self.handle(&event).await,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(
                            skipped = n,
                            "Codegen dispatcher lagged, some regenerations were skipped"
                        );
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        tracing::info!("Event bus closed, codegen dispatcher shutting down");
                        break;
                    }
                },
            }
        }
    }

    async fn handle(&self, event: &PlatformEvent) {
        let Some(created) = VersionCreated::from_event(event) else {
            return;
        };

        match self.codegen.regenerate(created.kind, created.parent_id).await {
            Ok(()) => tracing::debug!(
                kind = %created.kind,
                parent_id = created.parent_id,
                version = %created.version,
                "Artifacts regenerated"
            ),
            Err(e) => tracing::warn!(
                kind = %created.kind,
                parent_id = created.parent_id,
                version = %created.version,
                error = %e,
                "Codegen failed; live state is unaffected"
            ),
        }
    }
}
