// ABOUTME: Exec operations trait for running query probes inside containers.
// ABOUTME: A trivial query's exit status tells us more than a port check can.

use super::shared_types::{ExecConfig, ExecResult};
use async_trait::async_trait;

/// Exec operations: run a command in a named container and collect the
/// result. Used by query-exec readiness probes.
#[async_trait]
pub trait ExecOps: Send + Sync {
    async fn exec_in_container(
        &self,
        container_name: &str,
        config: &ExecConfig,
    ) -> Result<ExecResult, ExecError>;
}

/// Errors from exec operations.
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("container not found: {0}")]
    ContainerNotFound(String),

    #[error("container not running: {0}")]
    ContainerNotRunning(String),

    #[error("exec failed: {0}")]
    Failed(String),

    #[error("runtime error: {0}")]
    Runtime(String),
}
