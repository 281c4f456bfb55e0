// ABOUTME: Log tail trait for failure diagnostics.
// ABOUTME: The orchestrator only ever needs the last N lines, never a follow stream.

use async_trait::async_trait;

/// Log retrieval for diagnostics capture.
#[async_trait]
pub trait LogOps: Send + Sync {
    /// Last `n` log lines (stdout and stderr interleaved) of a container.
    async fn tail_logs(&self, container_name: &str, n: u64) -> Result<Vec<String>, LogError>;
}

/// Errors from log operations.
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("container not found: {0}")]
    ContainerNotFound(String),

    #[error("runtime error: {0}")]
    Runtime(String),
}
