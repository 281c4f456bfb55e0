// ABOUTME: Container introspection and lifecycle trait.
// ABOUTME: The orchestrator never creates containers - launch is an external procedure.

use super::shared_types::ContainerInfo;
use crate::types::ContainerId;
use async_trait::async_trait;
use std::time::Duration;

/// Container operations the orchestrator needs: inspection for readiness
/// and conflict resolution, stop/remove for rollback and teardown.
/// Creation is deliberately absent; services are launched by an opaque
/// external procedure.
#[async_trait]
pub trait ContainerOps: Send + Sync {
    /// Inspect a container by name. The managed unit for a service carries
    /// the service's name.
    async fn inspect_container_by_name(
        &self,
        name: &str,
    ) -> Result<ContainerInfo, ContainerError>;

    /// List containers matching the given filters.
    async fn list_containers(
        &self,
        filters: &ContainerFilters,
    ) -> Result<Vec<ContainerSummary>, ContainerError>;

    /// Stop a running container.
    async fn stop_container(
        &self,
        id: &ContainerId,
        timeout: Duration,
    ) -> Result<(), ContainerError>;

    /// Remove a container.
    async fn remove_container(&self, id: &ContainerId, force: bool) -> Result<(), ContainerError>;
}

/// Filters for listing containers.
#[derive(Debug, Clone, Default)]
pub struct ContainerFilters {
    /// Filter by exact name.
    pub name: Option<String>,
    /// Include stopped containers.
    pub all: bool,
}

/// Summary information about a container.
#[derive(Debug, Clone)]
pub struct ContainerSummary {
    pub id: ContainerId,
    pub name: String,
    pub image: String,
    pub state: String,
    pub status: String,
}

/// Errors from container operations.
#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    #[error("container not found: {0}")]
    NotFound(String),

    #[error("container not running: {0}")]
    NotRunning(String),

    #[error("runtime error: {0}")]
    Runtime(String),
}
