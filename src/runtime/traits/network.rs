// ABOUTME: Network operations trait: create, inspect, remove isolated networks.
// ABOUTME: Subnet inspection backs the existing-wins mismatch warning.

use crate::types::NetworkId;
use async_trait::async_trait;
use std::collections::HashMap;

/// Configuration for creating an isolated network.
#[derive(Debug, Clone)]
pub struct NetworkSpec {
    pub name: String,
    /// Driver, normally "bridge".
    pub driver: Option<String>,
    /// Requested address range in CIDR notation.
    pub subnet: Option<String>,
    pub labels: HashMap<String, String>,
}

/// What an existing network actually looks like.
#[derive(Debug, Clone)]
pub struct NetworkDetails {
    pub id: NetworkId,
    pub name: String,
    pub subnet: Option<String>,
}

/// Network operations: create, inspect, remove.
#[async_trait]
pub trait NetworkOps: Send + Sync {
    /// Create a network.
    async fn create_network(&self, spec: &NetworkSpec) -> Result<NetworkId, NetworkError>;

    /// Remove a network.
    async fn remove_network(&self, id: &NetworkId) -> Result<(), NetworkError>;

    /// Inspect a network by name, if it exists.
    async fn inspect_network(&self, name: &str) -> Result<Option<NetworkDetails>, NetworkError>;
}

/// Errors from network operations.
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error("network not found: {0}")]
    NotFound(String),

    #[error("network already exists: {0}")]
    AlreadyExists(String),

    #[error("network in use, cannot remove: {0}")]
    InUse(String),

    #[error("runtime error: {0}")]
    Runtime(String),
}
