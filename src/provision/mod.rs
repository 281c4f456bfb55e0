// ABOUTME: Idempotent provisioning of shared resources: secrets, certificates, network.
// ABOUTME: Create-or-reuse is the only lifecycle; nothing is ever silently overwritten.

mod certs;
mod network;
mod secrets;

pub use certs::{CertPaths, ensure_certificates, host_primary_addr};
pub use network::ensure_network;
pub use secrets::SecretStore;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::catalog::Catalog;
use crate::config::Config;
use crate::runtime::{NetworkError, NetworkOps};
use crate::types::NetworkId;

/// What kind of shared resource a record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    Secrets,
    Certificate,
    Network,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceKind::Secrets => write!(f, "secrets"),
            ResourceKind::Certificate => write!(f, "certificate"),
            ResourceKind::Network => write!(f, "network"),
        }
    }
}

/// Record of one provisioned (or reused) shared resource.
#[derive(Debug, Clone, Serialize)]
pub struct ProvisionedResource {
    pub kind: ResourceKind,
    /// File path or network name identifying the resource.
    pub identity: String,
    /// True when an existing valid resource was reused instead of created.
    pub reused: bool,
    pub generated_at: DateTime<Utc>,
}

impl ProvisionedResource {
    fn new(kind: ResourceKind, identity: impl Into<String>, reused: bool) -> Self {
        Self {
            kind,
            identity: identity.into(),
            reused,
            generated_at: Utc::now(),
        }
    }
}

/// Errors during resource provisioning. All of them are fatal to the
/// session: nothing is deployed on top of incomplete shared state.
#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error("secret store I/O failed at {path}: {source}")]
    SecretStore {
        path: String,
        source: std::io::Error,
    },

    #[error("secret store at {path} is malformed: {detail}")]
    SecretStoreMalformed { path: String, detail: String },

    #[error("openssl not available: {0}")]
    OpensslMissing(std::io::Error),

    #[error("certificate generation failed ({step}): {stderr}")]
    CertGeneration { step: String, stderr: String },

    #[error("network provisioning failed: {0}")]
    Network(#[from] NetworkError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Provision every shared resource the stack needs, in a fixed order:
/// secrets, certificates, network. Each step reuses existing valid state,
/// so re-running after a partial failure is always safe.
pub async fn provision_all<N: NetworkOps>(
    runtime: &N,
    config: &Config,
    catalog: &Catalog,
) -> Result<(Vec<ProvisionedResource>, NetworkId), ProvisionError> {
    let mut resources = Vec::with_capacity(3);

    // Secrets: every slot the catalog or config names gets a stable value.
    let mut slots = catalog.secret_slots();
    for extra in &config.extra_secrets {
        if !slots.contains(extra) {
            slots.push(extra.clone());
        }
    }

    let mut store = SecretStore::open(&config.secrets_path())?;
    let created = store.ensure_slots(&slots);
    store.persist()?;
    tracing::info!(
        path = %config.secrets_path().display(),
        created = created.len(),
        reused = slots.len() - created.len(),
        "secret store ready"
    );
    resources.push(ProvisionedResource::new(
        ResourceKind::Secrets,
        config.secrets_path().display().to_string(),
        created.is_empty(),
    ));

    // Certificates: CA once, leaf while unexpired.
    let cert_paths = CertPaths::under(&config.certs_dir());
    let cert_reused =
        ensure_certificates(&cert_paths, &config.domain, config.advertise_addr.as_deref()).await?;
    resources.push(ProvisionedResource::new(
        ResourceKind::Certificate,
        cert_paths.leaf_cert.display().to_string(),
        cert_reused,
    ));

    // Network: existing-wins.
    let (network_id, network_reused) = ensure_network(runtime, &config.network).await?;
    resources.push(ProvisionedResource::new(
        ResourceKind::Network,
        config.network.name.clone(),
        network_reused,
    ));

    Ok((resources, network_id))
}
