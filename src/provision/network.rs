// ABOUTME: Isolated network provisioning with the existing-wins policy.
// ABOUTME: A subnet mismatch against an existing network is warned about, never fatal.

use std::collections::HashMap;

use crate::config::NetworkSettings;
use crate::runtime::{NetworkError, NetworkOps, NetworkSpec};
use crate::types::NetworkId;

use super::ProvisionError;

/// Ensure the deployment network exists. Returns the network ID and
/// whether an existing network was reused.
///
/// Existing-wins: a network with the right name is reused even when its
/// address range differs from the requested one. The divergence is logged
/// at WARN so the operator sees it, but a rerun against an
/// already-provisioned host must not fail over it.
pub async fn ensure_network<N: NetworkOps>(
    runtime: &N,
    settings: &NetworkSettings,
) -> Result<(NetworkId, bool), ProvisionError> {
    if let Some(existing) = runtime.inspect_network(&settings.name).await? {
        if let (Some(requested), Some(actual)) = (&settings.subnet, &existing.subnet) {
            if requested != actual {
                tracing::warn!(
                    network = %settings.name,
                    requested = %requested,
                    actual = %actual,
                    "existing network subnet differs from requested range, reusing as-is"
                );
            }
        }
        tracing::info!(network = %settings.name, "network already exists, reusing");
        return Ok((existing.id, true));
    }

    let spec = NetworkSpec {
        name: settings.name.clone(),
        driver: Some(settings.driver.clone().unwrap_or_else(|| "bridge".to_string())),
        subnet: settings.subnet.clone(),
        labels: HashMap::from([("stockade.managed".to_string(), "true".to_string())]),
    };

    match runtime.create_network(&spec).await {
        Ok(id) => {
            tracing::info!(network = %settings.name, "created isolated network");
            Ok((id, false))
        }
        Err(NetworkError::AlreadyExists(_)) => {
            // Lost a race against another creator; the inspect tells us
            // what won.
            let existing = runtime
                .inspect_network(&settings.name)
                .await?
                .ok_or_else(|| {
                    ProvisionError::Network(NetworkError::NotFound(settings.name.clone()))
                })?;
            Ok((existing.id, true))
        }
        Err(e) => Err(ProvisionError::Network(e)),
    }
}
