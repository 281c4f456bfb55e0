// ABOUTME: Failure manager: ledger of session-created resources and their teardown.
// ABOUTME: Only fatal pre-flight errors roll back; per-node failures never touch ready siblings.

use parking_lot::Mutex;
use std::time::Duration;

use crate::runtime::{ContainerOps, NetworkOps};
use crate::types::{NetworkId, ServiceName};

const STOP_TIMEOUT: Duration = Duration::from_secs(10);

/// Records every container launched and network created during this
/// session, bounding what a fatal-error rollback may touch. Resources that
/// existed before the session are never in the ledger and never torn down.
#[derive(Debug, Default)]
pub struct SessionLedger {
    containers: Mutex<Vec<ServiceName>>,
    networks: Mutex<Vec<NetworkId>>,
}

impl SessionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_container(&self, name: ServiceName) {
        let mut containers = self.containers.lock();
        if !containers.contains(&name) {
            containers.push(name);
        }
    }

    pub fn record_network(&self, id: NetworkId) {
        let mut networks = self.networks.lock();
        if !networks.contains(&id) {
            networks.push(id);
        }
    }

    pub fn containers(&self) -> Vec<ServiceName> {
        self.containers.lock().clone()
    }

    pub fn networks(&self) -> Vec<NetworkId> {
        self.networks.lock().clone()
    }
}

/// What a rollback actually did, for the fatal-error report.
#[derive(Debug, Default)]
pub struct RollbackReport {
    pub removed_containers: Vec<String>,
    pub removed_networks: Vec<String>,
    pub failures: Vec<String>,
}

impl RollbackReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn summary(&self) -> String {
        format!(
            "rolled back {} container(s) and {} network(s){}",
            self.removed_containers.len(),
            self.removed_networks.len(),
            if self.failures.is_empty() {
                String::new()
            } else {
                format!(", {} step(s) failed", self.failures.len())
            }
        )
    }
}

/// Tear down everything the ledger recorded, leaving a clean slate for
/// retry. Best effort throughout: one stuck container must not strand the
/// rest.
pub async fn rollback_session<R>(runtime: &R, ledger: &SessionLedger) -> RollbackReport
where
    R: ContainerOps + NetworkOps,
{
    let mut report = RollbackReport::default();

    for name in ledger.containers() {
        match runtime.inspect_container_by_name(name.container_name()).await {
            Ok(info) => {
                let _ = runtime.stop_container(&info.id, STOP_TIMEOUT).await;
                match runtime.remove_container(&info.id, true).await {
                    Ok(()) => report.removed_containers.push(name.to_string()),
                    Err(e) => report
                        .failures
                        .push(format!("remove container {name}: {e}")),
                }
            }
            // Launched but no container materialized; nothing to clean.
            Err(_) => {}
        }
    }

    for network in ledger.networks() {
        match runtime.remove_network(&network).await {
            Ok(()) => report.removed_networks.push(network.to_string()),
            Err(e) => report.failures.push(format!("remove network {network}: {e}")),
        }
    }

    tracing::info!(
        containers = report.removed_containers.len(),
        networks = report.removed_networks.len(),
        failures = report.failures.len(),
        "session rollback finished"
    );

    report
}
