// ABOUTME: Port conflict resolution: is the occupant our own healthy instance or a stranger?
// ABOUTME: Self-resolution on reruns is the whole point - a healthy stack must not report conflicts.

use std::time::Duration;

use tokio::net::TcpStream;
use tokio::process::Command;

use crate::catalog::ServiceDescriptor;
use crate::probe::{self, HttpFetch};
use crate::runtime::{ContainerOps, ContainerState, ExecOps};
use crate::types::{PortSpec, Protocol};

/// Outcome of port resolution for one service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// No required port is occupied.
    Clear,
    /// The occupant is this deployment's own, already-healthy instance of
    /// the service. Deployment can be skipped entirely.
    SelfResolved { readiness: crate::probe::Readiness },
    /// A genuine conflict: someone else holds the port.
    Conflict { conflicts: Vec<PortConflict> },
}

/// One conflicting port with its occupant, if identifiable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortConflict {
    pub port: PortSpec,
    pub occupant: Option<Occupant>,
}

impl std::fmt::Display for PortConflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.occupant {
            Some(o) => write!(f, "{} held by {} (pid {})", self.port, o.command, o.pid),
            None => write!(f, "{} held by unknown process", self.port),
        }
    }
}

/// The process found listening on a conflicting port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occupant {
    pub pid: i32,
    pub command: String,
}

/// Whether something is listening on a local TCP port.
pub async fn listening(port: u16) -> bool {
    let connect = TcpStream::connect(("127.0.0.1", port));
    matches!(
        tokio::time::timeout(Duration::from_millis(500), connect).await,
        Ok(Ok(_))
    )
}

/// Resolve the required ports of a service against the host's current state.
///
/// A listening port is only a conflict if the listener is not the target
/// service's own healthy instance; re-running against an already-deployed
/// stack must classify as `SelfResolved`, not fail.
pub async fn resolve<R, H>(runtime: &R, http: &H, svc: &ServiceDescriptor) -> Resolution
where
    R: ContainerOps + ExecOps,
    H: HttpFetch,
{
    let mut occupied = Vec::new();
    for spec in &svc.ports {
        // UDP has no reliable local occupancy probe; only TCP ports are
        // considered for conflicts.
        if spec.protocol == Protocol::Tcp && listening(spec.port).await {
            occupied.push(*spec);
        }
    }

    if occupied.is_empty() {
        return Resolution::Clear;
    }

    // Something is listening. If our own managed container is up and the
    // classifier accepts it, this is the service itself.
    if let Ok(info) = runtime.inspect_container_by_name(svc.name.container_name()).await {
        if info.state == ContainerState::Running {
            let readiness = probe::classify(runtime, http, svc).await;
            if readiness.is_acceptable() {
                tracing::info!(
                    service = %svc.name,
                    "ports occupied by our own healthy instance, skipping deployment"
                );
                return Resolution::SelfResolved { readiness };
            }
        }
    }

    let mut conflicts = Vec::with_capacity(occupied.len());
    for spec in occupied {
        conflicts.push(PortConflict {
            port: spec,
            occupant: occupant_of(spec.port).await,
        });
    }

    Resolution::Conflict { conflicts }
}

/// Best-effort lookup of the process listening on a TCP port via lsof.
/// Absence of lsof (or of permission) degrades to an anonymous conflict.
pub async fn occupant_of(port: u16) -> Option<Occupant> {
    let output = Command::new("lsof")
        .arg("-nP")
        .arg("-t")
        .arg(format!("-iTCP:{port}"))
        .arg("-sTCP:LISTEN")
        .output()
        .await
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let pid: i32 = String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()?
        .trim()
        .parse()
        .ok()?;

    let command = Command::new("ps")
        .arg("-o")
        .arg("comm=")
        .arg("-p")
        .arg(pid.to_string())
        .output()
        .await
        .ok()
        .filter(|o| o.status.success())
        .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string())
        .unwrap_or_default();

    Some(Occupant { pid, command })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unbound_port_is_not_listening() {
        // Bind then drop to find a port that is definitely free.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        assert!(!listening(port).await);
    }

    #[tokio::test]
    async fn bound_port_is_listening() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        assert!(listening(port).await);
    }

    #[test]
    fn conflict_display_includes_occupant() {
        let conflict = PortConflict {
            port: PortSpec::tcp(9200),
            occupant: Some(Occupant {
                pid: 4242,
                command: "java".to_string(),
            }),
        };
        assert_eq!(conflict.to_string(), "9200/tcp held by java (pid 4242)");
    }
}
