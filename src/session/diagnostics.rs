// ABOUTME: Failure diagnostics capture: container snapshot, log tail, port listen state.
// ABOUTME: Enough for an operator to diagnose a failed node without re-running.

use chrono::{DateTime, Utc};

use crate::catalog::ServiceDescriptor;
use crate::runtime::{ContainerOps, LogOps};
use crate::types::PortSpec;

/// Point-in-time state of the service's managed container.
#[derive(Debug, Clone)]
pub struct ContainerSnapshot {
    pub name: String,
    pub state: String,
    pub health: Option<String>,
    pub image: String,
}

/// Whether a required port was listening at capture time.
#[derive(Debug, Clone)]
pub struct PortListenState {
    pub port: PortSpec,
    pub listening: bool,
}

/// Everything captured when a node fails.
#[derive(Debug, Clone)]
pub struct Diagnostics {
    pub captured_at: DateTime<Utc>,
    /// None when the container does not exist at all.
    pub container: Option<ContainerSnapshot>,
    pub log_tail: Vec<String>,
    pub ports: Vec<PortListenState>,
}

/// Capture diagnostics for a failed service. Every sub-capture is best
/// effort: a dead container must not turn diagnostics collection into a
/// second failure.
pub async fn capture_diagnostics<R>(
    runtime: &R,
    svc: &ServiceDescriptor,
    log_tail_lines: u64,
) -> Diagnostics
where
    R: ContainerOps + LogOps,
{
    let container_name = svc.name.container_name();

    let container = match runtime.inspect_container_by_name(container_name).await {
        Ok(info) => Some(ContainerSnapshot {
            name: info.name,
            state: format!("{:?}", info.state).to_lowercase(),
            health: info.health.map(|h| format!("{h:?}").to_lowercase()),
            image: info.image,
        }),
        Err(_) => None,
    };

    let log_tail = if container.is_some() {
        runtime
            .tail_logs(container_name, log_tail_lines)
            .await
            .unwrap_or_default()
    } else {
        Vec::new()
    };

    let mut ports = Vec::with_capacity(svc.ports.len());
    for spec in &svc.ports {
        ports.push(PortListenState {
            port: *spec,
            listening: crate::ports::listening(spec.port).await,
        });
    }

    Diagnostics {
        captured_at: Utc::now(),
        container,
        log_tail,
        ports,
    }
}

impl Diagnostics {
    /// Multi-line rendering for the session report.
    pub fn render(&self) -> String {
        let mut out = String::new();

        match &self.container {
            Some(c) => {
                out.push_str(&format!(
                    "    container: {} state={} health={} image={}\n",
                    c.name,
                    c.state,
                    c.health.as_deref().unwrap_or("none"),
                    c.image
                ));
            }
            None => out.push_str("    container: does not exist\n"),
        }

        for p in &self.ports {
            out.push_str(&format!(
                "    port {}: {}\n",
                p.port,
                if p.listening { "listening" } else { "not listening" }
            ));
        }

        if !self.log_tail.is_empty() {
            out.push_str("    log tail:\n");
            for line in &self.log_tail {
                out.push_str(&format!("      {line}\n"));
            }
        }

        out
    }
}
