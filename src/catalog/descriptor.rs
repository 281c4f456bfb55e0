// ABOUTME: Static service definitions: role, ports, dependencies, probe, launch command.
// ABOUTME: Immutable once loaded; the graph and scheduler only ever read these.

use serde::{Deserialize, Serialize};

use crate::probe::ProbeSpec;
use crate::types::{PortSpec, ServiceName};

/// Category a service belongs to. Used only for grouping and for breaking
/// ordering ties in displays, never for scheduling decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    DataTier,
    SecurityTool,
    Frontend,
    InfraTool,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::DataTier => write!(f, "data-tier"),
            Role::SecurityTool => write!(f, "security-tool"),
            Role::Frontend => write!(f, "frontend"),
            Role::InfraTool => write!(f, "infra-tool"),
        }
    }
}

/// Static definition of one deployable service.
///
/// The launch command is opaque to the orchestrator: it may be a compose
/// invocation, a helper script, anything that exits zero once the unit is
/// created and started.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceDescriptor {
    pub name: ServiceName,

    pub role: Role,

    #[serde(default)]
    pub ports: Vec<PortSpec>,

    #[serde(default)]
    pub depends_on: Vec<ServiceName>,

    pub probe: ProbeSpec,

    pub launch: Vec<String>,

    /// Secret slots this service consumes. The provisioner guarantees each
    /// slot has a value before anything is launched.
    #[serde(default)]
    pub secrets: Vec<String>,
}
