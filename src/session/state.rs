// ABOUTME: DeploymentSession and per-node outcome state machine.
// ABOUTME: Terminal states are final: the outcome map refuses to overwrite them.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rand::Rng;
use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use std::collections::BTreeMap;

use crate::probe::Readiness;
use crate::types::ServiceName;

use super::diagnostics::Diagnostics;

/// Which slice of the catalog a session deploys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Full,
    Simple,
    Custom,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Full => write!(f, "full"),
            Mode::Simple => write!(f, "simple"),
            Mode::Custom => write!(f, "custom"),
        }
    }
}

/// Per-node deployment state.
///
/// `PENDING -> DEPLOYING -> {READY | READY_DEGRADED | FAILED}`, or
/// `PENDING -> SKIPPED` when a dependency did not come up. Terminal states
/// never transition again within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Pending,
    Deploying,
    Ready,
    ReadyDegraded,
    Skipped,
    Failed,
}

impl NodeState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, NodeState::Pending | NodeState::Deploying)
    }

    /// Whether dependents may proceed on top of this node.
    pub fn is_acceptable(self) -> bool {
        matches!(self, NodeState::Ready | NodeState::ReadyDegraded)
    }
}

impl From<Readiness> for NodeState {
    fn from(readiness: Readiness) -> Self {
        match readiness {
            Readiness::Ready => NodeState::Ready,
            Readiness::ReadyDegraded => NodeState::ReadyDegraded,
            Readiness::NotReady => NodeState::Failed,
        }
    }
}

impl std::fmt::Display for NodeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeState::Pending => write!(f, "pending"),
            NodeState::Deploying => write!(f, "deploying"),
            NodeState::Ready => write!(f, "ready"),
            NodeState::ReadyDegraded => write!(f, "ready (degraded)"),
            NodeState::Skipped => write!(f, "skipped"),
            NodeState::Failed => write!(f, "failed"),
        }
    }
}

/// Outcome of one service within one session.
#[derive(Debug, Clone)]
pub struct ServiceOutcome {
    pub state: NodeState,
    pub attempts: u32,
    pub last_error: Option<String>,
    pub diagnostics: Option<Diagnostics>,
}

impl ServiceOutcome {
    pub fn pending() -> Self {
        Self {
            state: NodeState::Pending,
            attempts: 0,
            last_error: None,
            diagnostics: None,
        }
    }

    pub fn deploying() -> Self {
        Self {
            state: NodeState::Deploying,
            attempts: 0,
            last_error: None,
            diagnostics: None,
        }
    }

    pub fn ready(readiness: Readiness, attempts: u32) -> Self {
        Self {
            state: readiness.into(),
            attempts,
            last_error: None,
            diagnostics: None,
        }
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            state: NodeState::Skipped,
            attempts: 0,
            last_error: Some(reason.into()),
            diagnostics: None,
        }
    }

    pub fn failed(
        error: impl Into<String>,
        attempts: u32,
        diagnostics: Option<Diagnostics>,
    ) -> Self {
        Self {
            state: NodeState::Failed,
            attempts,
            last_error: Some(error.into()),
            diagnostics,
        }
    }
}

/// One end-to-end orchestrator run against a requested service subset.
///
/// Created at session start, mutated only through `record`, finalized when
/// every targeted node holds a terminal outcome. Never reused across runs.
#[derive(Debug)]
pub struct DeploymentSession {
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    pub mode: Mode,
    /// Targets plus transitive dependencies, in deployment order.
    pub target_services: Vec<ServiceName>,
    outcomes: Mutex<BTreeMap<ServiceName, ServiceOutcome>>,
}

impl DeploymentSession {
    pub fn new(mode: Mode, target_services: Vec<ServiceName>) -> Self {
        let outcomes = target_services
            .iter()
            .map(|name| (name.clone(), ServiceOutcome::pending()))
            .collect();

        Self {
            session_id: generate_session_id(),
            started_at: Utc::now(),
            mode,
            target_services,
            outcomes: Mutex::new(outcomes),
        }
    }

    /// Record a node's outcome. Atomic per node; an attempt to move a node
    /// out of a terminal state is dropped with a warning instead of
    /// corrupting the session.
    pub fn record(&self, name: &ServiceName, outcome: ServiceOutcome) {
        let mut outcomes = self.outcomes.lock();
        match outcomes.get(name) {
            Some(existing) if existing.state.is_terminal() => {
                tracing::warn!(
                    service = %name,
                    current = %existing.state,
                    rejected = %outcome.state,
                    "refusing to overwrite terminal outcome"
                );
            }
            _ => {
                outcomes.insert(name.clone(), outcome);
            }
        }
    }

    pub fn outcome_of(&self, name: &ServiceName) -> Option<ServiceOutcome> {
        self.outcomes.lock().get(name).cloned()
    }

    /// Point-in-time copy of the full outcome map.
    pub fn snapshot(&self) -> BTreeMap<ServiceName, ServiceOutcome> {
        self.outcomes.lock().clone()
    }

    pub fn all_terminal(&self) -> bool {
        self.outcomes
            .lock()
            .values()
            .all(|o| o.state.is_terminal())
    }

    /// True when every targeted node reached an acceptable state.
    pub fn is_success(&self) -> bool {
        self.outcomes
            .lock()
            .values()
            .all(|o| o.state.is_acceptable())
    }
}

fn generate_session_id() -> String {
    let suffix: String = OsRng
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(char::from)
        .collect();
    format!(
        "{}-{}",
        Utc::now().format("%Y%m%d-%H%M%S"),
        suffix.to_lowercase()
    )
}
