// ABOUTME: Per-node deployment pipeline using the type state pattern.
// ABOUTME: A node cannot be recorded ready without passing through classification.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use crate::catalog::ServiceDescriptor;
use crate::launch::{LaunchError, Launcher};
use crate::probe::{self, HttpFetch, ProbeError, ProbePolicy, Readiness};
use crate::runtime::{ContainerOps, ExecOps};

/// Ports resolved, nothing launched yet.
/// Available actions: `launch()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Cleared;

/// Launch procedure succeeded; readiness unknown.
/// Available actions: `await_ready()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Launched;

/// Classification accepted the service. Terminal.
#[derive(Debug, Clone, Copy)]
pub struct Ready {
    readiness: Readiness,
    attempts: u32,
}

/// One service moving through its deployment pipeline, parameterized by
/// state. Failed transitions hand the value back so the scheduler can
/// capture diagnostics with full context.
#[derive(Debug)]
pub struct NodeDeploy<'a, S> {
    svc: &'a ServiceDescriptor,
    state: S,
}

impl<'a, S> NodeDeploy<'a, S> {
    pub fn descriptor(&self) -> &'a ServiceDescriptor {
        self.svc
    }
}

impl<'a> NodeDeploy<'a, Cleared> {
    pub fn new(svc: &'a ServiceDescriptor) -> Self {
        Self {
            svc,
            state: Cleared,
        }
    }

    /// Invoke the external launch procedure.
    #[must_use = "node deployment state must be used"]
    pub async fn launch<L: Launcher>(
        self,
        launcher: &L,
    ) -> Result<NodeDeploy<'a, Launched>, (NodeDeploy<'a, Cleared>, LaunchError)> {
        match launcher.launch(self.svc).await {
            Ok(()) => Ok(NodeDeploy {
                svc: self.svc,
                state: Launched,
            }),
            Err(e) => Err((self, e)),
        }
    }
}

impl<'a> NodeDeploy<'a, Launched> {
    /// Drive the readiness wait loop to an accepted classification.
    #[must_use = "node deployment state must be used"]
    pub async fn await_ready<R, H>(
        self,
        runtime: &R,
        http: &H,
        policy: &ProbePolicy,
        cancel: &Arc<AtomicBool>,
    ) -> Result<NodeDeploy<'a, Ready>, (NodeDeploy<'a, Launched>, ProbeError)>
    where
        R: ContainerOps + ExecOps,
        H: HttpFetch,
    {
        match probe::wait_ready(runtime, http, self.svc, policy, cancel).await {
            Ok((readiness, attempts)) => Ok(NodeDeploy {
                svc: self.svc,
                state: Ready {
                    readiness,
                    attempts,
                },
            }),
            Err(e) => Err((self, e)),
        }
    }
}

impl NodeDeploy<'_, Ready> {
    pub fn readiness(&self) -> Readiness {
        self.state.readiness
    }

    pub fn attempts(&self) -> u32 {
        self.state.attempts
    }
}
