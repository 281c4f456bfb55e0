// ABOUTME: Topological scheduler: walks the deployment order, one node at a time.
// ABOUTME: Dependency failures skip dependents; independent branches keep going.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::catalog::Catalog;
use crate::config::Config;
use crate::graph::DependencyGraph;
use crate::launch::Launcher;
use crate::output::Output;
use crate::ports::{self, Resolution};
use crate::probe::{HttpFetch, ProbeError};
use crate::runtime::{ContainerOps, ExecOps, LogOps};
use crate::types::ServiceName;

use super::diagnostics::capture_diagnostics;
use super::node::NodeDeploy;
use super::rollback::SessionLedger;
use super::state::{DeploymentSession, Mode, ServiceOutcome};

/// Drives a deployment session to completion, sequentially in topological
/// order. Nodes with no unmet dependency are independent in principle;
/// deploying them one at a time keeps diagnostics simple and the outcome
/// deterministic, and outcome recording is already atomic per node, so
/// parallelizing branches later would not change observable semantics.
pub struct Scheduler<'a, R, L, H> {
    runtime: &'a R,
    launcher: &'a L,
    http: &'a H,
    config: &'a Config,
    cancel: Arc<AtomicBool>,
}

impl<'a, R, L, H> Scheduler<'a, R, L, H>
where
    R: ContainerOps + ExecOps + LogOps,
    L: Launcher,
    H: HttpFetch,
{
    pub fn new(
        runtime: &'a R,
        launcher: &'a L,
        http: &'a H,
        config: &'a Config,
        cancel: Arc<AtomicBool>,
    ) -> Self {
        Self {
            runtime,
            launcher,
            http,
            config,
            cancel,
        }
    }

    /// Deploy `targets` (already closed over transitive dependencies) and
    /// return the finalized session. Per-node failures are recorded, not
    /// raised: the session itself always completes.
    pub async fn run(
        &self,
        graph: &DependencyGraph,
        catalog: &Catalog,
        targets: &[ServiceName],
        mode: Mode,
        ledger: &SessionLedger,
        output: &Output,
    ) -> DeploymentSession {
        let order = graph.deployment_order(targets);
        let session = DeploymentSession::new(mode, order.clone());

        tracing::info!(
            session = %session.session_id,
            services = order.len(),
            %mode,
            "deployment session started"
        );

        for name in &order {
            if self.cancel.load(Ordering::Relaxed) {
                session.record(name, ServiceOutcome::skipped("session cancelled by operator"));
                output.service(name.as_str(), "skipped (cancelled)");
                continue;
            }

            let svc = catalog
                .get(name)
                .expect("deployment order only contains catalog services");

            // a. Dependency gate: a failed or skipped dependency
            //    propagates forward without aborting siblings.
            if let Some(unmet) = self.first_unmet_dependency(&session, graph, name) {
                let reason = format!("dependency {unmet} did not become ready");
                tracing::warn!(service = %name, %unmet, "skipping node");
                session.record(name, ServiceOutcome::skipped(reason));
                output.service(name.as_str(), "skipped (dependency)");
                continue;
            }

            // b. Port resolution before any launch.
            match ports::resolve(self.runtime, self.http, svc).await {
                Resolution::SelfResolved { readiness } => {
                    session.record(name, ServiceOutcome::ready(readiness, 0));
                    output.service(name.as_str(), "already running");
                    continue;
                }
                Resolution::Conflict { conflicts } => {
                    let detail = conflicts
                        .iter()
                        .map(|c| c.to_string())
                        .collect::<Vec<_>>()
                        .join("; ");
                    let diagnostics =
                        capture_diagnostics(self.runtime, svc, self.config.log_tail).await;
                    session.record(
                        name,
                        ServiceOutcome::failed(
                            format!("port conflict: {detail}"),
                            0,
                            Some(diagnostics),
                        ),
                    );
                    output.service(name.as_str(), "failed (port conflict)");
                    continue;
                }
                Resolution::Clear => {}
            }

            // c. Launch, then wait for readiness.
            session.record(name, ServiceOutcome::deploying());
            output.progress(&format!("deploying {name}..."));

            // Recorded before the launch so a fatal abort can clean up a
            // container the launch half-created.
            ledger.record_container(name.clone());

            let node = NodeDeploy::new(svc);
            let launched = match node.launch(self.launcher).await {
                Ok(launched) => launched,
                Err((_node, e)) => {
                    let diagnostics =
                        capture_diagnostics(self.runtime, svc, self.config.log_tail).await;
                    session.record(name, ServiceOutcome::failed(e.to_string(), 0, Some(diagnostics)));
                    output.service(name.as_str(), "failed (launch)");
                    continue;
                }
            };

            match launched
                .await_ready(self.runtime, self.http, &self.config.probe, &self.cancel)
                .await
            {
                Ok(ready) => {
                    session.record(
                        name,
                        ServiceOutcome::ready(ready.readiness(), ready.attempts()),
                    );
                    output.service(name.as_str(), ready.readiness().describe());
                }
                Err((_node, e @ ProbeError::Cancelled)) => {
                    let diagnostics =
                        capture_diagnostics(self.runtime, svc, self.config.log_tail).await;
                    session.record(
                        name,
                        ServiceOutcome::failed(e.to_string(), 0, Some(diagnostics)),
                    );
                    output.service(name.as_str(), "failed (cancelled)");
                }
                Err((_node, e)) => {
                    let attempts = self.config.probe.attempts;
                    let diagnostics =
                        capture_diagnostics(self.runtime, svc, self.config.log_tail).await;
                    session.record(
                        name,
                        ServiceOutcome::failed(e.to_string(), attempts, Some(diagnostics)),
                    );
                    output.service(name.as_str(), "failed (not ready)");
                }
            }
        }

        tracing::info!(
            session = %session.session_id,
            success = session.is_success(),
            "deployment session finished"
        );

        session
    }

    /// First dependency of `name` whose outcome is not acceptable, if any.
    /// Dependencies outside the target set are assumed satisfied: the
    /// closure computation already pulled in everything reachable.
    fn first_unmet_dependency(
        &self,
        session: &DeploymentSession,
        graph: &DependencyGraph,
        name: &ServiceName,
    ) -> Option<ServiceName> {
        graph
            .dependencies_of(name)
            .iter()
            .find(|dep| {
                session
                    .outcome_of(dep)
                    .is_some_and(|o| !o.state.is_acceptable())
            })
            .cloned()
    }
}
