// ABOUTME: Readiness classification for deployed services.
// ABOUTME: Two-stage evaluation: container liveness, then a protocol-level functional probe.

mod http;

pub use http::{
    HttpFetch, HttpProbeError, HttpProbeResponse, ReqwestFetcher, classify_http_body,
    classify_http_status,
};

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::catalog::ServiceDescriptor;
use crate::runtime::{ContainerOps, ContainerState, ExecConfig, ExecOps, HealthState};

/// Functional state of a service, beyond process liveness.
///
/// `ReadyDegraded` means the service answers but is not fully configured
/// yet (for example an authentication-required response from an endpoint
/// that is otherwise up). The scheduler treats it as sufficient to proceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Readiness {
    NotReady,
    Ready,
    ReadyDegraded,
}

impl Readiness {
    /// Whether this classification unblocks dependents.
    pub fn is_acceptable(self) -> bool {
        matches!(self, Readiness::Ready | Readiness::ReadyDegraded)
    }

    pub fn describe(self) -> &'static str {
        match self {
            Readiness::Ready => "ready",
            Readiness::ReadyDegraded => "ready (degraded)",
            Readiness::NotReady => "not ready",
        }
    }
}

/// Probe strategy attached to a service descriptor.
///
/// A closed set: anything a service needs beyond these belongs in the
/// service itself, not in the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ProbeSpec {
    /// HTTP request; the status code alone decides.
    HttpStatus {
        port: u16,
        path: String,
        #[serde(default)]
        https: bool,
    },
    /// HTTP request; the response body is interpreted semantically
    /// (cluster-health style endpoints).
    HttpBodyClassify {
        port: u16,
        path: String,
        #[serde(default)]
        https: bool,
    },
    /// Execute a trivial query inside the container; exit status decides.
    QueryExec { command: Vec<String> },
    /// TCP connect to the port is the whole check.
    PortOnly { port: u16 },
}

/// Retry budget for the readiness wait loop. Values come from
/// configuration, not from code.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ProbePolicy {
    #[serde(default = "default_interval", with = "humantime_serde")]
    pub interval: Duration,

    #[serde(default = "default_attempts")]
    pub attempts: u32,

    #[serde(default = "default_request_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,
}

fn default_interval() -> Duration {
    Duration::from_secs(5)
}

fn default_attempts() -> u32 {
    24
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(5)
}

impl Default for ProbePolicy {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            attempts: default_attempts(),
            request_timeout: default_request_timeout(),
        }
    }
}

/// Errors from the wait loop. Classification itself never errors: transport
/// failures are `NotReady`, not faults.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("service {service} not ready after {attempts} attempts")]
    Exhausted { service: String, attempts: u32 },

    #[error("readiness wait cancelled by operator")]
    Cancelled,
}

/// Classify a service once.
///
/// Stage 1 checks the managed container: it must exist and be running. A
/// container with no health status passes through; one reporting
/// "starting" is not ready this cycle; one reporting "unhealthy" still
/// proceeds to stage 2 — container health checks are frequently
/// misconfigured relative to actual service readiness, and the functional
/// probe is the authority.
///
/// Stage 2 runs the descriptor's functional probe.
pub async fn classify<R, H>(runtime: &R, http: &H, svc: &ServiceDescriptor) -> Readiness
where
    R: ContainerOps + ExecOps,
    H: HttpFetch,
{
    let info = match runtime.inspect_container_by_name(svc.name.container_name()).await {
        Ok(info) => info,
        Err(_) => return Readiness::NotReady,
    };

    if info.state != ContainerState::Running {
        return Readiness::NotReady;
    }

    match info.health {
        Some(HealthState::Starting) => return Readiness::NotReady,
        Some(HealthState::Unhealthy) => {
            tracing::debug!(
                service = %svc.name,
                "container reports unhealthy, deferring to functional probe"
            );
        }
        _ => {}
    }

    functional_probe(runtime, http, svc).await
}

async fn functional_probe<R, H>(runtime: &R, http: &H, svc: &ServiceDescriptor) -> Readiness
where
    R: ExecOps,
    H: HttpFetch,
{
    match &svc.probe {
        ProbeSpec::HttpStatus { port, path, https } => {
            match http.fetch(*port, path, *https).await {
                Ok(resp) => classify_http_status(resp.status),
                Err(e) => {
                    tracing::debug!(service = %svc.name, error = %e, "http probe unreachable");
                    Readiness::NotReady
                }
            }
        }
        ProbeSpec::HttpBodyClassify { port, path, https } => {
            match http.fetch(*port, path, *https).await {
                Ok(resp) => classify_http_body(resp.status, &resp.body),
                Err(e) => {
                    tracing::debug!(service = %svc.name, error = %e, "http probe unreachable");
                    Readiness::NotReady
                }
            }
        }
        ProbeSpec::QueryExec { command } => query_probe(runtime, svc, command).await,
        ProbeSpec::PortOnly { port } => {
            if crate::ports::listening(*port).await {
                Readiness::Ready
            } else {
                Readiness::NotReady
            }
        }
    }
}

/// Execute a trivial query inside the container. Exit 0 means the service
/// answers queries; anything else means it is not ready yet.
async fn query_probe<R: ExecOps>(
    runtime: &R,
    svc: &ServiceDescriptor,
    command: &[String],
) -> Readiness {
    let exec = ExecConfig {
        cmd: command.to_vec(),
        ..Default::default()
    };

    match runtime.exec_in_container(svc.name.container_name(), &exec).await {
        Ok(result) if result.exit_code == 0 => Readiness::Ready,
        Ok(result) => {
            tracing::debug!(
                service = %svc.name,
                exit_code = result.exit_code,
                "query probe failed"
            );
            Readiness::NotReady
        }
        Err(e) => {
            tracing::debug!(service = %svc.name, error = %e, "query probe exec failed");
            Readiness::NotReady
        }
    }
}

/// Repoll until the service classifies as acceptable or the budget runs out.
///
/// This is the only place the scheduler suspends: bounded sleep-and-repoll,
/// mirroring the external world's readiness timeline. Cancellation is
/// observed between cycles and surfaces as `ProbeError::Cancelled`.
pub async fn wait_ready<R, H>(
    runtime: &R,
    http: &H,
    svc: &ServiceDescriptor,
    policy: &ProbePolicy,
    cancel: &Arc<AtomicBool>,
) -> Result<(Readiness, u32), ProbeError>
where
    R: ContainerOps + ExecOps,
    H: HttpFetch,
{
    for attempt in 1..=policy.attempts {
        if cancel.load(Ordering::Relaxed) {
            return Err(ProbeError::Cancelled);
        }

        let readiness = classify(runtime, http, svc).await;
        if readiness.is_acceptable() {
            return Ok((readiness, attempt));
        }

        tracing::debug!(
            service = %svc.name,
            attempt,
            max = policy.attempts,
            "not ready yet"
        );

        if attempt < policy.attempts {
            tokio::time::sleep(policy.interval).await;
        }
    }

    Err(ProbeError::Exhausted {
        service: svc.name.to_string(),
        attempts: policy.attempts,
    })
}
