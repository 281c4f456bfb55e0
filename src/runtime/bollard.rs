// ABOUTME: Bollard-based runtime backend for the local Docker or Podman socket.
// ABOUTME: Maps HTTP status codes from the daemon API onto the typed trait errors.

use async_trait::async_trait;
use bollard::Docker;
use bollard::exec::StartExecOptions;
use bollard::models::{Ipam, IpamConfig, NetworkCreateRequest};
use bollard::query_parameters::{
    InspectContainerOptions, InspectNetworkOptions, ListContainersOptions, LogsOptions,
    RemoveContainerOptions, StopContainerOptions,
};
use futures::StreamExt;
use std::collections::HashMap;
use std::time::Duration;

use crate::runtime::traits::{
    ContainerError, ContainerFilters, ContainerInfo, ContainerOps, ContainerState,
    ContainerSummary, ExecConfig, ExecError, ExecOps, HealthState, LogError, LogOps,
    NetworkDetails, NetworkError, NetworkOps, NetworkSpec, RuntimeInfo, RuntimeInfoError,
    RuntimeMetadata,
};
use crate::runtime::types::{DetectedRuntime, RuntimeType};
use crate::types::{ContainerId, NetworkId};

// =============================================================================
// Error Mapping Helpers
// =============================================================================

fn map_container_not_found_error(e: bollard::errors::Error) -> ContainerError {
    match &e {
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 404 => ContainerError::NotFound(message.clone()),
        _ => ContainerError::Runtime(e.to_string()),
    }
}

fn map_container_stop_error(e: bollard::errors::Error) -> ContainerError {
    match &e {
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 404 => ContainerError::NotFound(message.clone()),
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 304 => ContainerError::NotRunning(message.clone()),
        _ => ContainerError::Runtime(e.to_string()),
    }
}

fn map_network_create_error(e: bollard::errors::Error) -> NetworkError {
    match &e {
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 409 => NetworkError::AlreadyExists(message.clone()),
        _ => NetworkError::Runtime(e.to_string()),
    }
}

fn map_network_remove_error(e: bollard::errors::Error) -> NetworkError {
    match &e {
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 404 => NetworkError::NotFound(message.clone()),
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 403 => NetworkError::InUse(message.clone()),
        _ => NetworkError::Runtime(e.to_string()),
    }
}

fn map_exec_create_error(e: bollard::errors::Error) -> ExecError {
    match &e {
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 404 => ExecError::ContainerNotFound(message.clone()),
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 409 => ExecError::ContainerNotRunning(message.clone()),
        _ => ExecError::Runtime(e.to_string()),
    }
}

fn map_exec_not_found_error(e: bollard::errors::Error) -> ExecError {
    match &e {
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 404 => ExecError::Failed(message.clone()),
        _ => ExecError::Runtime(e.to_string()),
    }
}

// =============================================================================
// BollardRuntime
// =============================================================================

/// Runtime backend over the local Docker or Podman socket.
pub struct BollardRuntime {
    client: Docker,
    runtime_type: RuntimeType,
}

impl BollardRuntime {
    pub fn new(client: Docker, runtime_type: RuntimeType) -> Self {
        Self {
            client,
            runtime_type,
        }
    }

    /// Connect to the runtime described by local detection.
    pub fn connect(info: &DetectedRuntime) -> Result<Self, RuntimeInfoError> {
        let client =
            Docker::connect_with_unix(&info.socket_path, 120, bollard::API_DEFAULT_VERSION)
                .map_err(|e| RuntimeInfoError::ConnectionFailed(e.to_string()))?;
        Ok(Self::new(client, info.runtime_type))
    }

    /// Get the runtime type (Docker or Podman).
    pub fn runtime_type(&self) -> RuntimeType {
        self.runtime_type
    }

    /// Execute in detached mode and poll for completion.
    /// Used for Podman which has issues with attached exec streams not closing.
    async fn exec_start_detached(&self, exec_id: &str) -> Result<ExecResultInner, ExecError> {
        let opts = StartExecOptions {
            detach: true,
            ..Default::default()
        };

        self.client
            .start_exec(exec_id, Some(opts))
            .await
            .map_err(map_exec_not_found_error)?;

        let poll_interval = Duration::from_millis(100);
        let max_wait = Duration::from_secs(60);
        let start = std::time::Instant::now();

        loop {
            let details = self
                .client
                .inspect_exec(exec_id)
                .await
                .map_err(map_exec_not_found_error)?;

            if !details.running.unwrap_or(false) {
                return Ok(ExecResultInner {
                    exit_code: details.exit_code.unwrap_or(0),
                    stdout: Vec::new(), // output not captured in detached mode
                    stderr: Vec::new(),
                });
            }

            if start.elapsed() > max_wait {
                return Err(ExecError::Failed("exec timed out".to_string()));
            }

            tokio::time::sleep(poll_interval).await;
        }
    }
}

struct ExecResultInner {
    exit_code: i64,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

#[async_trait]
impl RuntimeInfo for BollardRuntime {
    async fn info(&self) -> Result<RuntimeMetadata, RuntimeInfoError> {
        let info = self
            .client
            .info()
            .await
            .map_err(|e| RuntimeInfoError::ConnectionFailed(e.to_string()))?;

        Ok(RuntimeMetadata {
            name: self.runtime_type.to_string(),
            version: info.server_version.unwrap_or_default(),
            api_version: bollard::API_DEFAULT_VERSION.to_string(),
            os: info.operating_system.unwrap_or_default(),
            arch: info.architecture.unwrap_or_default(),
        })
    }

    async fn ping(&self) -> Result<(), RuntimeInfoError> {
        self.client
            .ping()
            .await
            .map_err(|e| RuntimeInfoError::ConnectionFailed(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl ContainerOps for BollardRuntime {
    async fn inspect_container_by_name(
        &self,
        name: &str,
    ) -> Result<ContainerInfo, ContainerError> {
        let details = self
            .client
            .inspect_container(name, None::<InspectContainerOptions>)
            .await
            .map_err(map_container_not_found_error)?;

        let state = details
            .state
            .as_ref()
            .and_then(|s| s.status)
            .map(|s| match s {
                bollard::models::ContainerStateStatusEnum::CREATED => ContainerState::Created,
                bollard::models::ContainerStateStatusEnum::RUNNING => ContainerState::Running,
                bollard::models::ContainerStateStatusEnum::PAUSED => ContainerState::Paused,
                bollard::models::ContainerStateStatusEnum::RESTARTING => ContainerState::Restarting,
                bollard::models::ContainerStateStatusEnum::REMOVING => ContainerState::Removing,
                bollard::models::ContainerStateStatusEnum::EXITED => ContainerState::Exited,
                bollard::models::ContainerStateStatusEnum::DEAD => ContainerState::Dead,
                _ => ContainerState::Exited,
            })
            .unwrap_or(ContainerState::Exited);

        let health = details
            .state
            .as_ref()
            .and_then(|s| s.health.as_ref())
            .and_then(|h| h.status)
            .and_then(|s| match s {
                bollard::models::HealthStatusEnum::STARTING => Some(HealthState::Starting),
                bollard::models::HealthStatusEnum::HEALTHY => Some(HealthState::Healthy),
                bollard::models::HealthStatusEnum::UNHEALTHY => Some(HealthState::Unhealthy),
                _ => None,
            });

        Ok(ContainerInfo {
            id: ContainerId::new(details.id.unwrap_or_default()),
            name: details
                .name
                .unwrap_or_default()
                .trim_start_matches('/')
                .to_string(),
            image: details
                .config
                .as_ref()
                .and_then(|c| c.image.clone())
                .unwrap_or_default(),
            state,
            health,
            created: details.created.map(|dt| dt.to_string()).unwrap_or_default(),
        })
    }

    async fn list_containers(
        &self,
        filters: &ContainerFilters,
    ) -> Result<Vec<ContainerSummary>, ContainerError> {
        let mut filter_map: HashMap<String, Vec<String>> = HashMap::new();
        if let Some(ref name) = filters.name {
            filter_map.insert("name".to_string(), vec![name.clone()]);
        }

        let opts = ListContainersOptions {
            all: filters.all,
            filters: Some(filter_map),
            ..Default::default()
        };

        let containers = self
            .client
            .list_containers(Some(opts))
            .await
            .map_err(|e| ContainerError::Runtime(e.to_string()))?;

        Ok(containers
            .into_iter()
            .map(|c| {
                let name = c
                    .names
                    .unwrap_or_default()
                    .first()
                    .map(|n| n.trim_start_matches('/').to_string())
                    .unwrap_or_default();
                ContainerSummary {
                    id: ContainerId::new(c.id.unwrap_or_default()),
                    name,
                    image: c.image.unwrap_or_default(),
                    state: c
                        .state
                        .map(|s| s.to_string().to_lowercase())
                        .unwrap_or_default(),
                    status: c.status.unwrap_or_default(),
                }
            })
            .collect())
    }

    async fn stop_container(
        &self,
        id: &ContainerId,
        timeout: Duration,
    ) -> Result<(), ContainerError> {
        let opts = StopContainerOptions {
            t: Some(timeout.as_secs() as i32),
            signal: None,
        };

        self.client
            .stop_container(id.as_str(), Some(opts))
            .await
            .map_err(map_container_stop_error)
    }

    async fn remove_container(&self, id: &ContainerId, force: bool) -> Result<(), ContainerError> {
        let opts = RemoveContainerOptions {
            force,
            ..Default::default()
        };

        self.client
            .remove_container(id.as_str(), Some(opts))
            .await
            .map_err(map_container_not_found_error)?;

        Ok(())
    }
}

#[async_trait]
impl NetworkOps for BollardRuntime {
    async fn create_network(&self, spec: &NetworkSpec) -> Result<NetworkId, NetworkError> {
        let ipam = spec.subnet.as_ref().map(|subnet| Ipam {
            driver: Some("default".to_string()),
            config: Some(vec![IpamConfig {
                subnet: Some(subnet.clone()),
                ..Default::default()
            }]),
            options: None,
        });

        let opts = NetworkCreateRequest {
            name: spec.name.clone(),
            driver: spec.driver.clone(),
            ipam,
            labels: if spec.labels.is_empty() {
                None
            } else {
                Some(spec.labels.clone())
            },
            ..Default::default()
        };

        let response = self
            .client
            .create_network(opts)
            .await
            .map_err(map_network_create_error)?;

        Ok(NetworkId::new(response.id))
    }

    async fn remove_network(&self, id: &NetworkId) -> Result<(), NetworkError> {
        self.client
            .remove_network(id.as_str())
            .await
            .map_err(map_network_remove_error)
    }

    async fn inspect_network(&self, name: &str) -> Result<Option<NetworkDetails>, NetworkError> {
        match self
            .client
            .inspect_network(name, None::<InspectNetworkOptions>)
            .await
        {
            Ok(network) => {
                let subnet = network
                    .ipam
                    .as_ref()
                    .and_then(|ipam| ipam.config.as_ref())
                    .and_then(|configs| configs.first())
                    .and_then(|c| c.subnet.clone());

                Ok(Some(NetworkDetails {
                    id: NetworkId::new(network.id.unwrap_or_default()),
                    name: network.name.unwrap_or_else(|| name.to_string()),
                    subnet,
                }))
            }
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 404, ..
            }) => Ok(None),
            Err(e) => Err(NetworkError::Runtime(e.to_string())),
        }
    }
}

#[async_trait]
impl ExecOps for BollardRuntime {
    async fn exec_in_container(
        &self,
        container_name: &str,
        config: &ExecConfig,
    ) -> Result<crate::runtime::ExecResult, ExecError> {
        let opts = bollard::models::ExecConfig {
            cmd: Some(config.cmd.clone()),
            env: if config.env.is_empty() {
                None
            } else {
                Some(config.env.clone())
            },
            working_dir: config.working_dir.clone(),
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            ..Default::default()
        };

        let created = self
            .client
            .create_exec(container_name, opts)
            .await
            .map_err(map_exec_create_error)?;
        let exec_id = created.id;

        // Podman's attached exec streams do not always close; poll instead.
        if self.runtime_type == RuntimeType::Podman {
            let inner = self.exec_start_detached(&exec_id).await?;
            return Ok(crate::runtime::ExecResult {
                exit_code: inner.exit_code,
                stdout: inner.stdout,
                stderr: inner.stderr,
            });
        }

        let opts = StartExecOptions {
            detach: false,
            ..Default::default()
        };

        let result = self
            .client
            .start_exec(&exec_id, Some(opts))
            .await
            .map_err(map_exec_not_found_error)?;

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();

        if let bollard::exec::StartExecResults::Attached { mut output, .. } = result {
            while let Some(item) = output.next().await {
                match item {
                    Ok(bollard::container::LogOutput::StdOut { message }) => {
                        stdout.extend(message);
                    }
                    Ok(bollard::container::LogOutput::StdErr { message }) => {
                        stderr.extend(message);
                    }
                    Ok(_) => {}
                    Err(e) => {
                        return Err(ExecError::Failed(e.to_string()));
                    }
                }
            }
        }

        let details = self
            .client
            .inspect_exec(&exec_id)
            .await
            .map_err(map_exec_not_found_error)?;

        Ok(crate::runtime::ExecResult {
            exit_code: details.exit_code.unwrap_or(0),
            stdout,
            stderr,
        })
    }
}

#[async_trait]
impl LogOps for BollardRuntime {
    async fn tail_logs(&self, container_name: &str, n: u64) -> Result<Vec<String>, LogError> {
        let opts = LogsOptions {
            stdout: true,
            stderr: true,
            follow: false,
            timestamps: false,
            tail: n.to_string(),
            ..Default::default()
        };

        let mut stream = self.client.logs(container_name, Some(opts));
        let mut lines = Vec::new();

        while let Some(item) = stream.next().await {
            match item {
                Ok(output) => {
                    let message = match output {
                        bollard::container::LogOutput::StdOut { message } => message,
                        bollard::container::LogOutput::StdErr { message } => message,
                        bollard::container::LogOutput::StdIn { message } => message,
                        bollard::container::LogOutput::Console { message } => message,
                    };
                    for line in String::from_utf8_lossy(&message).lines() {
                        lines.push(line.to_string());
                    }
                }
                Err(bollard::errors::Error::DockerResponseServerError {
                    status_code: 404,
                    message,
                }) => return Err(LogError::ContainerNotFound(message)),
                Err(e) => return Err(LogError::Runtime(e.to_string())),
            }
        }

        Ok(lines)
    }
}
