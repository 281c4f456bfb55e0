// ABOUTME: In-memory fakes for the runtime, launcher, and HTTP probe seams.
// ABOUTME: Scriptable per service/port so scheduler scenarios run without a daemon.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use stockade::catalog::ServiceDescriptor;
use stockade::launch::{LaunchError, Launcher};
use stockade::probe::{HttpFetch, HttpProbeError, HttpProbeResponse};
use stockade::runtime::{
    ContainerError, ContainerFilters, ContainerInfo, ContainerOps, ContainerState,
    ContainerSummary, ExecConfig, ExecError, ExecOps, ExecResult, HealthState, LogError, LogOps,
    NetworkDetails, NetworkError, NetworkOps, NetworkSpec,
};
use stockade::types::{ContainerId, NetworkId};

/// One fake container's scripted behavior.
#[derive(Debug, Clone)]
pub struct FakeContainer {
    pub state: ContainerState,
    pub health: Option<HealthState>,
    /// Exit code every exec in this container returns.
    pub exec_exit: i64,
    pub logs: Vec<String>,
}

impl FakeContainer {
    pub fn running() -> Self {
        Self {
            state: ContainerState::Running,
            health: None,
            exec_exit: 0,
            logs: Vec::new(),
        }
    }

    pub fn exited() -> Self {
        Self {
            state: ContainerState::Exited,
            health: None,
            exec_exit: 1,
            logs: Vec::new(),
        }
    }

    pub fn with_health(mut self, health: HealthState) -> Self {
        self.health = Some(health);
        self
    }

    pub fn with_exec_exit(mut self, code: i64) -> Self {
        self.exec_exit = code;
        self
    }

    pub fn with_logs(mut self, lines: &[&str]) -> Self {
        self.logs = lines.iter().map(|l| l.to_string()).collect();
        self
    }
}

/// In-memory container runtime. Container IDs equal container names.
#[derive(Debug, Default)]
pub struct FakeRuntime {
    pub containers: Mutex<HashMap<String, FakeContainer>>,
    /// network name -> subnet
    pub networks: Mutex<HashMap<String, Option<String>>>,
}

impl FakeRuntime {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn insert_container(&self, name: &str, container: FakeContainer) {
        self.containers.lock().insert(name.to_string(), container);
    }

    pub fn insert_network(&self, name: &str, subnet: Option<&str>) {
        self.networks
            .lock()
            .insert(name.to_string(), subnet.map(String::from));
    }

    pub fn container_names(&self) -> Vec<String> {
        self.containers.lock().keys().cloned().collect()
    }
}

#[async_trait]
impl ContainerOps for FakeRuntime {
    async fn inspect_container_by_name(
        &self,
        name: &str,
    ) -> Result<ContainerInfo, ContainerError> {
        let containers = self.containers.lock();
        let container = containers
            .get(name)
            .ok_or_else(|| ContainerError::NotFound(name.to_string()))?;

        Ok(ContainerInfo {
            id: ContainerId::new(name),
            name: name.to_string(),
            image: "fake/image:latest".to_string(),
            state: container.state,
            health: container.health,
            created: "2026-01-01T00:00:00Z".to_string(),
        })
    }

    async fn list_containers(
        &self,
        filters: &ContainerFilters,
    ) -> Result<Vec<ContainerSummary>, ContainerError> {
        let containers = self.containers.lock();
        Ok(containers
            .iter()
            .filter(|(name, _)| {
                filters
                    .name
                    .as_ref()
                    .is_none_or(|wanted| *name == wanted)
            })
            .filter(|(_, c)| filters.all || c.state == ContainerState::Running)
            .map(|(name, c)| ContainerSummary {
                id: ContainerId::new(name.clone()),
                name: name.clone(),
                image: "fake/image:latest".to_string(),
                state: format!("{:?}", c.state).to_lowercase(),
                status: String::new(),
            })
            .collect())
    }

    async fn stop_container(
        &self,
        id: &ContainerId,
        _timeout: Duration,
    ) -> Result<(), ContainerError> {
        let mut containers = self.containers.lock();
        match containers.get_mut(id.as_str()) {
            Some(container) => {
                container.state = ContainerState::Exited;
                Ok(())
            }
            None => Err(ContainerError::NotFound(id.to_string())),
        }
    }

    async fn remove_container(&self, id: &ContainerId, _force: bool) -> Result<(), ContainerError> {
        let mut containers = self.containers.lock();
        containers
            .remove(id.as_str())
            .map(|_| ())
            .ok_or_else(|| ContainerError::NotFound(id.to_string()))
    }
}

#[async_trait]
impl ExecOps for FakeRuntime {
    async fn exec_in_container(
        &self,
        container_name: &str,
        _config: &ExecConfig,
    ) -> Result<ExecResult, ExecError> {
        let containers = self.containers.lock();
        let container = containers
            .get(container_name)
            .ok_or_else(|| ExecError::ContainerNotFound(container_name.to_string()))?;

        if container.state != ContainerState::Running {
            return Err(ExecError::ContainerNotRunning(container_name.to_string()));
        }

        Ok(ExecResult {
            exit_code: container.exec_exit,
            stdout: Vec::new(),
            stderr: Vec::new(),
        })
    }
}

#[async_trait]
impl LogOps for FakeRuntime {
    async fn tail_logs(&self, container_name: &str, n: u64) -> Result<Vec<String>, LogError> {
        let containers = self.containers.lock();
        let container = containers
            .get(container_name)
            .ok_or_else(|| LogError::ContainerNotFound(container_name.to_string()))?;

        let lines = &container.logs;
        let start = lines.len().saturating_sub(n as usize);
        Ok(lines[start..].to_vec())
    }
}

#[async_trait]
impl NetworkOps for FakeRuntime {
    async fn create_network(&self, spec: &NetworkSpec) -> Result<NetworkId, NetworkError> {
        let mut networks = self.networks.lock();
        if networks.contains_key(&spec.name) {
            return Err(NetworkError::AlreadyExists(spec.name.clone()));
        }
        networks.insert(spec.name.clone(), spec.subnet.clone());
        Ok(NetworkId::new(spec.name.clone()))
    }

    async fn remove_network(&self, id: &NetworkId) -> Result<(), NetworkError> {
        let mut networks = self.networks.lock();
        networks
            .remove(id.as_str())
            .map(|_| ())
            .ok_or_else(|| NetworkError::NotFound(id.to_string()))
    }

    async fn inspect_network(&self, name: &str) -> Result<Option<NetworkDetails>, NetworkError> {
        let networks = self.networks.lock();
        Ok(networks.get(name).map(|subnet| NetworkDetails {
            id: NetworkId::new(name),
            name: name.to_string(),
            subnet: subnet.clone(),
        }))
    }
}

/// What a fake launch does to the fake runtime.
#[derive(Debug, Clone)]
pub enum LaunchBehavior {
    /// Launch succeeds and the container appears with this state.
    Start(FakeContainer),
    /// Launch command itself fails.
    Fail(String),
    /// Launch succeeds but no container ever appears.
    StartNothing,
}

/// Launcher that mutates the fake runtime and records every invocation.
pub struct FakeLauncher {
    runtime: Arc<FakeRuntime>,
    behaviors: Mutex<HashMap<String, LaunchBehavior>>,
    pub launched: Mutex<Vec<String>>,
}

impl FakeLauncher {
    pub fn new(runtime: Arc<FakeRuntime>) -> Self {
        Self {
            runtime,
            behaviors: Mutex::new(HashMap::new()),
            launched: Mutex::new(Vec::new()),
        }
    }

    pub fn on_launch(&self, service: &str, behavior: LaunchBehavior) {
        self.behaviors
            .lock()
            .insert(service.to_string(), behavior);
    }

    pub fn launch_count(&self) -> usize {
        self.launched.lock().len()
    }

    pub fn launch_order(&self) -> Vec<String> {
        self.launched.lock().clone()
    }
}

#[async_trait]
impl Launcher for FakeLauncher {
    async fn launch(&self, svc: &ServiceDescriptor) -> Result<(), LaunchError> {
        self.launched.lock().push(svc.name.to_string());

        let behavior = self
            .behaviors
            .lock()
            .get(svc.name.as_str())
            .cloned()
            .unwrap_or(LaunchBehavior::Start(FakeContainer::running()));

        match behavior {
            LaunchBehavior::Start(container) => {
                self.runtime.insert_container(svc.name.as_str(), container);
                Ok(())
            }
            LaunchBehavior::Fail(stderr_tail) => Err(LaunchError::Failed {
                service: svc.name.to_string(),
                status: 1,
                stderr_tail,
            }),
            LaunchBehavior::StartNothing => Ok(()),
        }
    }
}

/// Scripted HTTP transport: port -> response. Unscripted ports refuse the
/// connection.
#[derive(Debug, Default)]
pub struct ScriptedHttp {
    responses: Mutex<HashMap<u16, (u16, String)>>,
}

impl ScriptedHttp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, port: u16, status: u16, body: &str) {
        self.responses
            .lock()
            .insert(port, (status, body.to_string()));
    }

    pub fn clear(&self, port: u16) {
        self.responses.lock().remove(&port);
    }
}

#[async_trait]
impl HttpFetch for ScriptedHttp {
    async fn fetch(
        &self,
        port: u16,
        _path: &str,
        _https: bool,
    ) -> Result<HttpProbeResponse, HttpProbeError> {
        let responses = self.responses.lock();
        match responses.get(&port) {
            Some((status, body)) => Ok(HttpProbeResponse {
                status: *status,
                body: body.clone(),
            }),
            None => Err(HttpProbeError::Connect("connection refused".to_string())),
        }
    }
}
