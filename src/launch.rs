// ABOUTME: Service launch collaborator: runs the descriptor's opaque launch command.
// ABOUTME: The orchestrator only sees success or failure, never what the command does.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;

use crate::catalog::ServiceDescriptor;

#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error("service {0} has no launch command")]
    NoCommand(String),

    #[error("launch command for {service} failed to spawn: {source}")]
    Spawn {
        service: String,
        source: std::io::Error,
    },

    #[error("launch command for {service} exited with {status}: {stderr_tail}")]
    Failed {
        service: String,
        status: i32,
        stderr_tail: String,
    },
}

/// The launch procedure for a service. Opaque by contract: it may invoke a
/// container runtime, a compose file, or a native process manager.
#[async_trait]
pub trait Launcher: Send + Sync {
    async fn launch(&self, svc: &ServiceDescriptor) -> Result<(), LaunchError>;
}

/// Launcher that spawns the descriptor's launch command as a child process.
pub struct CommandLauncher {
    workdir: PathBuf,
    env: HashMap<String, String>,
}

impl CommandLauncher {
    /// `workdir` is where launch commands run (typically the deploy root);
    /// `env` is injected into every launch, e.g. the secrets-store path.
    pub fn new(workdir: PathBuf, env: HashMap<String, String>) -> Self {
        Self { workdir, env }
    }
}

#[async_trait]
impl Launcher for CommandLauncher {
    async fn launch(&self, svc: &ServiceDescriptor) -> Result<(), LaunchError> {
        let (program, args) = svc
            .launch
            .split_first()
            .ok_or_else(|| LaunchError::NoCommand(svc.name.to_string()))?;

        tracing::debug!(service = %svc.name, command = %program, "launching");

        let output = Command::new(program)
            .args(args)
            .envs(&self.env)
            .current_dir(&self.workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| LaunchError::Spawn {
                service: svc.name.to_string(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr_tail: String = stderr
                .lines()
                .rev()
                .take(5)
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect::<Vec<_>>()
                .join(" | ");

            return Err(LaunchError::Failed {
                service: svc.name.to_string(),
                status: output.status.code().unwrap_or(-1),
                stderr_tail,
            });
        }

        Ok(())
    }
}
