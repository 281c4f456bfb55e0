// ABOUTME: Local runtime socket detection.
// ABOUTME: Checks Podman sockets first (rootless, then rootful), then Docker.

use std::path::Path;

use super::types::{DetectedRuntime, RuntimeType};

const ROOTFUL_PODMAN: &str = "/run/podman/podman.sock";
const DOCKER_SOCKET: &str = "/var/run/docker.sock";

/// Error during runtime detection.
#[derive(Debug, thiserror::Error)]
pub enum DetectionError {
    #[error("no container runtime found (checked Podman and Docker sockets)")]
    NoRuntimeFound,

    #[error("configured socket does not exist: {0}")]
    SocketMissing(String),
}

/// Detect the container runtime on this host.
///
/// An explicit socket path from configuration wins; otherwise the probe
/// order is rootless Podman, rootful Podman, Docker.
pub fn detect_local(socket_override: Option<&str>) -> Result<DetectedRuntime, DetectionError> {
    if let Some(socket) = socket_override {
        if !Path::new(socket).exists() {
            return Err(DetectionError::SocketMissing(socket.to_string()));
        }
        let runtime_type = if socket.contains("podman") {
            RuntimeType::Podman
        } else {
            RuntimeType::Docker
        };
        return Ok(DetectedRuntime {
            runtime_type,
            socket_path: socket.to_string(),
        });
    }

    if let Some(uid) = get_uid() {
        let rootless = format!("/run/user/{uid}/podman/podman.sock");
        if Path::new(&rootless).exists() {
            return Ok(DetectedRuntime {
                runtime_type: RuntimeType::Podman,
                socket_path: rootless,
            });
        }
    }

    if Path::new(ROOTFUL_PODMAN).exists() {
        return Ok(DetectedRuntime {
            runtime_type: RuntimeType::Podman,
            socket_path: ROOTFUL_PODMAN.to_string(),
        });
    }

    if Path::new(DOCKER_SOCKET).exists() {
        return Ok(DetectedRuntime {
            runtime_type: RuntimeType::Docker,
            socket_path: DOCKER_SOCKET.to_string(),
        });
    }

    Err(DetectionError::NoRuntimeFound)
}

#[cfg(unix)]
fn get_uid() -> Option<u32> {
    std::env::var("UID")
        .ok()
        .and_then(|s| s.parse().ok())
        .or_else(|| {
            // UID is not exported by all shells; fall back to /proc.
            std::fs::read_to_string("/proc/self/status")
                .ok()?
                .lines()
                .find(|l| l.starts_with("Uid:"))?
                .split_whitespace()
                .nth(1)?
                .parse()
                .ok()
        })
}

#[cfg(not(unix))]
fn get_uid() -> Option<u32> {
    None
}
