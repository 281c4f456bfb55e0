// ABOUTME: Pre-flight checks: host state that must hold before provisioning starts.
// ABOUTME: Failures here are fatal by design - nothing has been created yet.

use std::path::Path;

use crate::config::Config;
use crate::error::Error;
use crate::runtime::RuntimeInfo;

/// Verify the host can run a deployment session: writable deploy root, a
/// reachable container runtime, and the openssl binary the certificate
/// provisioner shells out to. Skippable with `--skip-preflight` for hosts
/// the operator knows are prepared.
pub async fn run_preflight<R: RuntimeInfo>(runtime: &R, config: &Config) -> Result<(), Error> {
    check_deploy_root(&config.deploy_root)?;

    let metadata = runtime
        .info()
        .await
        .map_err(|e| Error::Preflight(format!("container runtime unreachable: {e}")))?;
    tracing::info!(
        runtime = %metadata.name,
        version = %metadata.version,
        "container runtime reachable"
    );

    check_openssl().await?;

    Ok(())
}

fn check_deploy_root(root: &Path) -> Result<(), Error> {
    std::fs::create_dir_all(root)
        .map_err(|e| Error::Preflight(format!("cannot create deploy root {}: {e}", root.display())))?;

    let probe = root.join(".write-probe");
    std::fs::write(&probe, b"ok")
        .map_err(|e| Error::Preflight(format!("deploy root {} not writable: {e}", root.display())))?;
    let _ = std::fs::remove_file(&probe);

    Ok(())
}

async fn check_openssl() -> Result<(), Error> {
    let output = tokio::process::Command::new("openssl")
        .arg("version")
        .output()
        .await
        .map_err(|e| Error::Preflight(format!("openssl not available: {e}")))?;

    if !output.status.success() {
        return Err(Error::Preflight("openssl version check failed".to_string()));
    }

    tracing::debug!(
        version = %String::from_utf8_lossy(&output.stdout).trim(),
        "openssl available"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writable_deploy_root_passes() {
        let dir = tempfile::tempdir().unwrap();
        check_deploy_root(&dir.path().join("nested/root")).unwrap();
    }

    #[test]
    fn deploy_root_under_a_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("occupied");
        std::fs::write(&file, b"x").unwrap();

        let err = check_deploy_root(&file.join("root")).unwrap_err();
        assert!(matches!(err, Error::Preflight(_)));
    }
}
