// ABOUTME: CA and leaf certificate provisioning via the openssl CLI.
// ABOUTME: The CA is generated once; the leaf is reused while it has validity left.

use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};
use std::path::{Path, PathBuf};
use tokio::process::Command;

use super::ProvisionError;

/// Seconds of remaining validity below which the leaf is rotated.
const ROTATE_THRESHOLD_SECS: u32 = 86_400;

const CA_DAYS: u32 = 3650;
const LEAF_DAYS: u32 = 825;

/// Canonical certificate file locations under the certs directory.
#[derive(Debug, Clone)]
pub struct CertPaths {
    pub dir: PathBuf,
    pub ca_cert: PathBuf,
    pub ca_key: PathBuf,
    pub leaf_cert: PathBuf,
    pub leaf_key: PathBuf,
}

impl CertPaths {
    pub fn under(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            ca_cert: dir.join("ca.pem"),
            ca_key: dir.join("ca.key"),
            leaf_cert: dir.join("leaf.pem"),
            leaf_key: dir.join("leaf.key"),
        }
    }
}

/// Ensure a CA and a leaf certificate exist. Returns true when the
/// existing leaf was reused (not rotated).
///
/// The cryptographic parameters live entirely in the openssl invocations;
/// the orchestrator only decides whether generation is needed.
pub async fn ensure_certificates(
    paths: &CertPaths,
    domain: &str,
    advertise_addr: Option<&str>,
) -> Result<bool, ProvisionError> {
    std::fs::create_dir_all(&paths.dir)?;

    if paths.leaf_cert.exists() && leaf_is_valid(&paths.leaf_cert).await? {
        tracing::info!(
            leaf = %paths.leaf_cert.display(),
            "existing leaf certificate still valid, skipping regeneration"
        );
        return Ok(true);
    }

    if !paths.ca_cert.exists() || !paths.ca_key.exists() {
        generate_ca(paths).await?;
    }

    generate_leaf(paths, domain, advertise_addr).await?;
    Ok(false)
}

/// True when the leaf has more than the rotation threshold of validity left.
async fn leaf_is_valid(leaf: &Path) -> Result<bool, ProvisionError> {
    let output = Command::new("openssl")
        .args(["x509", "-checkend", &ROTATE_THRESHOLD_SECS.to_string(), "-noout", "-in"])
        .arg(leaf)
        .output()
        .await
        .map_err(ProvisionError::OpensslMissing)?;

    // checkend exits 0 while the certificate will still be valid, 1 when
    // it expires within the window. Anything else is a broken file; treat
    // it as invalid and regenerate.
    Ok(output.status.success())
}

async fn generate_ca(paths: &CertPaths) -> Result<(), ProvisionError> {
    tracing::info!(dir = %paths.dir.display(), "generating certificate authority");

    run_openssl(
        "generate ca",
        Command::new("openssl")
            .args(["req", "-x509", "-newkey", "rsa:4096", "-sha256", "-nodes"])
            .args(["-days", &CA_DAYS.to_string()])
            .args(["-subj", "/CN=stockade deployment CA"])
            .arg("-keyout")
            .arg(&paths.ca_key)
            .arg("-out")
            .arg(&paths.ca_cert),
    )
    .await?;

    restrict_key(&paths.ca_key)?;
    Ok(())
}

async fn generate_leaf(
    paths: &CertPaths,
    domain: &str,
    advertise_addr: Option<&str>,
) -> Result<(), ProvisionError> {
    tracing::info!(domain, "generating leaf certificate");

    let csr = paths.dir.join("leaf.csr");
    let ext_file = paths.dir.join("leaf.ext");
    std::fs::write(&ext_file, san_extension(domain, advertise_addr))?;

    run_openssl(
        "generate leaf key",
        Command::new("openssl")
            .args(["req", "-newkey", "rsa:2048", "-sha256", "-nodes"])
            .args(["-subj", &format!("/CN={domain}")])
            .arg("-keyout")
            .arg(&paths.leaf_key)
            .arg("-out")
            .arg(&csr),
    )
    .await?;

    run_openssl(
        "sign leaf",
        Command::new("openssl")
            .args(["x509", "-req", "-sha256"])
            .args(["-days", &LEAF_DAYS.to_string()])
            .arg("-in")
            .arg(&csr)
            .arg("-CA")
            .arg(&paths.ca_cert)
            .arg("-CAkey")
            .arg(&paths.ca_key)
            .arg("-CAcreateserial")
            .arg("-extfile")
            .arg(&ext_file)
            .arg("-out")
            .arg(&paths.leaf_cert),
    )
    .await?;

    restrict_key(&paths.leaf_key)?;

    // Scratch files are not part of the persisted layout.
    let _ = std::fs::remove_file(&csr);
    let _ = std::fs::remove_file(&ext_file);

    Ok(())
}

async fn run_openssl(step: &str, command: &mut Command) -> Result<(), ProvisionError> {
    let output = command
        .output()
        .await
        .map_err(ProvisionError::OpensslMissing)?;

    if !output.status.success() {
        return Err(ProvisionError::CertGeneration {
            step: step.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(())
}

/// The subjectAltName extension covering the local domain (wildcard
/// included), loopback, and the host's primary address.
fn san_extension(domain: &str, advertise_addr: Option<&str>) -> String {
    let mut entries = vec![
        format!("DNS:{domain}"),
        format!("DNS:*.{domain}"),
        "DNS:localhost".to_string(),
        "IP:127.0.0.1".to_string(),
    ];

    let addr = advertise_addr
        .map(String::from)
        .or_else(|| host_primary_addr().map(|ip| ip.to_string()));
    if let Some(addr) = addr {
        let entry = format!("IP:{addr}");
        if !entries.contains(&entry) {
            entries.push(entry);
        }
    }

    format!("subjectAltName={}\n", entries.join(","))
}

/// Best-effort detection of the host's primary (outbound) address. The
/// socket is never actually used to send anything; connect() just makes
/// the kernel pick a source address.
pub fn host_primary_addr() -> Option<IpAddr> {
    let socket = UdpSocket::bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))).ok()?;
    socket.connect(("192.0.2.1", 53)).ok()?;
    let local = socket.local_addr().ok()?;
    if local.ip().is_unspecified() {
        return None;
    }
    Some(local.ip())
}

#[cfg(unix)]
fn restrict_key(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_key(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
