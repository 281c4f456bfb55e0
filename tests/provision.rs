// ABOUTME: Provisioning tests: secret stability, network existing-wins, full pass idempotence.
// ABOUTME: Certificate generation runs only where the openssl binary is present.

mod support;

use support::fake::FakeRuntime;

use stockade::catalog::Catalog;
use stockade::config::{Config, NetworkSettings};
use stockade::provision::{
    CertPaths, ResourceKind, SecretStore, ensure_certificates, ensure_network, provision_all,
};

fn config_in(dir: &std::path::Path) -> Config {
    Config {
        deploy_root: dir.to_path_buf(),
        ..Default::default()
    }
}

fn openssl_available() -> bool {
    std::process::Command::new("openssl")
        .arg("version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

#[tokio::test]
async fn network_is_created_when_missing() {
    let runtime = FakeRuntime::new();
    let settings = NetworkSettings::default();

    let (id, reused) = ensure_network(runtime.as_ref(), &settings).await.unwrap();
    assert!(!reused);
    assert_eq!(id.as_str(), "stockade");
    assert!(runtime.networks.lock().contains_key("stockade"));
}

#[tokio::test]
async fn existing_network_wins_even_with_different_subnet() {
    let runtime = FakeRuntime::new();
    runtime.insert_network("stockade", Some("10.99.0.0/24"));

    let settings = NetworkSettings::default(); // requests 172.28.0.0/16
    let (_, reused) = ensure_network(runtime.as_ref(), &settings).await.unwrap();

    assert!(reused);
    // The existing subnet is untouched.
    assert_eq!(
        runtime.networks.lock().get("stockade").unwrap().as_deref(),
        Some("10.99.0.0/24")
    );
}

#[test]
fn secret_slots_are_stable_across_runs() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stockade.env");
    let slots = vec!["ELASTIC_PASSWORD".to_string(), "THEHIVE_SECRET".to_string()];

    let mut store = SecretStore::open(&path).unwrap();
    store.ensure_slots(&slots);
    store.persist().unwrap();
    let first = std::fs::read_to_string(&path).unwrap();

    for _ in 0..3 {
        let mut store = SecretStore::open(&path).unwrap();
        let created = store.ensure_slots(&slots);
        assert!(created.is_empty());
        store.persist().unwrap();
    }

    let last = std::fs::read_to_string(&path).unwrap();
    assert_eq!(first, last);
}

#[tokio::test]
async fn certificates_are_not_rotated_while_valid() {
    if !openssl_available() {
        eprintln!("skipping: openssl not installed");
        return;
    }

    let dir = tempfile::tempdir().unwrap();
    let paths = CertPaths::under(dir.path());

    let reused = ensure_certificates(&paths, "stockade.local", Some("10.0.0.1"))
        .await
        .unwrap();
    assert!(!reused);
    assert!(paths.ca_cert.exists());
    assert!(paths.leaf_cert.exists());

    let leaf_before = std::fs::read(&paths.leaf_cert).unwrap();
    let ca_before = std::fs::read(&paths.ca_cert).unwrap();

    let reused = ensure_certificates(&paths, "stockade.local", Some("10.0.0.1"))
        .await
        .unwrap();
    assert!(reused);
    assert_eq!(std::fs::read(&paths.leaf_cert).unwrap(), leaf_before);
    assert_eq!(std::fs::read(&paths.ca_cert).unwrap(), ca_before);
}

#[cfg(unix)]
#[tokio::test]
async fn private_keys_are_owner_only() {
    if !openssl_available() {
        eprintln!("skipping: openssl not installed");
        return;
    }

    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let paths = CertPaths::under(dir.path());
    ensure_certificates(&paths, "stockade.local", None)
        .await
        .unwrap();

    for key in [&paths.ca_key, &paths.leaf_key] {
        let mode = std::fs::metadata(key).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600, "{} too permissive", key.display());
    }
}

#[tokio::test]
async fn provision_all_is_idempotent() {
    if !openssl_available() {
        eprintln!("skipping: openssl not installed");
        return;
    }

    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let catalog = Catalog::builtin();
    let runtime = FakeRuntime::new();

    let (first, _) = provision_all(runtime.as_ref(), &config, &catalog)
        .await
        .unwrap();
    assert_eq!(first.len(), 3);
    assert!(first.iter().all(|r| !r.reused));

    let secrets_before = std::fs::read(config.secrets_path()).unwrap();

    let (second, _) = provision_all(runtime.as_ref(), &config, &catalog)
        .await
        .unwrap();
    assert!(second.iter().all(|r| r.reused), "second run must reuse everything");
    assert_eq!(std::fs::read(config.secrets_path()).unwrap(), secrets_before);

    let kinds: Vec<ResourceKind> = second.iter().map(|r| r.kind).collect();
    assert_eq!(
        kinds,
        vec![
            ResourceKind::Secrets,
            ResourceKind::Certificate,
            ResourceKind::Network
        ]
    );
}
