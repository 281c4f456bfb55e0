// ABOUTME: Configuration types and parsing for stockade.yml.
// ABOUTME: One Config value object built at session start and passed by reference - no ambient globals.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::probe::ProbePolicy;

pub const CONFIG_FILENAME: &str = "stockade.yml";
pub const CONFIG_FILENAME_ALT: &str = "stockade.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".stockade/config.yml";

/// Everything a deployment session needs to know, resolved once at start.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Root directory for persisted state: secrets, certificates, reports.
    #[serde(default = "default_deploy_root")]
    pub deploy_root: PathBuf,

    /// Local domain the leaf certificate covers (wildcard included).
    #[serde(default = "default_domain")]
    pub domain: String,

    /// Host address to include in certificate SANs. Auto-detected when
    /// absent.
    #[serde(default)]
    pub advertise_addr: Option<String>,

    #[serde(default)]
    pub network: NetworkSettings,

    #[serde(default)]
    pub probe: ProbePolicy,

    /// Secret slots beyond what the catalog's services declare.
    #[serde(default)]
    pub extra_secrets: Vec<String>,

    /// Path to a YAML catalog replacing the built-in stack.
    #[serde(default)]
    pub catalog: Option<PathBuf>,

    /// Explicit runtime socket, overriding auto-detection.
    #[serde(default)]
    pub runtime_socket: Option<String>,

    /// Log lines captured into diagnostics on failure.
    #[serde(default = "default_log_tail")]
    pub log_tail: u64,

    /// Extra environment handed to every launch command.
    #[serde(default)]
    pub launch_env: HashMap<String, String>,
}

/// The isolated network services attach to.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetworkSettings {
    #[serde(default = "default_network_name")]
    pub name: String,

    #[serde(default = "default_subnet")]
    pub subnet: Option<String>,

    #[serde(default)]
    pub driver: Option<String>,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            name: default_network_name(),
            subnet: default_subnet(),
            driver: None,
        }
    }
}

fn default_deploy_root() -> PathBuf {
    PathBuf::from("/var/lib/stockade")
}

fn default_domain() -> String {
    "stockade.local".to_string()
}

fn default_network_name() -> String {
    "stockade".to_string()
}

fn default_subnet() -> Option<String> {
    Some("172.28.0.0/16".to_string())
}

fn default_log_tail() -> u64 {
    40
}

impl Default for Config {
    fn default() -> Self {
        Self {
            deploy_root: default_deploy_root(),
            domain: default_domain(),
            advertise_addr: None,
            network: NetworkSettings::default(),
            probe: ProbePolicy::default(),
            extra_secrets: Vec::new(),
            catalog: None,
            runtime_socket: None,
            log_tail: default_log_tail(),
            launch_env: HashMap::new(),
        }
    }
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(Error::from)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Find and load a config file in `dir`. Falls back to defaults when
    /// none exists: stockade works out of the box against the built-in
    /// stack.
    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                return Self::load(path);
            }
        }

        Ok(Self::default())
    }

    // Persisted state layout under the deploy root.

    pub fn secrets_path(&self) -> PathBuf {
        self.deploy_root.join("secrets").join("stockade.env")
    }

    pub fn certs_dir(&self) -> PathBuf {
        self.deploy_root.join("certs")
    }

    pub fn reports_dir(&self) -> PathBuf {
        self.deploy_root.join("reports")
    }

    pub fn lock_path(&self) -> PathBuf {
        self.deploy_root.join(".lock")
    }
}

/// Write a starter stockade.yml into `dir`.
pub fn init_config(dir: &Path, force: bool) -> Result<()> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    std::fs::write(&config_path, template_yaml())?;
    Ok(())
}

fn template_yaml() -> &'static str {
    r#"# stockade deployment configuration
deploy_root: /var/lib/stockade
domain: stockade.local

network:
  name: stockade
  subnet: 172.28.0.0/16

probe:
  interval: 5s
  attempts: 24
  request_timeout: 5s
"#
}
