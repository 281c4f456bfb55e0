// ABOUTME: Application-wide error type for stockade.
// ABOUTME: Fatal (session-aborting) causes funnel through here; node-local errors stay in outcomes.

use std::path::PathBuf;
use thiserror::Error;

use crate::catalog::CatalogError;
use crate::graph::GraphError;
use crate::provision::ProvisionError;
use crate::runtime::RuntimeError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("file already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("configuration file not found in {0}")]
    ConfigNotFound(PathBuf),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Provision(#[from] ProvisionError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error("deployment session lock: {0}")]
    Lock(String),

    #[error("pre-flight check failed: {0}")]
    Preflight(String),
}

pub type Result<T> = std::result::Result<T, Error>;
