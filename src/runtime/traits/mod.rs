// ABOUTME: Composable capability traits for container runtime access.
// ABOUTME: Defines ContainerOps, NetworkOps, ExecOps, LogOps, RuntimeInfo.

mod container;
mod exec;
mod logs;
mod network;
mod runtime_info;
mod shared_types;

pub use container::{ContainerError, ContainerFilters, ContainerOps, ContainerSummary};
pub use exec::{ExecError, ExecOps};
pub use logs::{LogError, LogOps};
pub use network::{NetworkDetails, NetworkError, NetworkOps, NetworkSpec};
pub use runtime_info::{RuntimeInfo, RuntimeInfoError};
pub use shared_types::*;
