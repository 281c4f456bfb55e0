// ABOUTME: Validated domain types and type-safe identifiers.
// ABOUTME: ServiceName, PortSpec, and phantom-typed container/network IDs.

mod id;
mod port;
mod service_name;

pub use id::{ContainerId, NetworkId};
pub use port::{ParsePortSpecError, PortSpec, Protocol};
pub use service_name::{ServiceName, ServiceNameError};
