// ABOUTME: Service catalog: the validated set of deployable service definitions.
// ABOUTME: Built-in stack by default, replaceable by a YAML catalog file.

mod builtin;
mod descriptor;

pub use builtin::{builtin_services, simple_subset};
pub use descriptor::{Role, ServiceDescriptor};

use std::collections::HashSet;
use std::path::Path;

use crate::types::ServiceName;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("catalog defines no services")]
    Empty,

    #[error("duplicate service name: {0}")]
    DuplicateName(ServiceName),

    #[error("service {service} depends on unknown service {dependency}")]
    UnknownDependency {
        service: ServiceName,
        dependency: ServiceName,
    },

    #[error("service {0} depends on itself")]
    SelfDependency(ServiceName),

    #[error("failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse catalog file: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// The validated, ordered set of service descriptors. Declaration order is
/// preserved: it breaks topological-sort ties deterministically.
#[derive(Debug, Clone)]
pub struct Catalog {
    services: Vec<ServiceDescriptor>,
}

impl Catalog {
    /// The built-in security-operations stack.
    pub fn builtin() -> Self {
        Self::from_services(builtin_services()).expect("builtin catalog is valid")
    }

    /// Build a catalog from descriptors, validating structural invariants.
    /// Cycle detection belongs to graph construction, not here.
    pub fn from_services(services: Vec<ServiceDescriptor>) -> Result<Self, CatalogError> {
        if services.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut seen = HashSet::new();
        for svc in &services {
            if !seen.insert(svc.name.clone()) {
                return Err(CatalogError::DuplicateName(svc.name.clone()));
            }
        }

        for svc in &services {
            for dep in &svc.depends_on {
                if dep == &svc.name {
                    return Err(CatalogError::SelfDependency(svc.name.clone()));
                }
                if !seen.contains(dep) {
                    return Err(CatalogError::UnknownDependency {
                        service: svc.name.clone(),
                        dependency: dep.clone(),
                    });
                }
            }
        }

        Ok(Self { services })
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, CatalogError> {
        let services: Vec<ServiceDescriptor> = serde_yaml::from_str(yaml)?;
        Self::from_services(services)
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn get(&self, name: &ServiceName) -> Option<&ServiceDescriptor> {
        self.services.iter().find(|s| &s.name == name)
    }

    pub fn services(&self) -> &[ServiceDescriptor] {
        &self.services
    }

    pub fn names(&self) -> Vec<ServiceName> {
        self.services.iter().map(|s| s.name.clone()).collect()
    }

    /// All secret slots the catalog's services consume, declaration order,
    /// deduplicated.
    pub fn secret_slots(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut slots = Vec::new();
        for svc in &self.services {
            for slot in &svc.secrets {
                if seen.insert(slot.clone()) {
                    slots.push(slot.clone());
                }
            }
        }
        slots
    }
}
