// ABOUTME: The built-in security-operations stack definition.
// ABOUTME: Declaration order here is the tie-breaker for deployment ordering.

use crate::probe::ProbeSpec;
use crate::types::{PortSpec, ServiceName};

use super::descriptor::{Role, ServiceDescriptor};

fn name(s: &str) -> ServiceName {
    ServiceName::new(s).expect("builtin service names are valid")
}

fn compose_launch(service: &str) -> Vec<String> {
    ["docker", "compose", "-p", "stockade", "up", "-d", service]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// The full stack, leaves first. Data stores come up before the tools that
/// depend on them; the frontend last.
pub fn builtin_services() -> Vec<ServiceDescriptor> {
    vec![
        ServiceDescriptor {
            name: name("elasticsearch"),
            role: Role::DataTier,
            ports: vec![PortSpec::tcp(9200), PortSpec::tcp(9300)],
            depends_on: vec![],
            probe: ProbeSpec::HttpBodyClassify {
                port: 9200,
                path: "/_cluster/health".to_string(),
                https: true,
            },
            launch: compose_launch("elasticsearch"),
            secrets: vec!["ELASTIC_PASSWORD".to_string()],
        },
        ServiceDescriptor {
            name: name("cassandra"),
            role: Role::DataTier,
            ports: vec![PortSpec::tcp(9042)],
            depends_on: vec![],
            probe: ProbeSpec::QueryExec {
                command: vec![
                    "cqlsh".to_string(),
                    "-e".to_string(),
                    "SELECT now() FROM system.local".to_string(),
                ],
            },
            launch: compose_launch("cassandra"),
            secrets: vec![],
        },
        ServiceDescriptor {
            name: name("misp-db"),
            role: Role::DataTier,
            ports: vec![PortSpec::tcp(3306)],
            depends_on: vec![],
            probe: ProbeSpec::QueryExec {
                command: vec![
                    "mysqladmin".to_string(),
                    "ping".to_string(),
                    "--silent".to_string(),
                ],
            },
            launch: compose_launch("misp-db"),
            secrets: vec!["MISP_DB_PASSWORD".to_string(), "MISP_DB_ROOT_PASSWORD".to_string()],
        },
        ServiceDescriptor {
            name: name("redis"),
            role: Role::InfraTool,
            ports: vec![PortSpec::tcp(6379)],
            depends_on: vec![],
            probe: ProbeSpec::QueryExec {
                command: vec!["redis-cli".to_string(), "ping".to_string()],
            },
            launch: compose_launch("redis"),
            secrets: vec![],
        },
        ServiceDescriptor {
            name: name("thehive"),
            role: Role::SecurityTool,
            ports: vec![PortSpec::tcp(9000)],
            depends_on: vec![name("cassandra"), name("elasticsearch")],
            probe: ProbeSpec::HttpStatus {
                port: 9000,
                path: "/api/status".to_string(),
                https: false,
            },
            launch: compose_launch("thehive"),
            secrets: vec!["THEHIVE_SECRET".to_string()],
        },
        ServiceDescriptor {
            name: name("cortex"),
            role: Role::SecurityTool,
            ports: vec![PortSpec::tcp(9001)],
            depends_on: vec![name("elasticsearch")],
            probe: ProbeSpec::HttpStatus {
                port: 9001,
                path: "/api/status".to_string(),
                https: false,
            },
            launch: compose_launch("cortex"),
            secrets: vec!["CORTEX_API_KEY".to_string()],
        },
        ServiceDescriptor {
            name: name("misp"),
            role: Role::SecurityTool,
            ports: vec![PortSpec::tcp(8443)],
            depends_on: vec![name("misp-db"), name("redis")],
            probe: ProbeSpec::HttpStatus {
                port: 8443,
                path: "/users/login".to_string(),
                https: true,
            },
            launch: compose_launch("misp"),
            secrets: vec!["MISP_ADMIN_PASSPHRASE".to_string()],
        },
        ServiceDescriptor {
            name: name("kibana"),
            role: Role::Frontend,
            ports: vec![PortSpec::tcp(5601)],
            depends_on: vec![name("elasticsearch")],
            probe: ProbeSpec::HttpBodyClassify {
                port: 5601,
                path: "/api/status".to_string(),
                https: false,
            },
            launch: compose_launch("kibana"),
            secrets: vec!["KIBANA_SYSTEM_PASSWORD".to_string()],
        },
    ]
}

/// The reduced stack for `--mode simple`: the minimum useful incident
/// response setup.
pub fn simple_subset() -> Vec<ServiceName> {
    vec![name("elasticsearch"), name("cassandra"), name("thehive"), name("cortex")]
}
