// ABOUTME: Property and scenario tests for dependency graph construction and ordering.
// ABOUTME: The ordering property holds for arbitrary acyclic descriptor sets.

use proptest::prelude::*;

use stockade::catalog::{Catalog, Role, ServiceDescriptor};
use stockade::graph::{DependencyGraph, GraphError};
use stockade::probe::ProbeSpec;
use stockade::types::ServiceName;

fn svc(name: &str, deps: Vec<String>) -> ServiceDescriptor {
    ServiceDescriptor {
        name: ServiceName::new(name).unwrap(),
        role: Role::InfraTool,
        ports: vec![],
        depends_on: deps
            .iter()
            .map(|d| ServiceName::new(d).unwrap())
            .collect(),
        probe: ProbeSpec::PortOnly { port: 1 },
        launch: vec!["true".to_string()],
        secrets: vec![],
    }
}

/// Arbitrary acyclic service sets: node i may only depend on nodes with a
/// smaller index, so cycles are impossible by construction.
fn acyclic_services() -> impl Strategy<Value = Vec<ServiceDescriptor>> {
    (2usize..12)
        .prop_flat_map(|n| {
            let edges = proptest::collection::vec(proptest::collection::vec(any::<bool>(), n), n);
            edges.prop_map(move |matrix| {
                (0..n)
                    .map(|i| {
                        let deps: Vec<String> = (0..i)
                            .filter(|j| matrix[i][*j])
                            .map(|j| format!("svc{j}"))
                            .collect();
                        svc(&format!("svc{i}"), deps)
                    })
                    .collect()
            })
        })
}

proptest! {
    #[test]
    fn deployment_order_respects_edges(services in acyclic_services()) {
        let catalog = Catalog::from_services(services).unwrap();
        let graph = DependencyGraph::build(&catalog).unwrap();
        let order = graph.deployment_order(&catalog.names());

        prop_assert_eq!(order.len(), catalog.services().len());

        let position = |name: &ServiceName| order.iter().position(|n| n == name).unwrap();
        for svc in catalog.services() {
            for dep in &svc.depends_on {
                prop_assert!(
                    position(dep) < position(&svc.name),
                    "{} deployed before its dependency {}",
                    svc.name,
                    dep
                );
            }
        }
    }

    #[test]
    fn closure_is_self_contained(services in acyclic_services()) {
        let catalog = Catalog::from_services(services).unwrap();
        let graph = DependencyGraph::build(&catalog).unwrap();

        // Closing over any single target pulls in a set where every
        // member's dependencies are also members.
        for target in catalog.names() {
            let closure = graph.closure(&[target]).unwrap();
            for member in &closure {
                for dep in graph.dependencies_of(member) {
                    prop_assert!(closure.contains(dep));
                }
            }
        }
    }
}

#[test]
fn two_node_cycle_is_rejected() {
    let catalog = Catalog::from_services(vec![
        svc("ping", vec!["pong".to_string()]),
        svc("pong", vec!["ping".to_string()]),
    ])
    .unwrap();

    let err = DependencyGraph::build(&catalog).unwrap_err();
    match err {
        GraphError::CyclicDependency(ref cycle) => {
            assert_eq!(cycle.first(), cycle.last());
            let message = err.to_string();
            assert!(message.contains("cyclic dependency"));
        }
        other => panic!("expected cycle, got {other:?}"),
    }
}

#[test]
fn cycle_error_names_the_cycle_members() {
    let catalog = Catalog::from_services(vec![
        svc("a", vec!["b".to_string()]),
        svc("b", vec!["c".to_string()]),
        svc("c", vec!["a".to_string()]),
    ])
    .unwrap();

    let err = DependencyGraph::build(&catalog).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("a"));
    assert!(message.contains("b"));
    assert!(message.contains("c"));
    assert!(message.contains("->"));
}

#[test]
fn diamond_dependency_orders_once() {
    let catalog = Catalog::from_services(vec![
        svc("base", vec![]),
        svc("left", vec!["base".to_string()]),
        svc("right", vec!["base".to_string()]),
        svc("top", vec!["left".to_string(), "right".to_string()]),
    ])
    .unwrap();

    let graph = DependencyGraph::build(&catalog).unwrap();
    let closure = graph.closure(&[ServiceName::new("top").unwrap()]).unwrap();
    let order = graph.deployment_order(&closure);

    assert_eq!(order.len(), 4);
    assert_eq!(order.first().unwrap().as_str(), "base");
    assert_eq!(order.last().unwrap().as_str(), "top");
}
