// ABOUTME: Dependency graph over the service catalog: cycle check, topological order, closure.
// ABOUTME: Ties in the topological order are broken by catalog declaration order.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::catalog::Catalog;
use crate::types::ServiceName;

#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("cyclic dependency: {}", cycle_display(.0))]
    CyclicDependency(Vec<ServiceName>),

    #[error("unknown service: {0}")]
    UnknownService(ServiceName),
}

fn cycle_display(cycle: &[ServiceName]) -> String {
    cycle
        .iter()
        .map(ServiceName::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Directed acyclic graph of service dependencies. Edges point from a
/// service to each of its dependencies. Construction fails on cycles, so a
/// held `DependencyGraph` is always schedulable.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    /// Node names in declaration order.
    nodes: Vec<ServiceName>,
    /// service -> its dependencies.
    edges: HashMap<ServiceName, Vec<ServiceName>>,
}

impl DependencyGraph {
    /// Build and cycle-check the graph for the whole catalog.
    pub fn build(catalog: &Catalog) -> Result<Self, GraphError> {
        let nodes: Vec<ServiceName> = catalog.names();
        let edges: HashMap<ServiceName, Vec<ServiceName>> = catalog
            .services()
            .iter()
            .map(|s| (s.name.clone(), s.depends_on.clone()))
            .collect();

        let graph = Self { nodes, edges };
        if let Some(cycle) = graph.find_cycle() {
            return Err(GraphError::CyclicDependency(cycle));
        }
        Ok(graph)
    }

    pub fn contains(&self, name: &ServiceName) -> bool {
        self.edges.contains_key(name)
    }

    pub fn dependencies_of(&self, name: &ServiceName) -> &[ServiceName] {
        self.edges.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Targets plus their transitive dependencies, in declaration order.
    /// Unknown names are rejected rather than silently dropped.
    pub fn closure(&self, targets: &[ServiceName]) -> Result<Vec<ServiceName>, GraphError> {
        let mut wanted = HashSet::new();
        let mut queue: VecDeque<&ServiceName> = VecDeque::new();

        for target in targets {
            if !self.contains(target) {
                return Err(GraphError::UnknownService(target.clone()));
            }
            if wanted.insert(target.clone()) {
                queue.push_back(target);
            }
        }

        while let Some(current) = queue.pop_front() {
            for dep in self.dependencies_of(current) {
                if wanted.insert(dep.clone()) {
                    queue.push_back(dep);
                }
            }
        }

        Ok(self
            .nodes
            .iter()
            .filter(|n| wanted.contains(*n))
            .cloned()
            .collect())
    }

    /// A valid deployment order for the given node subset: every service
    /// appears after all of its (in-subset) dependencies. Kahn's algorithm;
    /// among simultaneously-ready nodes, declaration order wins, which
    /// makes the result deterministic.
    pub fn deployment_order(&self, subset: &[ServiceName]) -> Vec<ServiceName> {
        let in_subset: HashSet<&ServiceName> = subset.iter().collect();

        let mut pending: HashMap<&ServiceName, usize> = HashMap::new();
        for node in subset {
            let unmet = self
                .dependencies_of(node)
                .iter()
                .filter(|d| in_subset.contains(d))
                .count();
            pending.insert(node, unmet);
        }

        let mut order = Vec::with_capacity(subset.len());
        let mut placed: HashSet<&ServiceName> = HashSet::new();

        while order.len() < subset.len() {
            // Scan in declaration order for the first node whose in-subset
            // dependencies are all placed. Construction guarantees one
            // exists (the graph is acyclic).
            let next = self
                .nodes
                .iter()
                .find(|n| {
                    in_subset.contains(n) && !placed.contains(n) && pending[*n] == 0
                })
                .expect("acyclic graph always has a ready node");

            placed.insert(next);
            order.push(next.clone());

            for node in subset {
                if placed.contains(node) {
                    continue;
                }
                // Count edges, not presence: a descriptor listing the same
                // dependency twice must decrement twice.
                let satisfied = self
                    .dependencies_of(node)
                    .iter()
                    .filter(|d| *d == next)
                    .count();
                if satisfied > 0 {
                    *pending.get_mut(node).expect("node in pending map") -= satisfied;
                }
            }
        }

        order
    }

    /// Depth-first cycle search. Returns the cycle path (first node
    /// repeated at the end) for the error message.
    fn find_cycle(&self) -> Option<Vec<ServiceName>> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            White,
            Grey,
            Black,
        }

        let mut marks: HashMap<&ServiceName, Mark> =
            self.nodes.iter().map(|n| (n, Mark::White)).collect();

        fn visit<'a>(
            node: &'a ServiceName,
            edges: &'a HashMap<ServiceName, Vec<ServiceName>>,
            marks: &mut HashMap<&'a ServiceName, Mark>,
            stack: &mut Vec<ServiceName>,
        ) -> Option<Vec<ServiceName>> {
            marks.insert(node, Mark::Grey);
            stack.push(node.clone());

            for dep in edges.get(node).map(Vec::as_slice).unwrap_or(&[]) {
                match marks.get(dep).copied().unwrap_or(Mark::Black) {
                    Mark::Grey => {
                        // Found the back edge: slice the stack from the
                        // first occurrence of dep and close the loop.
                        let start = stack.iter().position(|n| n == dep).unwrap_or(0);
                        let mut cycle: Vec<ServiceName> = stack[start..].to_vec();
                        cycle.push(dep.clone());
                        return Some(cycle);
                    }
                    Mark::White => {
                        if let Some(cycle) = visit(dep, edges, marks, stack) {
                            return Some(cycle);
                        }
                    }
                    Mark::Black => {}
                }
            }

            stack.pop();
            marks.insert(node, Mark::Black);
            None
        }

        let mut stack = Vec::new();
        for node in &self.nodes {
            if marks[node] == Mark::White {
                if let Some(cycle) = visit(node, &self.edges, &mut marks, &mut stack) {
                    return Some(cycle);
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, Role, ServiceDescriptor};
    use crate::probe::ProbeSpec;

    fn svc(name: &str, deps: &[&str]) -> ServiceDescriptor {
        ServiceDescriptor {
            name: ServiceName::new(name).unwrap(),
            role: Role::InfraTool,
            ports: vec![],
            depends_on: deps.iter().map(|d| ServiceName::new(d).unwrap()).collect(),
            probe: ProbeSpec::PortOnly { port: 1 },
            launch: vec!["true".to_string()],
            secrets: vec![],
        }
    }

    fn names(raw: &[&str]) -> Vec<ServiceName> {
        raw.iter().map(|n| ServiceName::new(n).unwrap()).collect()
    }

    #[test]
    fn order_respects_edges() {
        let catalog = Catalog::from_services(vec![
            svc("app", &["db", "cache"]),
            svc("db", &[]),
            svc("cache", &[]),
        ])
        .unwrap();
        let graph = DependencyGraph::build(&catalog).unwrap();
        let order = graph.deployment_order(&graph.closure(&names(&["app"])).unwrap());

        let pos = |n: &str| order.iter().position(|x| x.as_str() == n).unwrap();
        assert!(pos("db") < pos("app"));
        assert!(pos("cache") < pos("app"));
    }

    #[test]
    fn ties_break_by_declaration_order() {
        let catalog = Catalog::from_services(vec![
            svc("zeta", &[]),
            svc("alpha", &[]),
            svc("mid", &["zeta", "alpha"]),
        ])
        .unwrap();
        let graph = DependencyGraph::build(&catalog).unwrap();
        let all = graph.closure(&names(&["mid"])).unwrap();
        let order = graph.deployment_order(&all);

        // zeta was declared first, so it deploys first despite sorting
        // after alpha alphabetically.
        assert_eq!(order, names(&["zeta", "alpha", "mid"]));
    }

    #[test]
    fn cycle_is_detected_and_named() {
        let catalog = Catalog::from_services(vec![
            svc("a", &["b"]),
            svc("b", &["c"]),
            svc("c", &["a"]),
        ])
        .unwrap();
        let err = DependencyGraph::build(&catalog).unwrap_err();
        match err {
            GraphError::CyclicDependency(cycle) => {
                assert_eq!(cycle.first(), cycle.last());
                assert!(cycle.len() == 4);
            }
            other => panic!("expected cycle error, got {other:?}"),
        }
    }

    #[test]
    fn closure_pulls_transitive_dependencies() {
        let catalog = Catalog::from_services(vec![
            svc("base", &[]),
            svc("mid", &["base"]),
            svc("top", &["mid"]),
            svc("unrelated", &[]),
        ])
        .unwrap();
        let graph = DependencyGraph::build(&catalog).unwrap();
        let closure = graph.closure(&names(&["top"])).unwrap();

        assert_eq!(closure, names(&["base", "mid", "top"]));
    }

    #[test]
    fn closure_rejects_unknown_targets() {
        let catalog = Catalog::from_services(vec![svc("a", &[])]).unwrap();
        let graph = DependencyGraph::build(&catalog).unwrap();
        assert!(matches!(
            graph.closure(&names(&["nope"])),
            Err(GraphError::UnknownService(_))
        ));
    }

    #[test]
    fn builtin_catalog_is_acyclic() {
        let catalog = Catalog::builtin();
        let graph = DependencyGraph::build(&catalog).unwrap();
        let order = graph.deployment_order(&catalog.names());
        assert_eq!(order.len(), catalog.services().len());
    }
}
