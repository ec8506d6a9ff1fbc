//! Deployment ordering
//!
//! Kahn's algorithm over the release graph. Among releases that become ready
//! at the same time, the one seen first in the manifest goes first, so the
//! order is fully determined by the input.

use std::collections::BTreeSet;

use fluxplan_core::NamespacedKey;

use crate::error::{PlanError, Result};
use crate::graph::DependencyGraph;

/// Order releases so that every dependency precedes its dependents
///
/// Dependencies on releases outside the graph are ignored. Fails with
/// [`PlanError::CyclicDependency`] when no complete order exists.
pub fn topological_order(graph: &DependencyGraph) -> Result<Vec<NamespacedKey>> {
    let keys: Vec<&NamespacedKey> = graph.nodes().map(|node| &node.key).collect();
    let count = keys.len();

    // Positions of each node's resolvable dependencies
    let dependencies: Vec<Vec<usize>> = graph
        .nodes()
        .map(|node| {
            node.depends_on
                .iter()
                .filter_map(|dep| graph.position(dep))
                .collect()
        })
        .collect();

    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); count];
    let mut unresolved: Vec<usize> = vec![0; count];
    for (node, deps) in dependencies.iter().enumerate() {
        unresolved[node] = deps.len();
        for &dep in deps {
            dependents[dep].push(node);
        }
    }

    let mut ready: BTreeSet<usize> = (0..count).filter(|&i| unresolved[i] == 0).collect();
    let mut order = Vec::with_capacity(count);

    while let Some(next) = ready.pop_first() {
        order.push(next);
        for &dependent in &dependents[next] {
            unresolved[dependent] -= 1;
            if unresolved[dependent] == 0 {
                ready.insert(dependent);
            }
        }
    }

    if order.len() < count {
        tracing::debug!("{} of {} releases could not be ordered", count - order.len(), count);
        let start = (0..count).find(|&i| unresolved[i] > 0).unwrap_or_default();
        let cycle: Vec<NamespacedKey> = find_cycle(&dependencies, &unresolved, start)
            .into_iter()
            .map(|i| keys[i].clone())
            .collect();
        let node = cycle.first().cloned().unwrap_or_else(|| keys[start].clone());
        return Err(PlanError::CyclicDependency { node, cycle });
    }

    Ok(order.into_iter().map(|i| keys[i].clone()).collect())
}

/// Walk unresolved dependencies from `start` until a node repeats
///
/// Every stuck node has at least one stuck dependency, so the walk always
/// closes a cycle. The returned path starts and ends at the same node.
fn find_cycle(dependencies: &[Vec<usize>], unresolved: &[usize], start: usize) -> Vec<usize> {
    let stuck = |i: usize| unresolved[i] > 0;

    let mut path = vec![start];
    let mut current = start;
    loop {
        let Some(next) = dependencies[current].iter().copied().find(|&d| stuck(d)) else {
            return path;
        };
        if let Some(at) = path.iter().position(|&p| p == next) {
            let mut cycle = path.split_off(at);
            cycle.push(next);
            return cycle;
        }
        path.push(next);
        current = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ReleaseNode;
    use indexmap::IndexSet;

    fn key(name: &str) -> NamespacedKey {
        NamespacedKey::new("ns", name)
    }

    fn graph(nodes: &[(&str, &[&str])]) -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        for (name, deps) in nodes {
            graph.add(ReleaseNode {
                key: key(name),
                depends_on: deps.iter().map(|d| key(d)).collect::<IndexSet<_>>(),
                source_ref: None,
                value_refs: Vec::new(),
                inline_values: None,
            });
        }
        graph
    }

    fn names(order: &[NamespacedKey]) -> Vec<&str> {
        order.iter().map(|k| k.name.as_str()).collect()
    }

    #[test]
    fn test_simple_chain() {
        let order = topological_order(&graph(&[("app", &["db"]), ("db", &[])])).unwrap();
        assert_eq!(names(&order), vec!["db", "app"]);
    }

    #[test]
    fn test_independent_nodes_keep_manifest_order() {
        let order = topological_order(&graph(&[("c", &[]), ("a", &[]), ("b", &[])])).unwrap();
        assert_eq!(names(&order), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_diamond() {
        let order = topological_order(&graph(&[
            ("a", &["b", "c"]),
            ("c", &["d"]),
            ("b", &["d"]),
            ("d", &[]),
            ("e", &[]),
        ]))
        .unwrap();

        assert_eq!(names(&order), vec!["d", "c", "b", "a", "e"]);
    }

    #[test]
    fn test_ready_node_with_earlier_position_jumps_ahead() {
        // `x` only becomes ready after `y`, but then precedes later-seen `z`
        let order = topological_order(&graph(&[("x", &["y"]), ("y", &[]), ("z", &[])])).unwrap();
        assert_eq!(names(&order), vec!["y", "x", "z"]);
    }

    #[test]
    fn test_dangling_dependencies_are_ignored() {
        let order = topological_order(&graph(&[("app", &["ghost"])])).unwrap();
        assert_eq!(names(&order), vec!["app"]);
    }

    #[test]
    fn test_two_node_cycle() {
        let err = topological_order(&graph(&[("a", &["b"]), ("b", &["a"]), ("c", &[])])).unwrap_err();

        match err {
            PlanError::CyclicDependency { node, cycle } => {
                assert_eq!(node, key("a"));
                assert_eq!(names(&cycle), vec!["a", "b", "a"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let err = topological_order(&graph(&[("a", &["a"])])).unwrap_err();
        assert!(matches!(err, PlanError::CyclicDependency { .. }));
        assert!(err.to_string().contains("ns/a -> ns/a"));
    }

    #[test]
    fn test_cycle_reported_without_downstream_nodes() {
        // `top` is stuck only because it depends on the cycle
        let err = topological_order(&graph(&[
            ("top", &["b"]),
            ("b", &["c"]),
            ("c", &["b"]),
        ]))
        .unwrap_err();

        match err {
            PlanError::CyclicDependency { node, cycle } => {
                assert_eq!(node, key("b"));
                assert_eq!(names(&cycle), vec!["b", "c", "b"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_cycle_fails_even_when_other_releases_order() {
        let err = topological_order(&graph(&[
            ("a", &[]),
            ("b", &["c"]),
            ("c", &["b"]),
            ("d", &["a"]),
        ]))
        .unwrap_err();

        match err {
            PlanError::CyclicDependency { node, cycle } => {
                assert_eq!(node, key("b"));
                assert_eq!(names(&cycle), vec!["b", "c", "b"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_graph() {
        assert!(topological_order(&DependencyGraph::new()).unwrap().is_empty());
    }
}
