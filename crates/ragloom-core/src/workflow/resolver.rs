//! Dependency resolution over a user-drawn graph.
//!
//! A node is ready once every predecessor has completed; a node with no
//! predecessors is ready from the start. Each call to
//! [`DependencyResolver::next_batch`] returns all ready nodes that have not
//! completed yet, in node-list order. A pass that finds nothing ready while
//! nodes remain means the run is stalled (a cycle, or an edge from a node
//! that can never start).

use std::collections::HashSet;

use super::graph::Graph;

/// What the resolver found on one pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    /// Nodes that can run now, in node-list order.
    Ready(Vec<String>),
    /// Every node has completed.
    Finished,
    /// Nodes remain but none of them can ever become ready.
    Stalled { pending: Vec<String> },
}

/// Computes ready batches against a completed set.
#[derive(Debug, Clone, Copy)]
pub struct DependencyResolver<'g> {
    graph: &'g Graph,
}

impl<'g> DependencyResolver<'g> {
    pub fn new(graph: &'g Graph) -> Self {
        Self { graph }
    }

    /// True when `id` is not completed and all its predecessors are.
    pub fn is_ready(&self, id: &str, completed: &HashSet<String>) -> bool {
        !completed.contains(id)
            && self
                .graph
                .predecessors(id)
                .iter()
                .all(|p| completed.contains(*p))
    }

    /// One resolver pass.
    ///
    /// Nodes that only become ready because a member of the returned batch
    /// completes are picked up by the next pass.
    pub fn next_batch(&self, completed: &HashSet<String>) -> Readiness {
        let pending: Vec<&str> = self
            .graph
            .all_node_ids()
            .into_iter()
            .filter(|id| !completed.contains(*id))
            .collect();

        if pending.is_empty() {
            return Readiness::Finished;
        }

        let ready: Vec<String> = pending
            .iter()
            .filter(|id| self.is_ready(id, completed))
            .map(|id| id.to_string())
            .collect();

        if ready.is_empty() {
            Readiness::Stalled {
                pending: pending.into_iter().map(String::from).collect(),
            }
        } else {
            Readiness::Ready(ready)
        }
    }
}

/// The batches a run would process, in order, plus any nodes left unreached.
///
/// Used to preview a workflow without executing it.
pub fn execution_order(graph: &Graph) -> (Vec<Vec<String>>, Vec<String>) {
    let resolver = DependencyResolver::new(graph);
    let mut completed = HashSet::new();
    let mut batches = Vec::new();

    loop {
        match resolver.next_batch(&completed) {
            Readiness::Ready(batch) => {
                completed.extend(batch.iter().cloned());
                batches.push(batch);
            }
            Readiness::Finished => return (batches, Vec::new()),
            Readiness::Stalled { pending } => return (batches, pending),
        }
    }
}

#[cfg(test)]
mod tests {
    use ragloom_types::workflow::{EdgeSpec, NodeSpec};

    use super::*;

    fn graph(ids: &[&str], edges: &[(&str, &str)]) -> Graph {
        let nodes: Vec<NodeSpec> = ids
            .iter()
            .map(|id| NodeSpec {
                id: id.to_string(),
                kind: "output".to_string(),
                data: Default::default(),
            })
            .collect();
        let edges: Vec<EdgeSpec> = edges.iter().map(|(s, t)| EdgeSpec::new(*s, *t)).collect();
        Graph::load(&nodes, &edges).unwrap()
    }

    fn set(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_no_edges_single_batch_in_list_order() {
        let g = graph(&["c", "a", "b"], &[]);
        let r = DependencyResolver::new(&g);
        assert_eq!(
            r.next_batch(&set(&[])),
            Readiness::Ready(vec!["c".into(), "a".into(), "b".into()])
        );
        assert_eq!(r.next_batch(&set(&["a", "b", "c"])), Readiness::Finished);
    }

    #[test]
    fn test_chain_one_node_per_batch() {
        let g = graph(&["o", "l", "q"], &[("q", "l"), ("l", "o")]);
        let (batches, unreached) = execution_order(&g);
        assert_eq!(
            batches,
            vec![vec!["q".to_string()], vec!["l".to_string()], vec!["o".to_string()]]
        );
        assert!(unreached.is_empty());
    }

    #[test]
    fn test_fan_in_waits_for_all_predecessors() {
        let g = graph(&["a", "b", "z"], &[("a", "z"), ("b", "z")]);
        let r = DependencyResolver::new(&g);
        assert!(!r.is_ready("z", &set(&["a"])));
        assert!(r.is_ready("z", &set(&["a", "b"])));
        assert_eq!(
            r.next_batch(&set(&["a"])),
            Readiness::Ready(vec!["b".to_string()])
        );
    }

    #[test]
    fn test_completed_node_is_not_ready() {
        let g = graph(&["a"], &[]);
        let r = DependencyResolver::new(&g);
        assert!(r.is_ready("a", &set(&[])));
        assert!(!r.is_ready("a", &set(&["a"])));
    }

    #[test]
    fn test_cycle_stalls_after_acyclic_progress() {
        // q -> a <-> b, plus an independent node x
        let g = graph(
            &["q", "a", "b", "x"],
            &[("q", "a"), ("a", "b"), ("b", "a")],
        );
        let (batches, unreached) = execution_order(&g);
        assert_eq!(batches, vec![vec!["q".to_string(), "x".to_string()]]);
        assert_eq!(unreached, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_diamond() {
        let g = graph(
            &["a", "b", "c", "d"],
            &[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")],
        );
        let (batches, _) = execution_order(&g);
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[1], vec!["b".to_string(), "c".to_string()]);
    }

    #[test]
    fn test_empty_graph_finished() {
        let g = graph(&[], &[]);
        let r = DependencyResolver::new(&g);
        assert_eq!(r.next_batch(&set(&[])), Readiness::Finished);
    }
}
