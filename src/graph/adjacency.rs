//! Adjacency store: prerequisite edges and their exact transpose
//!
//! Nodes are dense integer ids handed out by [`AdjacencyStore::add_node`].
//! If node C depends on node P, then `prerequisites[C]` contains P and
//! `dependents[P]` contains C. Both halves are only ever written together.

use std::collections::BTreeSet;

/// Dense node identifier assigned at registration time
pub type NodeId = usize;

#[derive(Debug, Clone, Default)]
pub struct AdjacencyStore {
    /// node -> nodes it waits for
    prerequisites: Vec<BTreeSet<NodeId>>,
    /// node -> nodes waiting for it
    dependents: Vec<BTreeSet<NodeId>>,
}

impl AdjacencyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a new node with no edges
    pub(crate) fn add_node(&mut self) -> NodeId {
        self.prerequisites.push(BTreeSet::new());
        self.dependents.push(BTreeSet::new());
        self.prerequisites.len() - 1
    }

    /// Record that `dependent` waits for `prerequisite`
    ///
    /// Both ids must come from [`add_node`](Self::add_node). Linking the same
    /// pair twice is a no-op.
    pub(crate) fn link(&mut self, prerequisite: NodeId, dependent: NodeId) {
        self.prerequisites[dependent].insert(prerequisite);
        self.dependents[prerequisite].insert(dependent);
    }

    pub(crate) fn prerequisites(&self, node: NodeId) -> &BTreeSet<NodeId> {
        &self.prerequisites[node]
    }

    pub(crate) fn dependents(&self, node: NodeId) -> &BTreeSet<NodeId> {
        &self.dependents[node]
    }

    pub fn len(&self) -> usize {
        self.prerequisites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prerequisites.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.prerequisites.iter().map(BTreeSet::len).sum()
    }

    /// Terminal nodes: nothing depends on them
    ///
    /// These are the entry points for discovery, which walks from the most
    /// dependent node down to its prerequisites.
    pub fn roots(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.dependents
            .iter()
            .enumerate()
            .filter(|(_, dependents)| dependents.is_empty())
            .map(|(node, _)| node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_new_store_is_empty() {
        let store = AdjacencyStore::new();
        assert!(store.is_empty());
        assert_eq!(store.edge_count(), 0);
        assert_eq!(store.roots().count(), 0);
    }

    #[test]
    fn test_link_writes_both_directions() {
        let mut store = AdjacencyStore::new();
        let a = store.add_node();
        let b = store.add_node();

        store.link(a, b);

        assert_eq!(store.prerequisites(b), &BTreeSet::from([a]));
        assert_eq!(store.dependents(a), &BTreeSet::from([b]));
        assert!(store.prerequisites(a).is_empty());
        assert!(store.dependents(b).is_empty());
    }

    #[test]
    fn test_link_same_pair_twice() {
        let mut store = AdjacencyStore::new();
        let a = store.add_node();
        let b = store.add_node();

        store.link(a, b);
        store.link(a, b);

        assert_eq!(store.edge_count(), 1);
    }

    #[test]
    fn test_multiple_prerequisites() {
        let mut store = AdjacencyStore::new();
        let a = store.add_node();
        let b = store.add_node();
        let c = store.add_node();

        store.link(a, c);
        store.link(b, c);

        assert_eq!(store.prerequisites(c).len(), 2);
        assert_eq!(store.roots().collect::<Vec<_>>(), vec![c]);
    }

    #[test]
    fn test_self_edge_leaves_no_root() {
        let mut store = AdjacencyStore::new();
        let a = store.add_node();

        store.link(a, a);

        assert_eq!(store.roots().count(), 0);
        assert!(store.prerequisites(a).contains(&a));
    }
}
