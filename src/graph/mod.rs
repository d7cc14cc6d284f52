//! Graph construction and validation
//!
//! A [`Graph`] owns the registered actions and the adjacency store. Names are
//! validated when actions are added and when dependencies are linked; cycles
//! are only detected when the graph is resolved, since they may not be
//! visible until the whole graph is assembled.

pub mod action;
pub mod adjacency;

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::core::{GraphError, ResolveConfig, Result};
pub use action::{Action, FnAction, NoopAction};
pub use adjacency::{AdjacencyStore, NodeId};

/// A graph of actions executed concurrently in dependency order
///
/// `T` is the shared argument handed to every action. Resolution borrows the
/// graph immutably, so it cannot be modified while a `resolve` call is
/// building its session. Sessions that are still running own everything
/// they need and never observe later modifications.
pub struct Graph<T> {
    /// name -> dense id
    ids: HashMap<String, NodeId>,
    /// id -> name
    names: Vec<String>,
    /// id -> action
    actions: Vec<Arc<dyn Action<T>>>,
    adjacency: AdjacencyStore,
    config: ResolveConfig,
}

impl<T: Send + Sync + 'static> Graph<T> {
    /// Create an empty graph with default configuration
    pub fn new() -> Self {
        Self {
            ids: HashMap::new(),
            names: Vec::new(),
            actions: Vec::new(),
            adjacency: AdjacencyStore::new(),
            config: ResolveConfig::default(),
        }
    }

    /// Create an empty graph with the given configuration
    pub fn with_config(config: ResolveConfig) -> Result<Self> {
        config.validate()?;
        let mut graph = Self::new();
        graph.config = config;
        Ok(graph)
    }

    /// Register `action` under `name`
    ///
    /// Re-registering a name replaces its action but keeps its edges.
    pub fn add_action<A>(&mut self, name: impl Into<String>, action: A) -> Result<()>
    where
        A: Action<T> + 'static,
    {
        let name = name.into();
        if name.is_empty() {
            return Err(GraphError::invalid_argument("name must not be empty"));
        }

        let action: Arc<dyn Action<T>> = Arc::new(action);
        match self.ids.get(&name) {
            Some(&id) => {
                debug!("Replacing action for node {}", name);
                self.actions[id] = action;
            }
            None => {
                let id = self.adjacency.add_node();
                self.names.push(name.clone());
                self.actions.push(action);
                self.ids.insert(name, id);
            }
        }
        Ok(())
    }

    /// Register an async closure under `name`
    pub fn add_fn<F, Fut>(&mut self, name: impl Into<String>, func: F) -> Result<()>
    where
        F: Fn(CancellationToken, Arc<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.add_action(name, FnAction::new(func))
    }

    /// Make `dependent` wait for `prerequisite` to finish
    ///
    /// Self-edges are accepted here and reported as cycles at resolve time.
    pub fn link_dependency(&mut self, prerequisite: &str, dependent: &str) -> Result<()> {
        if prerequisite.is_empty() {
            return Err(GraphError::invalid_argument(
                "prerequisite name must not be empty",
            ));
        }
        if dependent.is_empty() {
            return Err(GraphError::invalid_argument("dependent name must not be empty"));
        }
        let prerequisite_id = self.require(prerequisite)?;
        let dependent_id = self.require(dependent)?;

        self.adjacency.link(prerequisite_id, dependent_id);
        Ok(())
    }
}

impl<T> Graph<T> {
    fn require(&self, name: &str) -> Result<NodeId> {
        self.ids
            .get(name)
            .copied()
            .ok_or_else(|| GraphError::unknown_node(name))
    }

    /// Number of registered nodes
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.ids.contains_key(name)
    }

    pub fn config(&self) -> &ResolveConfig {
        &self.config
    }

    pub fn adjacency(&self) -> &AdjacencyStore {
        &self.adjacency
    }

    pub fn node_id(&self, name: &str) -> Option<NodeId> {
        self.ids.get(name).copied()
    }

    /// Name registered for `node`, or None if no such node exists
    pub fn name(&self, node: NodeId) -> Option<&str> {
        self.names.get(node).map(String::as_str)
    }

    pub(crate) fn node_name(&self, node: NodeId) -> &str {
        &self.names[node]
    }

    pub(crate) fn action(&self, node: NodeId) -> Arc<dyn Action<T>> {
        Arc::clone(&self.actions[node])
    }

    /// Names of the terminal nodes (no dependents), in unspecified order
    pub fn roots(&self) -> Vec<&str> {
        self.adjacency.roots().map(|node| self.node_name(node)).collect()
    }

    /// Names `name` waits for, or None if `name` is not registered
    pub fn prerequisites(&self, name: &str) -> Option<Vec<&str>> {
        let node = self.node_id(name)?;
        Some(self.names_of(self.adjacency.prerequisites(node).iter()))
    }

    /// Names waiting for `name`, or None if `name` is not registered
    pub fn dependents(&self, name: &str) -> Option<Vec<&str>> {
        let node = self.node_id(name)?;
        Some(self.names_of(self.adjacency.dependents(node).iter()))
    }

    fn names_of<'a>(&'a self, nodes: impl Iterator<Item = &'a NodeId>) -> Vec<&'a str> {
        nodes.map(|&node| self.node_name(node)).collect()
    }
}

impl<T: Send + Sync + 'static> Default for Graph<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Graph<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("nodes", &self.names)
            .field("edges", &self.adjacency.edge_count())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn graph_with(names: &[&str]) -> Graph<()> {
        let mut graph = Graph::new();
        for name in names {
            graph.add_action(*name, NoopAction).unwrap();
        }
        graph
    }

    #[test]
    fn test_add_action() {
        let graph = graph_with(&["action"]);
        assert_eq!(graph.len(), 1);
        assert!(graph.contains("action"));
    }

    #[test]
    fn test_add_action_no_name() {
        let mut graph: Graph<()> = Graph::new();
        let err = graph.add_action("", NoopAction).unwrap_err();
        assert!(matches!(err, GraphError::InvalidArgument { .. }));
        assert!(graph.is_empty());
    }

    #[test]
    fn test_re_register_keeps_edges() {
        let mut graph = graph_with(&["a", "b"]);
        graph.link_dependency("a", "b").unwrap();

        graph.add_action("b", NoopAction).unwrap();

        assert_eq!(graph.len(), 2);
        assert_eq!(graph.prerequisites("b"), Some(vec!["a"]));
    }

    #[test]
    fn test_link_dependency() {
        let mut graph = graph_with(&["a", "b"]);

        graph.link_dependency("a", "b").unwrap();

        assert_eq!(graph.prerequisites("b"), Some(vec!["a"]));
        assert_eq!(graph.dependents("a"), Some(vec!["b"]));
        assert_eq!(graph.adjacency().edge_count(), 1);
    }

    #[test]
    fn test_link_dependency_empty_names() {
        let mut graph = graph_with(&["a", "b"]);

        assert!(matches!(
            graph.link_dependency("a", ""),
            Err(GraphError::InvalidArgument { .. })
        ));
        assert!(matches!(
            graph.link_dependency("", "b"),
            Err(GraphError::InvalidArgument { .. })
        ));
        assert_eq!(graph.adjacency().edge_count(), 0);
    }

    #[test]
    fn test_link_dependency_unknown_nodes() {
        let mut graph = graph_with(&["a"]);

        let err = graph.link_dependency("a", "b").unwrap_err();
        assert!(matches!(err, GraphError::UnknownNode { ref name } if name == "b"));

        let err = graph.link_dependency("b", "a").unwrap_err();
        assert!(matches!(err, GraphError::UnknownNode { ref name } if name == "b"));
        assert_eq!(graph.adjacency().edge_count(), 0);
    }

    #[test]
    fn test_self_edge_accepted() {
        let mut graph = graph_with(&["a"]);
        assert!(graph.link_dependency("a", "a").is_ok());
        assert!(graph.roots().is_empty());
    }

    #[test]
    fn test_lookup_unknown_name() {
        let graph = graph_with(&["a"]);
        assert_eq!(graph.prerequisites("zzz"), None);
        assert_eq!(graph.dependents("zzz"), None);
        assert_eq!(graph.node_id("zzz"), None);
    }

    #[test]
    fn test_name_lookup_by_id() {
        let graph = graph_with(&["a", "b"]);
        let id = graph.node_id("b").unwrap();

        assert_eq!(graph.name(id), Some("b"));
        assert_eq!(graph.name(graph.len()), None);
        assert_eq!(graph.name(usize::MAX), None);
    }

    #[test]
    fn test_with_config_validates() {
        let config = ResolveConfig::default().with_max_parallel_actions(0);
        assert!(Graph::<()>::with_config(config).is_err());
    }
}
