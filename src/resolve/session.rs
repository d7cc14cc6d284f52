//! Per-resolution state and the node task protocol
//!
//! A [`Session`] lives for one synchronous discovery pass. It walks the graph
//! from every root towards prerequisites, spawning one task per newly
//! discovered node. Tasks share a [`Shared`] block holding the latch arena,
//! the construction barrier and the resolution's cancellation token.

use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, Instrument};

use super::latch::Latch;
use crate::core::{GraphError, Result};
use crate::graph::{Action, Graph, NodeId};
use crate::hooks::Recorder;

/// State shared by every task of one resolution
pub(crate) struct Shared<T> {
    /// One latch per node, sized to its prerequisite count
    latches: Vec<Latch>,
    /// Construction barrier, released when discovery returns
    gate: Latch,
    token: CancellationToken,
    arg: Arc<T>,
    recorder: Arc<dyn Recorder>,
    limiter: Option<Arc<Semaphore>>,
}

pub(crate) struct Session<'g, T> {
    graph: &'g Graph<T>,
    shared: Arc<Shared<T>>,
    visited: Vec<bool>,
    on_path: Vec<bool>,
    tracker: TaskTracker,
    handle: Handle,
}

impl<'g, T: Send + Sync + 'static> Session<'g, T> {
    pub(crate) fn new(
        graph: &'g Graph<T>,
        token: CancellationToken,
        arg: Arc<T>,
        recorder: Arc<dyn Recorder>,
        handle: Handle,
    ) -> Self {
        let adjacency = graph.adjacency();
        // Every latch exists before any task can pass the gate.
        let latches = (0..adjacency.len())
            .map(|node| Latch::new(adjacency.prerequisites(node).len()))
            .collect();
        let limiter = graph
            .config()
            .max_parallel_actions
            .map(|limit| Arc::new(Semaphore::new(limit)));

        Self {
            graph,
            shared: Arc::new(Shared {
                latches,
                gate: Latch::new(1),
                token,
                arg,
                recorder,
                limiter,
            }),
            visited: vec![false; adjacency.len()],
            on_path: vec![false; adjacency.len()],
            tracker: TaskTracker::new(),
            handle,
        }
    }

    pub(crate) fn tracker(&self) -> &TaskTracker {
        &self.tracker
    }

    pub(crate) fn discovered(&self) -> usize {
        self.visited.iter().filter(|&&seen| seen).count()
    }

    pub(crate) fn graph_name(&self, node: NodeId) -> &'g str {
        self.graph.node_name(node)
    }

    /// First registered node discovery never reached
    pub(crate) fn first_undiscovered(&self) -> Option<NodeId> {
        self.visited.iter().position(|&seen| !seen)
    }

    /// Depth-first discovery from `root`, scheduling every new node
    ///
    /// Uses an explicit stack so deep chains cannot exhaust the call stack.
    /// A node is on the active path from its entry until all of its
    /// prerequisites have been processed.
    pub(crate) fn discover(&mut self, root: NodeId) -> Result<()> {
        let graph = self.graph;
        let mut stack = vec![self.enter(root)];

        while let Some(frame) = stack.last_mut() {
            match frame.prerequisites.next() {
                Some(&prerequisite) => {
                    if self.on_path[prerequisite] {
                        return Err(GraphError::cycle(graph.node_name(prerequisite)));
                    }
                    if self.visited[prerequisite] {
                        continue;
                    }
                    if self.shared.token.is_cancelled() {
                        continue;
                    }
                    let frame = self.enter(prerequisite);
                    stack.push(frame);
                }
                None => {
                    self.on_path[frame.node] = false;
                    stack.pop();
                }
            }
        }
        Ok(())
    }

    fn enter(&mut self, node: NodeId) -> Frame<'g> {
        let graph = self.graph;
        self.visited[node] = true;
        self.on_path[node] = true;
        self.schedule(node);
        Frame {
            node,
            prerequisites: graph.adjacency().prerequisites(node).iter(),
        }
    }

    fn schedule(&self, node: NodeId) {
        let graph = self.graph;
        let task = NodeTask {
            node,
            name: graph.node_name(node).to_owned(),
            dependents: graph.adjacency().dependents(node).iter().copied().collect(),
            shared: Arc::clone(&self.shared),
        };
        debug!(
            "Scheduling node {} ({} prerequisites, {} dependents)",
            task.name,
            self.shared.latches[node].remaining(),
            task.dependents.len()
        );

        let action = graph.action(node);
        self.tracker
            .spawn_on(task.run(action).in_current_span(), &self.handle);
    }
}

impl<T> Drop for Session<'_, T> {
    fn drop(&mut self) {
        // Releasing the construction barrier once discovery is over, on both
        // the success and the error path.
        self.shared.gate.count_down();
    }
}

struct Frame<'g> {
    node: NodeId,
    prerequisites: std::collections::btree_set::Iter<'g, NodeId>,
}

/// One node's task. Dropping it performs the completion bookkeeping, so
/// dependents are released even if the action panics.
struct NodeTask<T> {
    node: NodeId,
    name: String,
    dependents: Vec<NodeId>,
    shared: Arc<Shared<T>>,
}

impl<T: Send + Sync + 'static> NodeTask<T> {
    async fn run(self, action: Arc<dyn Action<T>>) {
        let shared = Arc::clone(&self.shared);
        shared.recorder.enter(&self.name);

        shared.gate.wait().await;
        if shared.token.is_cancelled() {
            return;
        }

        tokio::select! {
            biased;
            _ = shared.token.cancelled() => return,
            _ = shared.latches[self.node].wait() => {}
        }

        let _permit = match &shared.limiter {
            Some(limiter) => tokio::select! {
                biased;
                _ = shared.token.cancelled() => return,
                permit = Arc::clone(limiter).acquire_owned() => match permit {
                    Ok(permit) => Some(permit),
                    Err(_) => return,
                },
            },
            None => None,
        };

        if shared.token.is_cancelled() {
            return;
        }
        shared.recorder.start(&self.name);
        action.run(shared.token.clone(), Arc::clone(&shared.arg)).await;
        shared.recorder.finish(&self.name);
    }
}

impl<T> Drop for NodeTask<T> {
    fn drop(&mut self) {
        for &dependent in &self.dependents {
            self.shared.latches[dependent].count_down();
        }
        self.shared.recorder.exit(&self.name);
    }
}
