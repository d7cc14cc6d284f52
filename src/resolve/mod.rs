//! Resolution: discover the graph and run every action in dependency order
//!
//! `resolve` performs a synchronous depth-first discovery from every root
//! (a node nothing depends on) towards its prerequisites. Each newly
//! discovered node gets one task that waits for the construction barrier,
//! then for its prerequisites, runs its action and finally releases its
//! dependents. Cycles are reported before any action can run, because no
//! task passes the construction barrier until discovery has returned.

mod latch;
mod session;

use std::sync::Arc;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::core::{GraphError, Result};
use crate::graph::{Graph, NodeId};
use crate::hooks::{self, LoggingRecorder, Recorder};
use session::Session;

/// Handle to a running resolution
///
/// The resolution is done when every node task has finished, or as soon as
/// the caller's cancellation token (or [`Resolution::cancel`]) fires.
#[derive(Debug, Clone)]
pub struct Resolution {
    run_id: Uuid,
    token: CancellationToken,
    tracker: TaskTracker,
}

impl Resolution {
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// The resolution's cancellation token, also handed to every action
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn is_done(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Wait until every action has run, or the resolution was cancelled
    pub async fn done(&self) {
        self.token.cancelled().await
    }

    /// Wait until every node task has finished its bookkeeping
    ///
    /// Unlike [`done`](Self::done), this also waits for actions that were
    /// already running when the resolution was cancelled.
    pub async fn settled(&self) {
        self.tracker.wait().await
    }

    /// Cancel the resolution; nodes that have not started are skipped
    pub fn cancel(&self) {
        self.token.cancel()
    }

    /// Number of node tasks still running
    pub fn outstanding(&self) -> usize {
        self.tracker.len()
    }
}

impl<T: Send + Sync + 'static> Graph<T> {
    /// Run every action once, in dependency order, with no recorders
    ///
    /// See [`resolve_with`](Self::resolve_with).
    pub fn resolve(&self, cancel: &CancellationToken, arg: Arc<T>) -> Result<Resolution> {
        self.resolve_with(cancel, arg, Vec::new())
    }

    /// Run every action once, in dependency order
    ///
    /// Must be called from within a tokio runtime. Fails with
    /// [`GraphError::NoRoots`] or [`GraphError::CycleDetected`] before any
    /// action runs; tasks already spawned when a cycle is found observe
    /// cancellation and exit. On success the returned [`Resolution`] is done
    /// once every action has run or been skipped due to cancellation.
    ///
    /// `arg` is shared by all actions without any locking.
    pub fn resolve_with(
        &self,
        cancel: &CancellationToken,
        arg: Arc<T>,
        mut recorders: Vec<Arc<dyn Recorder>>,
    ) -> Result<Resolution> {
        let handle = Handle::try_current().map_err(|_| GraphError::NoRuntime)?;
        let token = cancel.child_token();
        let run_id = Uuid::new_v4();
        let span = info_span!("resolve", %run_id);
        let _entered = span.enter();

        let roots: Vec<_> = self.adjacency().roots().collect();
        if roots.is_empty() {
            warn!("Resolve aborted: no roots among {} nodes", self.len());
            token.cancel();
            return Err(GraphError::NoRoots);
        }

        if self.config().log_events {
            recorders.push(Arc::new(LoggingRecorder));
        }
        let recorder = hooks::combine(recorders);

        info!(
            "Resolving {} nodes from {} roots",
            self.len(),
            roots.len()
        );
        let mut session = Session::new(self, token.clone(), arg, recorder, handle.clone());
        if let Err(e) = discover(&mut session, &roots, &token) {
            warn!("Resolve aborted: {}", e);
            token.cancel();
            session.tracker().close();
            return Err(e);
        }

        let tracker = session.tracker().clone();
        tracker.close();
        let watcher = {
            let tracker = tracker.clone();
            let token = token.clone();
            async move {
                tracker.wait().await;
                info!("Resolution complete");
                token.cancel();
            }
        };
        handle.spawn(watcher.in_current_span());

        // Dropping the session releases the construction barrier.
        drop(session);

        Ok(Resolution {
            run_id,
            token,
            tracker,
        })
    }
}

fn discover<T: Send + Sync + 'static>(
    session: &mut Session<'_, T>,
    roots: &[NodeId],
    token: &CancellationToken,
) -> Result<()> {
    for &root in roots {
        session.discover(root)?;
    }

    // Anything unreached from a root sits on or upstream of a cycle, unless
    // cancellation cut discovery short.
    if !token.is_cancelled() {
        if let Some(node) = session.first_undiscovered() {
            return Err(GraphError::cycle(session.graph_name(node)));
        }
    }
    tracing::debug!("Discovered {} nodes", session.discovered());
    Ok(())
}
