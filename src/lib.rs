//! Depflow - run named actions concurrently in dependency order.
//!
//! Register actions on a [`Graph`], link them with "depends on" edges and
//! call [`Graph::resolve`]. Every action runs exactly once, as soon as all of
//! its prerequisites have finished, with unrelated branches running in
//! parallel on the tokio runtime. Cycles and graphs without a terminal node
//! are rejected before any action runs.
//!
//! ```no_run
//! use depflow::{CancellationToken, Graph};
//! use std::sync::{Arc, Mutex};
//!
//! # async fn demo() -> depflow::Result<()> {
//! let mut graph: Graph<Mutex<Vec<&'static str>>> = Graph::new();
//! graph.add_fn("apples", |_, log: Arc<Mutex<Vec<_>>>| async move {
//!     log.lock().unwrap().push("apples");
//! })?;
//! graph.add_fn("applesauce", |_, log: Arc<Mutex<Vec<_>>>| async move {
//!     log.lock().unwrap().push("applesauce");
//! })?;
//! graph.link_dependency("apples", "applesauce")?;
//!
//! let log = Arc::new(Mutex::new(Vec::new()));
//! let resolution = graph.resolve(&CancellationToken::new(), log.clone())?;
//! resolution.done().await;
//! assert_eq!(*log.lock().unwrap(), vec!["apples", "applesauce"]);
//! # Ok(())
//! # }
//! ```

// Error and configuration types
pub mod core;

pub mod graph;
pub mod hooks;
pub mod resolve;

// Re-exports for convenience
pub use crate::core::{GraphError, ResolveConfig, Result};
pub use graph::{Action, AdjacencyStore, FnAction, Graph, NodeId, NoopAction};
pub use hooks::{LoggingRecorder, NodeTiming, NoopRecorder, Recorder, RecorderList, Statistics};
pub use resolve::Resolution;
pub use tokio_util::sync::CancellationToken;
