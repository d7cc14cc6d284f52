use thiserror::Error;

/// Unified error type for graph construction and resolution
#[derive(Debug, Error)]
pub enum GraphError {
    /// A construction call was given an empty node name
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// A dependency referenced a node with no registered action
    #[error("Unknown node: {name}")]
    UnknownNode { name: String },

    /// Every node has at least one dependent, so there is nowhere to start
    #[error("no roots in graph")]
    NoRoots,

    /// A node is reachable from itself through prerequisite edges
    #[error("cycle detected at node {node}")]
    CycleDetected { node: String },

    /// `resolve` was called without a tokio runtime to spawn onto
    #[error("resolve must be called from within a tokio runtime")]
    NoRuntime,

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl GraphError {
    /// Create an invalid argument error
    pub fn invalid_argument<S: Into<String>>(message: S) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create an unknown node error
    pub fn unknown_node<S: Into<String>>(name: S) -> Self {
        Self::UnknownNode { name: name.into() }
    }

    /// Create a cycle error naming the node found on the active path
    pub fn cycle<S: Into<String>>(node: S) -> Self {
        Self::CycleDetected { node: node.into() }
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    /// Create a configuration error with source
    pub fn config_with_source<S: Into<String>, E: std::error::Error + Send + Sync + 'static>(
        message: S,
        source: E,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Check if error is recoverable
    ///
    /// Construction errors leave the graph untouched, so the caller can retry
    /// with corrected input. Resolution errors describe the graph itself.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::InvalidArgument { .. } | Self::UnknownNode { .. } => true,
            Self::NoRuntime | Self::Config { .. } => true,
            Self::NoRoots | Self::CycleDetected { .. } => false,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidArgument { .. } => "invalid_argument",
            Self::UnknownNode { .. } => "unknown_node",
            Self::NoRoots => "no_roots",
            Self::CycleDetected { .. } => "cycle",
            Self::NoRuntime => "runtime",
            Self::Config { .. } => "configuration",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, GraphError>;

impl From<serde_yaml::Error> for GraphError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::config_with_source("yaml", err)
    }
}
