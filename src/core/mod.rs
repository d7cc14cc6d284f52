// Error and configuration types shared by graph construction and resolution

pub mod config;
pub mod errors;

// Re-export commonly used types
pub use config::ResolveConfig;
pub use errors::{GraphError, Result};
