use serde::{Deserialize, Serialize};
use std::path::Path;

use super::errors::{GraphError, Result};

/// Tuning parameters applied to every resolution of a graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveConfig {
    /// Maximum number of action bodies running at once (None = unbounded)
    pub max_parallel_actions: Option<usize>,
    /// Emit a tracing event for every hook callback
    pub log_events: bool,
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self {
            max_parallel_actions: None,
            log_events: false,
        }
    }
}

impl ResolveConfig {
    /// Parse a configuration from YAML and validate it
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            GraphError::config_with_source(format!("failed to read {}", path.display()), e)
        })?;
        Self::from_yaml_str(&yaml)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.max_parallel_actions == Some(0) {
            return Err(GraphError::config(
                "max_parallel_actions must be greater than 0",
            ));
        }
        Ok(())
    }

    pub fn with_max_parallel_actions(mut self, limit: usize) -> Self {
        self.max_parallel_actions = Some(limit);
        self
    }

    pub fn with_log_events(mut self, enabled: bool) -> Self {
        self.log_events = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = ResolveConfig::default();
        assert_eq!(config.max_parallel_actions, None);
        assert!(!config.log_events);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_yaml() {
        let config = ResolveConfig::from_yaml_str("max_parallel_actions: 4\nlog_events: true\n")
            .unwrap();
        assert_eq!(
            config,
            ResolveConfig::default()
                .with_max_parallel_actions(4)
                .with_log_events(true)
        );
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config = ResolveConfig::from_yaml_str("log_events: true\n").unwrap();
        assert_eq!(config.max_parallel_actions, None);
        assert!(config.log_events);
    }

    #[test]
    fn test_zero_parallelism_rejected() {
        let err = ResolveConfig::from_yaml_str("max_parallel_actions: 0\n").unwrap_err();
        assert_eq!(err.category(), "configuration");
    }

    #[test]
    fn test_malformed_yaml_rejected() {
        let err = ResolveConfig::from_yaml_str("max_parallel_actions: [oops").unwrap_err();
        assert!(matches!(err, GraphError::Config { .. }));
    }
}
