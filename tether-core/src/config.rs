//! Runtime configuration.

use serde::Deserialize;

use crate::error::{Result, StoreError};

/// Tunables for a [`Runtime`](crate::reactive::Runtime).
///
/// Every field has a default, so a partial JSON document is enough:
///
/// ```rust,ignore
/// let config = RuntimeConfig::from_json_str(r#"{ "prune_stale_dependencies": false }"#)?;
/// let rt = Runtime::with_config(config);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Clear a computation's previous dependency set before it re-runs.
    ///
    /// When disabled, a computed that stopped reading a key (for example
    /// after a conditional branch flipped) stays registered against it and
    /// keeps getting invalidated by it.
    pub prune_stale_dependencies: bool,

    /// Log when `define_store` is called again for an id that is already
    /// registered. The second definition is ignored either way.
    pub warn_on_duplicate_definition: bool,

    /// Size at which the wrapper identity map is first swept for dead
    /// entries. The threshold doubles after every sweep.
    pub sweep_threshold: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            prune_stale_dependencies: true,
            warn_on_duplicate_definition: true,
            sweep_threshold: 256,
        }
    }
}

impl RuntimeConfig {
    /// Parse a configuration from JSON.
    pub fn from_json_str(input: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.sweep_threshold == 0 {
            return Err(StoreError::Config(
                "sweep_threshold must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = RuntimeConfig::from_json_str(r#"{ "prune_stale_dependencies": false }"#)
            .expect("valid config");
        assert!(!config.prune_stale_dependencies);
        assert!(config.warn_on_duplicate_definition);
        assert_eq!(config.sweep_threshold, 256);
    }

    #[test]
    fn zero_sweep_threshold_is_rejected() {
        let err = RuntimeConfig::from_json_str(r#"{ "sweep_threshold": 0 }"#).unwrap_err();
        assert!(matches!(err, StoreError::Config(_)));
    }

    #[test]
    fn malformed_json_is_a_serialization_error() {
        let err = RuntimeConfig::from_json_str("{ nope").unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));
    }
}
