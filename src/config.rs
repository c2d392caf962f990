//! Configuration types.

use crate::error::ConfigError;

/// Service configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Number of parallel workers in the pool. Fixed for the process
    /// lifetime.
    pub workers: usize,
    /// HTTP listen port.
    pub port: u16,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            port: 8080,
        }
    }
}

impl ServiceConfig {
    /// Build from `PROGRESSOR_WORKERS` / `PROGRESSOR_PORT`, falling back to
    /// defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let workers = std::env::var("PROGRESSOR_WORKERS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.workers);

        let port = std::env::var("PROGRESSOR_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.port);

        Self { workers, port }
    }

    /// Reject a pool size the dispatcher cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers < 1 {
            return Err(ConfigError::InvalidValue {
                key: "workers".to_string(),
                message: "must be an integer >= 1".to_string(),
            });
        }
        Ok(())
    }
}
