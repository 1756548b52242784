//! Aggregator configuration.
//!
//! All tunables the core consumes live here: the staleness threshold and
//! sweep cadence for the timeout sweep, and the retention depths bounding
//! per-node block history and the global best-block-time table. Settings are
//! loaded from a YAML file with human-friendly duration strings ("10s",
//! "2m"); every field has a default so an empty file is a valid config.

use std::fs::File;
use std::path::Path;
use std::time::Duration;

use color_eyre::Result;
use log::info;
use serde::{Deserialize, Serialize};

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
    #[error("{0} must be greater than zero")]
    ZeroDepth(&'static str),
}

/// Tunables consumed by [`crate::aggregator::Aggregator`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatorConfig {
    /// A node not heard from for longer than this is swept out.
    #[serde(with = "humantime_serde", default = "default_staleness_threshold")]
    pub staleness_threshold: Duration,

    /// Cadence at which the driver should invoke the timeout sweep. The
    /// core never schedules itself; this is advisory to the caller.
    #[serde(with = "humantime_serde", default = "default_sweep_interval")]
    pub sweep_interval: Duration,

    /// Maximum per-block phase samples retained per node.
    #[serde(default = "default_block_history_depth")]
    pub block_history_depth: usize,

    /// Maximum entries retained in the best-block-time table.
    #[serde(default = "default_best_time_depth")]
    pub best_time_depth: usize,
}

fn default_staleness_threshold() -> Duration {
    Duration::from_secs(60)
}

fn default_sweep_interval() -> Duration {
    Duration::from_secs(10)
}

fn default_block_history_depth() -> usize {
    128
}

fn default_best_time_depth() -> usize {
    4096
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        AggregatorConfig {
            staleness_threshold: default_staleness_threshold(),
            sweep_interval: default_sweep_interval(),
            block_history_depth: default_block_history_depth(),
            best_time_depth: default_best_time_depth(),
        }
    }
}

impl AggregatorConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.staleness_threshold.is_zero() {
            return Err(ValidationError::ZeroDuration("staleness_threshold"));
        }
        if self.sweep_interval.is_zero() {
            return Err(ValidationError::ZeroDuration("sweep_interval"));
        }
        if self.block_history_depth == 0 {
            return Err(ValidationError::ZeroDepth("block_history_depth"));
        }
        if self.best_time_depth == 0 {
            return Err(ValidationError::ZeroDepth("best_time_depth"));
        }
        Ok(())
    }

    /// Staleness threshold in the millisecond scale used by event timestamps.
    pub fn staleness_threshold_ms(&self) -> f64 {
        self.staleness_threshold.as_secs_f64() * 1000.0
    }
}

/// Load and validate configuration from a YAML file
pub fn load_config(config_path: &Path) -> Result<AggregatorConfig> {
    info!("Loading configuration from: {:?}", config_path);

    let file = File::open(config_path)?;
    let config: AggregatorConfig = serde_yaml::from_reader(file)?;

    config.validate()?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = AggregatorConfig::default();
        assert_eq!(config.staleness_threshold, Duration::from_secs(60));
        assert_eq!(config.sweep_interval, Duration::from_secs(10));
        assert_eq!(config.block_history_depth, 128);
        assert_eq!(config.best_time_depth, 4096);
        assert!(config.validate().is_ok());
        assert_eq!(config.staleness_threshold_ms(), 60_000.0);
    }

    #[test]
    fn test_yaml_with_humantime_durations() {
        let yaml = "staleness_threshold: 90s\nsweep_interval: 5s\nblock_history_depth: 32\n";
        let config: AggregatorConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.staleness_threshold, Duration::from_secs(90));
        assert_eq!(config.sweep_interval, Duration::from_secs(5));
        assert_eq!(config.block_history_depth, 32);
        // Unspecified fields fall back to defaults
        assert_eq!(config.best_time_depth, 4096);
    }

    #[test]
    fn test_zero_values_rejected() {
        let config = AggregatorConfig {
            staleness_threshold: Duration::ZERO,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::ZeroDuration("staleness_threshold"))
        ));

        let config = AggregatorConfig {
            block_history_depth: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::ZeroDepth("block_history_depth"))
        ));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "staleness_threshold: 2m").unwrap();
        writeln!(file, "sweep_interval: 30s").unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.staleness_threshold, Duration::from_secs(120));
        assert_eq!(config.sweep_interval, Duration::from_secs(30));
    }
}
