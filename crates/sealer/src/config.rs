//! Sealer Configuration

use crate::{FUTURE_BLOCK_TOLERANCE_SECS, STAKING_TEMPLATE_REFRESH_MS};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Sealer configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SealerConfig {
    /// Freshness window for cached staking templates in milliseconds
    pub staking_template_refresh_ms: u64,
    /// Allowed clock drift for mined block timestamps in seconds
    pub future_block_tolerance_secs: u64,
}

impl SealerConfig {
    pub fn staking_template_refresh(&self) -> Duration {
        Duration::from_millis(self.staking_template_refresh_ms)
    }
}

impl Default for SealerConfig {
    fn default() -> Self {
        Self {
            staking_template_refresh_ms: STAKING_TEMPLATE_REFRESH_MS,
            future_block_tolerance_secs: FUTURE_BLOCK_TOLERANCE_SECS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: SealerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, SealerConfig::default());
        assert_eq!(config.staking_template_refresh(), Duration::from_millis(2000));
    }

    #[test]
    fn test_partial_override() {
        let config: SealerConfig =
            serde_json::from_str(r#"{"future_block_tolerance_secs": 15}"#).unwrap();
        assert_eq!(config.future_block_tolerance_secs, 15);
        assert_eq!(config.staking_template_refresh_ms, STAKING_TEMPLATE_REFRESH_MS);
    }
}
