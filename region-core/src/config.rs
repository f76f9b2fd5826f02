use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::grid::GridConfig;
use crate::group::GroupConfig;

/// Engine settings. Every field has a default, so the front end may pass a
/// partial object such as `{"grid": {"columns": 16}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub grid: GridConfig,
    pub groups: GroupConfig,
    /// How long error toasts stay visible, in milliseconds.
    pub toast_timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            grid: GridConfig::default(),
            groups: GroupConfig::default(),
            toast_timeout_ms: 5000,
        }
    }
}

impl EngineConfig {
    pub fn toast_timeout(&self) -> Duration {
        Duration::from_millis(self.toast_timeout_ms)
    }
}

/// Parse a JSON config. Blank input gives the defaults.
pub fn parse_config(json: &str) -> Result<EngineConfig> {
    if json.trim().is_empty() {
        return Ok(EngineConfig::default());
    }
    Ok(serde_json::from_str(json)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_config_is_default() {
        assert_eq!(parse_config("  ").unwrap(), EngineConfig::default());
        assert_eq!(parse_config("{}").unwrap(), EngineConfig::default());
    }

    #[test]
    fn test_partial_config() {
        let cfg = parse_config(r#"{"grid":{"columns":16},"groups":{"refresh_margin":15}}"#).unwrap();
        assert_eq!(cfg.grid.columns, 16);
        assert_eq!(cfg.grid.row_height, 60);
        assert_eq!(cfg.groups.refresh_margin, 15);
        assert_eq!(cfg.groups.create_margin, 15);
        assert_eq!(cfg.toast_timeout(), Duration::from_millis(5000));
    }

    #[test]
    fn test_bad_config_errors() {
        assert!(parse_config(r#"{"grid":{"columns":"twelve"}}"#).is_err());
    }
}
