//! Scheduler options parsed from a TOML file.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SchedulerConfig {
    /// Whether fencing is available. A `fence` loss-policy requires it.
    pub stonith_enabled: bool,
    /// Whether resources may run anywhere unless a constraint says otherwise.
    pub symmetric_cluster: bool,
    /// Fixed evaluation time (RFC 3339) for time-based rules.
    pub now: Option<String>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            stonith_enabled: true,
            symmetric_cluster: true,
            now: None,
        }
    }
}

impl SchedulerConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: SchedulerConfig = toml::from_str(content)?;
        if let Some(now) = &config.now {
            DateTime::parse_from_rfc3339(now)
                .map_err(|e| anyhow::anyhow!("invalid `now` timestamp '{now}': {e}"))?;
        }
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// The instant rules are evaluated at: the configured `now` or the wall clock.
    pub fn evaluation_time(&self) -> CoreResult<DateTime<Utc>> {
        match &self.now {
            Some(now) => DateTime::parse_from_rfc3339(now)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|_| CoreError::InvalidTimestamp(now.clone())),
            None => Ok(Utc::now()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_for_empty_file() {
        let config = SchedulerConfig::from_toml_str("").unwrap();
        assert!(config.stonith_enabled);
        assert!(config.symmetric_cluster);
        assert_eq!(config.now, None);
    }

    #[test]
    fn parse_options() {
        let config = SchedulerConfig::from_toml_str(
            r#"
stonith-enabled = false
symmetric-cluster = false
now = "2024-03-01T12:00:00Z"
"#,
        )
        .unwrap();
        assert!(!config.stonith_enabled);
        assert!(!config.symmetric_cluster);
        let now = config.evaluation_time().unwrap();
        assert_eq!(now.to_rfc3339(), "2024-03-01T12:00:00+00:00");
    }

    #[test]
    fn rejects_bad_timestamp() {
        assert!(SchedulerConfig::from_toml_str("now = \"yesterday\"").is_err());
    }

    #[test]
    fn round_trip_through_toml() {
        let config = SchedulerConfig {
            stonith_enabled: false,
            ..Default::default()
        };
        let text = config.to_toml_string().unwrap();
        assert_eq!(SchedulerConfig::from_toml_str(&text).unwrap(), config);
    }
}
