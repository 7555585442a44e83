//! Job ledger adapter configuration.

use std::time::Duration;

use serde::Deserialize;

/// Configuration for the job ledger adapter.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    /// Base URL of the ledger API.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// HTTP request timeout.
    #[serde(default = "default_timeout", with = "duration_secs")]
    pub timeout: Duration,

    /// Job statuses that forbid writes, compared case-insensitively.
    #[serde(default = "default_locked_statuses")]
    pub locked_statuses: Vec<String>,
}

fn default_api_url() -> String {
    "https://ledger.example.com".into()
}

const fn default_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_locked_statuses() -> Vec<String> {
    vec!["locked".into(), "closed".into(), "invoiced".into()]
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            timeout: default_timeout(),
            locked_statuses: default_locked_statuses(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config: LedgerConfig = serde_json::from_str(r#"{"timeout": 3}"#).unwrap();
        assert_eq!(config.api_url, "https://ledger.example.com");
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(config.locked_statuses.len(), 3);
    }
}
