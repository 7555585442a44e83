//! Project board adapter configuration.

use std::time::Duration;

use serde::Deserialize;

/// Configuration for the project board adapter.
#[derive(Debug, Clone, Deserialize)]
pub struct BoardConfig {
    /// GraphQL endpoint.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// HTTP request timeout.
    #[serde(default = "default_timeout", with = "duration_secs")]
    pub timeout: Duration,

    /// Board that column writes target.
    #[serde(default)]
    pub board_id: Option<String>,

    /// Column holding the ledger job number on each item.
    #[serde(default = "default_job_column")]
    pub job_column: String,

    /// Item states that forbid writes.
    #[serde(default = "default_locked_states")]
    pub locked_states: Vec<String>,
}

fn default_api_url() -> String {
    "https://api.board.example.com/v2".into()
}

const fn default_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_job_column() -> String {
    "job_number".into()
}

fn default_locked_states() -> Vec<String> {
    vec!["archived".into(), "deleted".into()]
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

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            timeout: default_timeout(),
            board_id: None,
            job_column: default_job_column(),
            locked_states: default_locked_states(),
        }
    }
}
