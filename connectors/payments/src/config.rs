//! Payments adapter configuration.

use std::time::Duration;

use serde::Deserialize;

/// Configuration for the payments adapter.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentsConfig {
    /// Base URL of the payments API.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// HTTP request timeout.
    #[serde(default = "default_timeout", with = "duration_secs")]
    pub timeout: Duration,

    /// Metadata key audit notes are written under.
    #[serde(default = "default_note_key")]
    pub note_key: String,
}

fn default_api_url() -> String {
    "https://api.stripe.com".into()
}

const fn default_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_note_key() -> String {
    "sync_note".into()
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

impl Default for PaymentsConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            timeout: default_timeout(),
            note_key: default_note_key(),
        }
    }
}
