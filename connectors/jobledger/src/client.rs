//! Job ledger REST client.

use relay_core::Secret;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

use crate::{
    config::LedgerConfig,
    error::{LedgerError, LedgerResult},
    types::{Acknowledgement, CreateNote, Job, JobEnvelope, UpdateFields},
};

/// Job ledger REST client. Credentials are passed per call.
#[derive(Debug, Clone)]
pub struct LedgerApiClient {
    client: Client,
    base_url: String,
}

impl LedgerApiClient {
    /// Create a new API client from configuration.
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be built.
    pub fn new(config: &LedgerConfig) -> LedgerResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(format!("relay-jobledger/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: config.api_url.clone(),
        })
    }

    /// Set the base URL (for testing).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self, segments: &[&str]) -> LedgerResult<Url> {
        let mut url =
            Url::parse(&self.base_url).map_err(|e| LedgerError::Url(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| LedgerError::Url(format!("{} cannot be a base", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Jobs
    // ─────────────────────────────────────────────────────────────────────────

    /// Fetch a job by reference. `None` when the ledger has no such job.
    ///
    /// # Errors
    ///
    /// Transport, status or body-shape failures.
    #[instrument(skip(self, token))]
    pub async fn get_job(&self, reference: &str, token: &Secret) -> LedgerResult<Option<Job>> {
        let url = self.endpoint(&["api", "jobs", reference])?;
        let response = self
            .client
            .get(url)
            .query(&[("api_token", token.expose())])
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!(reference, "Job not found");
            return Ok(None);
        }
        let envelope: JobEnvelope = handle_response(response).await?;
        Ok(Some(envelope.job))
    }

    /// Write one field on a job.
    ///
    /// # Errors
    ///
    /// Transport, status or application failures.
    #[instrument(skip(self, value, token))]
    pub async fn update_field(
        &self,
        job_number: &str,
        field: &str,
        value: &str,
        token: &Secret,
    ) -> LedgerResult<()> {
        let url = self.endpoint(&["api", "jobs", job_number])?;
        let response = self
            .client
            .patch(url)
            .query(&[("api_token", token.expose())])
            .json(&UpdateFields::single(field, value))
            .send()
            .await?;

        handle_acknowledgement(response).await
    }

    /// Append a note to a job.
    ///
    /// # Errors
    ///
    /// Transport, status or application failures.
    #[instrument(skip(self, text, token))]
    pub async fn create_note(&self, job_number: &str, text: &str, token: &Secret) -> LedgerResult<()> {
        let url = self.endpoint(&["api", "jobs", job_number, "notes"])?;
        let response = self
            .client
            .post(url)
            .query(&[("api_token", token.expose())])
            .json(&CreateNote { text })
            .send()
            .await?;

        handle_acknowledgement(response).await
    }
}

async fn handle_response<T: DeserializeOwned>(response: Response) -> LedgerResult<T> {
    let status = response.status();
    let bytes = response.bytes().await?;

    if !status.is_success() {
        return Err(parse_error_response(status, &bytes));
    }
    let body: Value = serde_json::from_slice(&bytes)?;
    reject_failure(&body)?;
    Ok(serde_json::from_value(body)?)
}

async fn handle_acknowledgement(response: Response) -> LedgerResult<()> {
    let status = response.status();
    let bytes = response.bytes().await?;

    if !status.is_success() {
        return Err(parse_error_response(status, &bytes));
    }
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(());
    }
    let body: Value = serde_json::from_slice(&bytes)?;
    reject_failure(&body)
}

fn reject_failure(body: &Value) -> LedgerResult<()> {
    let Ok(ack) = serde_json::from_value::<Acknowledgement>(body.clone()) else {
        return Ok(());
    };
    match ack.failure() {
        Some(message) => Err(LedgerError::Rejected {
            message,
            body: body.clone(),
        }),
        None => Ok(()),
    }
}

fn parse_error_response(status: StatusCode, bytes: &[u8]) -> LedgerError {
    let body = serde_json::from_slice::<Value>(bytes).ok();
    let message = body
        .as_ref()
        .and_then(|b| b.get("error").or_else(|| b.get("message")))
        .and_then(Value::as_str)
        .map_or_else(
            || {
                status
                    .canonical_reason()
                    .unwrap_or("Unknown error")
                    .to_string()
            },
            ToString::to_string,
        );

    LedgerError::Api {
        status: status.as_u16(),
        message,
        body,
    }
}
