//! Mock HTTP server for connector tests.
//!
//! Thin wrapper around wiremock for the request shapes the relay's
//! downstream systems use: bearer-authenticated JSON, form posts and
//! query-string tokens.

use std::time::Duration;

use serde_json::Value;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A mock downstream API.
pub struct MockApiServer {
    server: MockServer,
}

fn json_response(status: u16, body: Value) -> ResponseTemplate {
    ResponseTemplate::new(status)
        .set_body_json(body)
        .insert_header("content-type", "application/json")
}

impl MockApiServer {
    /// Start a new mock server.
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Base URL to point a client at.
    #[must_use]
    pub fn base_url(&self) -> String {
        self.server.uri()
    }

    /// The underlying wiremock server for advanced configuration.
    #[must_use]
    pub const fn inner(&self) -> &MockServer {
        &self.server
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Response Setup
    // ─────────────────────────────────────────────────────────────────────────────

    /// Respond to `verb request_path` with a 200 JSON body.
    pub async fn expect(&self, verb: &str, request_path: &str, response: Value) {
        Mock::given(method(verb))
            .and(path(request_path))
            .respond_with(json_response(200, response))
            .mount(&self.server)
            .await;
    }

    /// Respond to a GET with JSON.
    pub async fn expect_get(&self, request_path: &str, response: Value) {
        self.expect("GET", request_path, response).await;
    }

    /// Respond to a POST with JSON.
    pub async fn expect_post(&self, request_path: &str, response: Value) {
        self.expect("POST", request_path, response).await;
    }

    /// Respond to a PATCH with JSON.
    pub async fn expect_patch(&self, request_path: &str, response: Value) {
        self.expect("PATCH", request_path, response).await;
    }

    /// Respond to any request on the path with an error status.
    pub async fn expect_error(&self, request_path: &str, status: u16, error_body: Value) {
        Mock::given(path(request_path))
            .respond_with(json_response(status, error_body))
            .mount(&self.server)
            .await;
    }

    /// Respond after a delay.
    pub async fn expect_delayed(&self, request_path: &str, delay: Duration, response: Value) {
        Mock::given(path(request_path))
            .respond_with(json_response(200, response).set_delay(delay))
            .mount(&self.server)
            .await;
    }

    /// Respond only when a header matches.
    pub async fn expect_with_header(
        &self,
        request_path: &str,
        header_name: &str,
        header_value: &str,
        response: Value,
    ) {
        Mock::given(path(request_path))
            .and(header(header_name, header_value))
            .respond_with(json_response(200, response))
            .mount(&self.server)
            .await;
    }

    /// Respond only when a query parameter matches.
    pub async fn expect_with_query(
        &self,
        request_path: &str,
        param_name: &str,
        param_value: &str,
        response: Value,
    ) {
        Mock::given(path(request_path))
            .and(query_param(param_name, param_value))
            .respond_with(json_response(200, response))
            .mount(&self.server)
            .await;
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Verification
    // ─────────────────────────────────────────────────────────────────────────────

    /// All requests received so far.
    pub async fn received_requests(&self) -> Vec<wiremock::Request> {
        self.server.received_requests().await.unwrap_or_default()
    }

    /// Assert the total number of requests received.
    ///
    /// # Panics
    ///
    /// Panics if the count doesn't match.
    pub async fn assert_request_count(&self, expected: usize) {
        let received = self.received_requests().await;
        assert_eq!(
            received.len(),
            expected,
            "Expected {} requests but received {}",
            expected,
            received.len()
        );
    }

    /// Assert at least one request hit `request_path`.
    ///
    /// # Panics
    ///
    /// Panics if no matching request was found.
    pub async fn assert_received(&self, request_path: &str) {
        let received = self.received_requests().await;
        assert!(
            received.iter().any(|r| r.url.path() == request_path),
            "No request received to path '{}'. Received: {:?}",
            request_path,
            received.iter().map(|r| r.url.path()).collect::<Vec<_>>()
        );
    }

    /// Assert no requests were received.
    ///
    /// # Panics
    ///
    /// Panics if any requests were received.
    pub async fn assert_no_requests(&self) {
        self.assert_request_count(0).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_server_get_with_query() {
        let mock = MockApiServer::start().await;
        mock.expect_with_query("/api/jobs/HH-900", "api_token", "t0k", serde_json::json!({"ok": true}))
            .await;

        let response = reqwest::Client::new()
            .get(format!("{}/api/jobs/HH-900?api_token=t0k", mock.base_url()))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 200);
        mock.assert_received("/api/jobs/HH-900").await;
        mock.assert_request_count(1).await;
    }

    #[tokio::test]
    async fn test_mock_server_error() {
        let mock = MockApiServer::start().await;
        mock.expect_error("/api/fail", 503, serde_json::json!({"error": "down"}))
            .await;

        let response = reqwest::Client::new()
            .patch(format!("{}/api/fail", mock.base_url()))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 503);
    }
}
