//! Beacon API Mock Builder
//!
//! Wraps mockito to serve Beacon API envelopes for the endpoints the client uses.

use mockito::{Mock, Server, ServerGuard};
use serde_json::{json, Value};

/// Builder for creating mock beacon node responses.
///
/// Uses mockito internally but provides Beacon API specific helpers.
pub struct BeaconMockBuilder {
    server: ServerGuard,
    mocks: Vec<Mock>,
}

impl BeaconMockBuilder {
    /// Creates a new beacon mock builder with a fresh mockito server.
    pub async fn new() -> Self {
        Self { server: Server::new_async().await, mocks: Vec::new() }
    }

    /// Returns the URL of the mock server.
    #[must_use]
    pub fn url(&self) -> String {
        self.server.url()
    }

    /// Mocks `GET /eth/v1/config/spec`, expecting exactly `hits` requests.
    pub fn mock_spec(&mut self, spec: &Value, hits: usize) -> &mut Self {
        let mock = self
            .server
            .mock("GET", "/eth/v1/config/spec")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({ "data": spec }).to_string())
            .expect(hits)
            .create();

        self.mocks.push(mock);
        self
    }

    /// Mocks `GET /eth/v1/beacon/states/{state}/pending_partial_withdrawals`.
    pub fn mock_pending_partial_withdrawals(
        &mut self,
        state: &str,
        withdrawals: &[Value],
        version: &str,
    ) -> &mut Self {
        let path = format!("/eth/v1/beacon/states/{state}/pending_partial_withdrawals");
        self.mock_state_list(&path, withdrawals, version)
    }

    /// Mocks `GET /eth/v1/beacon/states/{state}/pending_consolidations`.
    pub fn mock_pending_consolidations(
        &mut self,
        state: &str,
        consolidations: &[Value],
        version: &str,
    ) -> &mut Self {
        let path = format!("/eth/v1/beacon/states/{state}/pending_consolidations");
        self.mock_state_list(&path, consolidations, version)
    }

    fn mock_state_list(&mut self, path: &str, items: &[Value], version: &str) -> &mut Self {
        let mock = self
            .server
            .mock("GET", path)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_header("Eth-Consensus-Version", version)
            .with_body(
                json!({
                    "version": version,
                    "execution_optimistic": false,
                    "finalized": true,
                    "data": items
                })
                .to_string(),
            )
            .create();

        self.mocks.push(mock);
        self
    }

    /// Mocks a Beacon API error (`{"code", "message"}`) for `GET path`.
    pub fn mock_error(&mut self, path: &str, status: usize, message: &str) -> &mut Self {
        let mock = self
            .server
            .mock("GET", path)
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(json!({ "code": status, "message": message }).to_string())
            .create();

        self.mocks.push(mock);
        self
    }

    /// Mocks `GET /eth/v1/node/health` with the given status (200 ready, 206 syncing).
    pub fn mock_health(&mut self, status: usize) -> &mut Self {
        let mock = self.server.mock("GET", "/eth/v1/node/health").with_status(status).create();

        self.mocks.push(mock);
        self
    }

    /// Asserts every mock received its expected number of requests.
    pub async fn assert_all(&self) {
        for mock in &self.mocks {
            mock.assert_async().await;
        }
    }
}
