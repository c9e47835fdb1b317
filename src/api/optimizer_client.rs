//! Client for the external mean-variance optimizer.
//!
//! Thin request/response boundary: no optimization happens here and no
//! weights are ever invented. Any transport failure, non-2xx status or
//! undecodable body is returned as an [`OptimizerError`]. Dropping the
//! returned future cancels the call with nothing left half-updated.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::{PersonalizedCandidate, Policy};

use super::types::{OptimizerRequest, OptimizerResponse, TargetWeights};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const OPTIMIZE_PATH: &str = "/optimize";

#[derive(Debug, Error)]
pub enum OptimizerError {
    #[error("failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),

    #[error("optimizer request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("optimizer returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("failed to decode optimizer response: {0}")]
    Decode(#[source] reqwest::Error),
}

/// HTTP client for the optimizer service.
pub struct OptimizerClient {
    client: Client,
    base_url: String,
}

impl OptimizerClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, OptimizerError> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self, OptimizerError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(OptimizerError::Build)?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Request target weights for the ranked list under the policy constraints.
    pub async fn optimize(
        &self,
        ranked: &[PersonalizedCandidate],
        policy: &Policy,
        prev_weights: &BTreeMap<String, f64>,
    ) -> Result<TargetWeights, OptimizerError> {
        let request = OptimizerRequest::new(ranked, policy, prev_weights);
        self.send(&request).await
    }

    /// Send a prepared request.
    pub async fn send(&self, request: &OptimizerRequest) -> Result<TargetWeights, OptimizerError> {
        let url = format!("{}{}", self.base_url, OPTIMIZE_PATH);
        let request_id = Uuid::new_v4().to_string();

        debug!(
            url = %url,
            request_id = %request_id,
            tickers = request.tickers.len(),
            "Requesting optimizer weights"
        );

        let response = self
            .client
            .post(&url)
            .header("X-Request-Id", &request_id)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                warn!(request_id = %request_id, error = %e, "Optimizer unreachable");
                OptimizerError::Transport(e)
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(request_id = %request_id, status = %status, "Optimizer rejected request");
            return Err(OptimizerError::Status { status, body });
        }

        let parsed: OptimizerResponse = response.json().await.map_err(OptimizerError::Decode)?;
        let weights = TargetWeights::from(parsed);

        debug!(
            request_id = %request_id,
            names = weights.weights.len(),
            total_weight = weights.total(),
            portfolio_vol = weights.portfolio_vol,
            "Optimizer weights received"
        );

        Ok(weights)
    }
}
