//! Contract reads through a Thor node's REST API.
//!
//! Read-only clauses are executed with `POST {node}/accounts/*`, which runs
//! them against the best block without creating a transaction.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::{ChainError, Clause, ContractReader, Result};

/// Public test network node.
pub const DEFAULT_NODE_URL: &str = "https://testnet.vechain.org";

/// Result of one clause in an `/accounts/*` response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CallResult {
    data: String,
    #[serde(default)]
    reverted: bool,
    #[serde(default)]
    vm_error: String,
}

/// [`ContractReader`] backed by a Thor node.
///
/// # Example
///
/// ```no_run
/// use learn2earn_chain::{Learn2EarnContract, ThorClient};
///
/// # async fn example() -> learn2earn_chain::Result<()> {
/// let node = ThorClient::new("https://testnet.vechain.org");
/// let contract = Learn2EarnContract::default();
/// let courses = contract
///     .completed_courses(&node, "0x00000000000000000000000000000000000000aa")
///     .await?;
/// println!("{courses:?}");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ThorClient {
    http: reqwest::Client,
    node_url: String,
}

impl ThorClient {
    /// Creates a client for the node at `node_url`.
    #[must_use]
    pub fn new(node_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            node_url: node_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Node base URL.
    #[must_use]
    pub fn node_url(&self) -> &str {
        &self.node_url
    }
}

impl Default for ThorClient {
    fn default() -> Self {
        Self::new(DEFAULT_NODE_URL)
    }
}

#[async_trait]
impl ContractReader for ThorClient {
    #[instrument(skip(self, clause), fields(to = %clause.to))]
    async fn call(&self, clause: &Clause) -> Result<Vec<u8>> {
        let url = format!("{}/accounts/*", self.node_url);
        let response = self
            .http
            .post(&url)
            .json(&serde_json::json!({ "clauses": [clause] }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, "Node rejected contract call");
            return Err(ChainError::Provider(format!("node returned {status}: {body}")));
        }

        let results: Vec<CallResult> = response.json().await?;
        debug!(results = results.len(), "Contract call executed");
        first_output(results)
    }
}

fn first_output(results: Vec<CallResult>) -> Result<Vec<u8>> {
    let result = results
        .into_iter()
        .next()
        .ok_or_else(|| ChainError::Provider("node returned no call results".to_string()))?;
    if result.reverted {
        let reason = if result.vm_error.is_empty() {
            "reverted".to_string()
        } else {
            result.vm_error
        };
        return Err(ChainError::Reverted(reason));
    }
    let digits = result.data.strip_prefix("0x").unwrap_or(&result.data);
    hex::decode(digits).map_err(|e| ChainError::Decode(format!("invalid hex output: {e}")))
}
