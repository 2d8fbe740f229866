//! Completion records read from the Learn2Earn contract.

use std::collections::HashSet;

use learn2earn_chain::{ContractReader, Learn2EarnContract, ThorClient};
use learn2earn_course::Config;
use tracing::{debug, warn};

/// Node client for the configured `contract.nodeUrl`.
pub fn node(config: &Config) -> ThorClient {
    ThorClient::new(config.contract.node_url.as_str())
}

/// Course ids `wallet` has completed on chain.
///
/// A failed read is logged and treated as no completions.
pub async fn completed_courses<R>(reader: &R, config: &Config, wallet: &str) -> HashSet<String>
where
    R: ContractReader + ?Sized,
{
    match read_completed(reader, config, wallet).await {
        Ok(ids) => {
            debug!(wallet, count = ids.len(), "Read completed courses");
            ids.into_iter().collect()
        }
        Err(e) => {
            warn!(wallet, error = %e, "Failed to read completed courses");
            HashSet::new()
        }
    }
}

async fn read_completed<R>(reader: &R, config: &Config, wallet: &str) -> learn2earn_chain::Result<Vec<String>>
where
    R: ContractReader + ?Sized,
{
    let contract = Learn2EarnContract::new(&config.contract.address)?;
    contract.completed_courses(reader, wallet).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use async_trait::async_trait;
    use learn2earn_chain::{ChainError, Clause};

    use super::*;

    const WALLET: &str = "0x7567d83b7b8d80addcb281a71d54fc7b3364ffed";

    /// Answers `getCompletedCourses` with a fixed list.
    struct CompletedReader(Vec<&'static str>);

    #[async_trait]
    impl ContractReader for CompletedReader {
        async fn call(&self, _clause: &Clause) -> learn2earn_chain::Result<Vec<u8>> {
            let mut out = word(32);
            out.extend(word(self.0.len()));
            let mut tails = Vec::new();
            for id in &self.0 {
                out.extend(word(self.0.len() * 32 + tails.len()));
                tails.extend(word(id.len()));
                let mut text = id.as_bytes().to_vec();
                text.resize(id.len().div_ceil(32) * 32, 0);
                tails.extend(text);
            }
            out.extend(tails);
            Ok(out)
        }
    }

    /// Node that is never reachable.
    struct OfflineReader;

    #[async_trait]
    impl ContractReader for OfflineReader {
        async fn call(&self, _clause: &Clause) -> learn2earn_chain::Result<Vec<u8>> {
            Err(ChainError::Provider("connection refused".to_string()))
        }
    }

    fn word(n: usize) -> Vec<u8> {
        let mut w = vec![0u8; 32];
        w[24..].copy_from_slice(&(n as u64).to_be_bytes());
        w
    }

    #[test]
    fn test_node_uses_configured_url() {
        let mut config = Config::default();
        config.contract.node_url = "http://localhost:8669/".to_string();
        assert_eq!(node(&config).node_url(), "http://localhost:8669");
    }

    #[tokio::test]
    async fn test_completed_courses_from_contract() {
        let reader = CompletedReader(vec!["python-basics", "smart-contract-dev"]);
        let done = completed_courses(&reader, &Config::default(), WALLET).await;
        assert_eq!(done.len(), 2);
        assert!(done.contains("python-basics"));
        assert!(done.contains("smart-contract-dev"));
    }

    // --- Failures

    #[tokio::test]
    async fn test_offline_node_reads_as_nothing_completed() {
        let done = completed_courses(&OfflineReader, &Config::default(), WALLET).await;
        assert!(done.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_wallet_reads_as_nothing_completed() {
        let reader = CompletedReader(vec!["python-basics"]);
        let done = completed_courses(&reader, &Config::default(), "bob").await;
        assert!(done.is_empty());
    }
}
