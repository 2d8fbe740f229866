//! In-memory signer.
//!
//! [`RecordingSigner`] never broadcasts anything. It keeps every request it
//! accepts and hands out deterministic transaction ids, or rejects every
//! request when built with [`RecordingSigner::rejecting`].

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::info;

use crate::abi::keccak256;
use crate::{ChainError, Clause, Result, TransactionSigner, TxReceipt};

/// A request accepted by a [`RecordingSigner`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignedTransaction {
    /// Signing account.
    pub signer: String,
    /// Comment shown to the wallet holder.
    pub comment: String,
    /// Signed clauses.
    pub clauses: Vec<Clause>,
    /// Transaction id handed back.
    pub txid: String,
}

/// Signer that records requests instead of broadcasting them.
#[derive(Debug, Default)]
pub struct RecordingSigner {
    signed: Mutex<Vec<SignedTransaction>>,
    rejection: Option<String>,
}

impl RecordingSigner {
    /// Creates a signer that accepts every request.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a signer that rejects every request with `reason`.
    #[must_use]
    pub fn rejecting(reason: impl Into<String>) -> Self {
        Self {
            signed: Mutex::default(),
            rejection: Some(reason.into()),
        }
    }

    /// Requests accepted so far.
    pub fn signed(&self) -> Vec<SignedTransaction> {
        self.signed.lock().clone()
    }
}

#[async_trait]
impl TransactionSigner for RecordingSigner {
    async fn sign(&self, clauses: &[Clause], signer: &str, comment: &str) -> Result<TxReceipt> {
        if let Some(reason) = &self.rejection {
            return Err(ChainError::UserRejected(reason.clone()));
        }

        let mut signed = self.signed.lock();
        let mut preimage = format!("{signer}|{comment}|{}", signed.len());
        for clause in clauses {
            preimage.push_str(&clause.data);
        }
        let txid = format!("0x{}", hex::encode(keccak256(preimage.as_bytes())));

        info!(signer, clauses = clauses.len(), %txid, "Recorded transaction");
        signed.push(SignedTransaction {
            signer: signer.to_string(),
            comment: comment.to_string(),
            clauses: clauses.to_vec(),
            txid: txid.clone(),
        });
        Ok(TxReceipt { txid })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn clause() -> Clause {
        Clause::new("0xabc", &[1, 2, 3])
    }

    #[test]
    fn test_records_signed_clauses() {
        let signer = RecordingSigner::new();
        let receipt = tokio_test::block_on(signer.sign(&[clause()], "0xme", "hello")).unwrap();

        let signed = signer.signed();
        assert_eq!(signed.len(), 1);
        assert_eq!(signed[0].comment, "hello");
        assert_eq!(signed[0].txid, receipt.txid);
        assert!(receipt.txid.starts_with("0x"));
        assert_eq!(receipt.txid.len(), 66);
    }

    #[test]
    fn test_txids_differ_per_request() {
        let signer = RecordingSigner::new();
        let first = tokio_test::block_on(signer.sign(&[clause()], "0xme", "x")).unwrap();
        let second = tokio_test::block_on(signer.sign(&[clause()], "0xme", "x")).unwrap();
        assert_ne!(first.txid, second.txid);
    }

    #[test]
    fn test_rejecting_signer_records_nothing() {
        let signer = RecordingSigner::rejecting("user closed the wallet");
        let err = tokio_test::block_on(signer.sign(&[clause()], "0xme", "x")).unwrap_err();
        assert!(err.is_user_rejection());
        assert!(signer.signed().is_empty());
    }
}
