//! Learn2Earn ledger collaborators.
//!
//! The course flow never implements contract logic. It encodes calls against
//! the Learn2Earn contract ABI, hands write clauses to a [`TransactionSigner`]
//! and sends read clauses to a [`ContractReader`].
//!
//! This crate provides:
//! - ABI descriptors with call encoding and output decoding ([`abi`])
//! - The Learn2Earn contract table and typed helpers ([`contract`])
//! - A reader backed by a Thor node's REST API ([`thor`])
//! - An in-memory signer that records what it was asked to sign ([`recording`])

pub mod abi;
pub mod contract;
pub mod recording;
pub mod thor;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use abi::{AbiFunction, AbiParam, AbiType, AbiValue, Mutability};
pub use contract::{Learn2EarnContract, Profile, ProfileUpdate, Referral, StudentRecord, LEARN2EARN_ABI};
pub use recording::{RecordingSigner, SignedTransaction};
pub use thor::ThorClient;

/// A specialized `Result` type for ledger operations.
pub type Result<T> = std::result::Result<T, ChainError>;

/// Errors that can occur while talking to the ledger collaborators.
#[derive(Debug, Error)]
pub enum ChainError {
    /// Address is not a 20-byte `0x` hex string.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Arguments do not match the function's inputs.
    #[error("failed to encode call: {0}")]
    Encode(String),

    /// Returned data does not match the function's outputs.
    #[error("failed to decode result: {0}")]
    Decode(String),

    /// Function is not part of the contract ABI.
    #[error("unknown contract function: {0}")]
    UnknownFunction(String),

    /// The wallet holder declined to sign.
    #[error("transaction rejected by user: {0}")]
    UserRejected(String),

    /// The wallet or node failed.
    #[error("provider error: {0}")]
    Provider(String),

    /// The contract reverted the call.
    #[error("contract call reverted: {0}")]
    Reverted(String),

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl ChainError {
    /// Returns `true` if the wallet holder declined the request.
    #[must_use]
    pub const fn is_user_rejection(&self) -> bool {
        matches!(self, Self::UserRejected(_))
    }
}

/// One encoded contract call, ready to be signed or executed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clause {
    /// Contract address.
    pub to: String,
    /// Amount sent with the call, as a `0x` hex quantity.
    pub value: String,
    /// Selector and encoded arguments, as `0x` hex.
    pub data: String,
}

impl Clause {
    /// Creates a clause that sends no value.
    #[must_use]
    pub fn new(to: impl Into<String>, data: &[u8]) -> Self {
        Self {
            to: to.into(),
            value: "0x0".to_string(),
            data: format!("0x{}", hex::encode(data)),
        }
    }
}

/// Result of a signed and broadcast transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    /// Transaction id.
    pub txid: String,
}

/// Wallet that signs and broadcasts transactions.
#[async_trait]
pub trait TransactionSigner: Send + Sync {
    /// Signs `clauses` as `signer` and returns the transaction id.
    ///
    /// Fails with [`ChainError::UserRejected`] when the holder declines and
    /// [`ChainError::Provider`] when the wallet itself fails.
    async fn sign(&self, clauses: &[Clause], signer: &str, comment: &str) -> Result<TxReceipt>;
}

/// Executes read-only contract calls.
#[async_trait]
pub trait ContractReader: Send + Sync {
    /// Runs `clause` without a transaction and returns the raw output bytes.
    async fn call(&self, clause: &Clause) -> Result<Vec<u8>>;
}
