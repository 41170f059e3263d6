//! The narrow ledger interface the orchestrator consumes.
//!
//! Anything that can answer balance queries, hand out a recent blockhash,
//! accept a signed wire transaction, and report its confirmation status can
//! drive a routing request. `mix-rpc` provides the HTTP JSON-RPC
//! implementation; tests use in-memory ones.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Ledger confirmation depth. Ordered from fastest to most certain.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    Processed,
    #[default]
    Confirmed,
    Finalized,
}

impl Commitment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Commitment::Processed => "processed",
            Commitment::Confirmed => "confirmed",
            Commitment::Finalized => "finalized",
        }
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Commitment {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "processed" => Ok(Commitment::Processed),
            "confirmed" => Ok(Commitment::Confirmed),
            "finalized" => Ok(Commitment::Finalized),
            other => Err(LedgerError::InvalidResponse(format!(
                "unknown commitment level: {other}"
            ))),
        }
    }
}

/// Options passed along with a transaction submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitOptions {
    pub preflight_commitment: Commitment,
    pub skip_preflight: bool,
}

/// Confirmation state of a submitted transaction as reported by the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureStatus {
    pub slot: u64,
    /// `None` when the node has seen the transaction but not yet voted on it.
    pub confirmation: Option<Commitment>,
    /// Set when the transaction landed but its execution failed.
    pub err: Option<String>,
}

impl SignatureStatus {
    /// Whether this status is at least as deep as `target`.
    pub fn reached(&self, target: Commitment) -> bool {
        self.confirmation.is_some_and(|level| level >= target)
    }
}

/// Errors returned by a [`LedgerClient`].
#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// The node refused the transaction, typically during preflight simulation.
    #[error("transaction rejected by node: {0}")]
    Rejected(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Ledger RPC surface needed by the routing pipeline.
///
/// Implementations must tolerate concurrent calls from independent requests.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Lamport balance of `address` at the given commitment.
    async fn get_balance(
        &self,
        address: &[u8; 32],
        commitment: Commitment,
    ) -> Result<u64, LedgerError>;

    /// A recent blockhash to anchor a new transaction.
    async fn latest_blockhash(&self, commitment: Commitment) -> Result<[u8; 32], LedgerError>;

    /// Submit a signed wire transaction. Returns the transaction signature.
    async fn send_transaction(
        &self,
        wire: &[u8],
        options: &SubmitOptions,
    ) -> Result<String, LedgerError>;

    /// Current status of `signature`, or `None` if the ledger has not seen it.
    async fn signature_status(
        &self,
        signature: &str,
    ) -> Result<Option<SignatureStatus>, LedgerError>;
}
