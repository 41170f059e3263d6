use chain_sol::SolError;
use thiserror::Error;

use crate::ledger::LedgerError;

/// Routing pipeline errors.
#[derive(Debug, Error)]
pub enum MixError {
    #[error("insufficient funds: proxy payer holds {balance} lamports, {required} required")]
    InsufficientFunds { balance: u64, required: u64 },

    #[error("no viable bump seed for intermediate address at layer {layer}")]
    DerivationExhausted { layer: u8 },

    #[error("amount cannot be encoded as u64 lamports: {0}")]
    EncodingOverflow(String),

    #[error("invalid routing request: {0}")]
    InvalidRequest(String),

    #[error("invalid instruction data: {0}")]
    InvalidInstructionData(String),

    #[error("transaction rejected: {reason}")]
    SubmissionRejected {
        reason: String,
        signature: Option<String>,
    },

    #[error(
        "transaction {signature} not confirmed within {waited_ms}ms; \
         query the ledger for it before assuming failure"
    )]
    ConfirmationTimeout { signature: String, waited_ms: u64 },

    #[error("recipient balance changed by {actual} lamports, expected {expected} (transaction {signature})")]
    AmountMismatchOnVerify {
        expected: u64,
        actual: i128,
        signature: String,
    },

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("wire error: {0}")]
    Wire(#[from] SolError),
}

impl MixError {
    /// Whether the caller may try again with a brand-new request (and seed).
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            MixError::InsufficientFunds { .. } | MixError::SubmissionRejected { .. }
        )
    }
}
