use thiserror::Error;

/// Solana primitive errors: keys, addresses, PDAs, and the wire format.
#[derive(Debug, Error)]
pub enum SolError {
    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("no viable bump seed for program derived address")]
    BumpSeedNotFound,

    #[error("transaction build error: {0}")]
    TransactionBuildError(String),

    #[error("signing error: {0}")]
    SigningError(String),

    #[error("serialization error: {0}")]
    SerializationError(String),

    #[error("keypair file error: {0}")]
    KeypairFile(String),
}
