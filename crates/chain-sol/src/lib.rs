//! Solana primitives for the layered routing client.
//!
//! This crate handles Solana addresses, program derived address search,
//! keypair loading and signing, and manual transaction wire format
//! serialization, all without pulling in `solana-sdk` (which drags in tokio
//! and 200+ transitive dependencies).
//!
//! Instead we implement Solana's compact binary wire format by hand, using
//! `ed25519-dalek` for Ed25519 signing, `curve25519-dalek` for the off-curve
//! check, and `bs58` for Base58 encoding.

pub mod address;
pub mod error;
pub mod keypair;
pub mod pda;
pub mod transaction;

// Re-export key public types for ergonomic imports.
pub use address::{address_to_bytes, bytes_to_address};
pub use error::SolError;
pub use keypair::Keypair;
pub use pda::{create_program_address, find_program_address, is_on_curve};
pub use transaction::{
    compile_transaction, decode_compact_u16, deserialize_message, encode_compact_u16,
    serialize_message, serialize_unsigned, sign_transaction, CompiledInstruction,
    SignedTransaction, SolAccountMeta, SolInstruction, SolTransaction, SYSTEM_PROGRAM_ID,
};
