//! Layered proxy routing.
//!
//! Routes lamports from a proxy payer to a recipient through a chain of
//! program derived "hop" accounts, all inside one transaction:
//!
//! - [`deriver`]: per-layer hop addresses from a random seed
//! - [`instruction`]: the 18-byte routing instruction
//! - [`builder`]: the positional account list and the unsigned transaction
//! - [`orchestrator`]: balance check, submission, confirmation, verification
//!
//! The ledger is reached only through the [`ledger::LedgerClient`] trait.

pub mod builder;
pub mod deriver;
pub mod error;
pub mod instruction;
pub mod ledger;
pub mod orchestrator;
pub mod types;

pub use builder::{BuiltTransaction, RoutingAccounts, TransactionBuilder};
pub use deriver::{derive_all, derive_intermediate, signer_seeds, INTERMEDIATE_SEED_TAG};
pub use error::MixError;
pub use instruction::{encode, lamports_from_sol, RoutingInstruction, LAMPORTS_PER_SOL};
pub use ledger::{Commitment, LedgerClient, LedgerError, SignatureStatus, SubmitOptions};
pub use orchestrator::{
    ExecutionFailure, ExecutionOptions, ExecutionOrchestrator, ExecutionState, Observations,
};
pub use types::{IntermediateAddress, RoutingRequest, TransactionReceipt, MAX_ROUTING_LAYERS};
