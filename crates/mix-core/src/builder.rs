//! Assembly of the routing transaction.

use chain_sol::{
    bytes_to_address, compile_transaction, serialize_unsigned, sign_transaction, Keypair,
    SignedTransaction, SolAccountMeta, SolInstruction, SolTransaction, SYSTEM_PROGRAM_ID,
};
use tracing::debug;

use crate::deriver::derive_all;
use crate::error::MixError;
use crate::instruction::{encode, ROUTING_INSTRUCTION_LEN, TAG_INITIALIZE_WITH_PROXY};
use crate::types::{IntermediateAddress, RoutingRequest};

/// Number of fixed slots ahead of the intermediate accounts.
pub const FIXED_ACCOUNT_SLOTS: usize = 4;

/// The account list the routing program reads positionally:
///
/// | index | account        | signer | writable |
/// |-------|----------------|--------|----------|
/// | 0     | fee payer      | yes    | yes      |
/// | 1     | proxy payer    | yes    | yes      |
/// | 2     | recipient      | no     | yes      |
/// | 3     | system program | no     | no       |
/// | 4..   | hop 0..N-1     | no     | yes      |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingAccounts {
    fee_payer: [u8; 32],
    proxy_payer: [u8; 32],
    recipient: [u8; 32],
    intermediates: Vec<IntermediateAddress>,
}

impl RoutingAccounts {
    /// Hops must be non-empty and arrive in layer order starting at 0.
    pub fn new(
        fee_payer: [u8; 32],
        proxy_payer: [u8; 32],
        recipient: [u8; 32],
        intermediates: Vec<IntermediateAddress>,
    ) -> Result<Self, MixError> {
        if intermediates.is_empty() {
            return Err(MixError::InvalidRequest(
                "at least one intermediate account is required".into(),
            ));
        }
        for (position, hop) in intermediates.iter().enumerate() {
            if hop.layer_index as usize != position {
                return Err(MixError::InvalidRequest(format!(
                    "intermediate at position {position} belongs to layer {}",
                    hop.layer_index
                )));
            }
        }

        Ok(Self {
            fee_payer,
            proxy_payer,
            recipient,
            intermediates,
        })
    }

    pub fn account_count(&self) -> usize {
        FIXED_ACCOUNT_SLOTS + self.intermediates.len()
    }

    pub fn intermediates(&self) -> &[IntermediateAddress] {
        &self.intermediates
    }

    pub fn to_account_metas(&self) -> Vec<SolAccountMeta> {
        let mut metas = Vec::with_capacity(self.account_count());
        metas.push(SolAccountMeta::writable_signer(self.fee_payer));
        metas.push(SolAccountMeta::writable_signer(self.proxy_payer));
        metas.push(SolAccountMeta::writable(self.recipient));
        metas.push(SolAccountMeta::readonly(SYSTEM_PROGRAM_ID));
        metas.extend(
            self.intermediates
                .iter()
                .map(|hop| SolAccountMeta::writable(hop.address)),
        );
        metas
    }
}

/// An unsigned routing transaction plus what went into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltTransaction {
    pub transaction: SolTransaction,
    pub accounts: RoutingAccounts,
    pub instruction_data: [u8; ROUTING_INSTRUCTION_LEN],
}

impl BuiltTransaction {
    /// Wire bytes with zeroed signature slots.
    pub fn unsigned_wire(&self) -> Result<Vec<u8>, MixError> {
        Ok(serialize_unsigned(&self.transaction)?)
    }

    /// Sign with both payers. The built transaction itself is left untouched.
    pub fn sign(
        &self,
        fee_payer: &Keypair,
        proxy_payer: &Keypair,
    ) -> Result<SignedTransaction, MixError> {
        // The same key may fill both roles; pass it once.
        let signers: Vec<&Keypair> = if fee_payer.pubkey() == proxy_payer.pubkey() {
            vec![fee_payer]
        } else {
            vec![fee_payer, proxy_payer]
        };
        Ok(sign_transaction(&self.transaction, &signers)?)
    }
}

/// Builds routing transactions for one deployed routing program.
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    program_id: [u8; 32],
}

impl TransactionBuilder {
    pub fn new(program_id: [u8; 32]) -> Self {
        Self { program_id }
    }

    pub fn program_id(&self) -> &[u8; 32] {
        &self.program_id
    }

    /// Derive hops, encode the payload, and lay out the accounts.
    pub fn build_instruction(
        &self,
        request: &RoutingRequest,
    ) -> Result<(SolInstruction, RoutingAccounts, [u8; ROUTING_INSTRUCTION_LEN]), MixError> {
        request.validate()?;

        let intermediates = derive_all(&self.program_id, request.seed, request.layer_count)?;
        for hop in &intermediates {
            debug!(
                layer = hop.layer_index,
                address = %bytes_to_address(&hop.address),
                bump = hop.bump,
                "derived intermediate address"
            );
        }

        let data = encode(
            TAG_INITIALIZE_WITH_PROXY,
            request.amount,
            request.layer_count,
            request.seed,
        );

        let accounts = RoutingAccounts::new(
            request.fee_payer,
            request.proxy_payer,
            request.recipient,
            intermediates,
        )?;

        let instruction = SolInstruction {
            program_id: self.program_id,
            accounts: accounts.to_account_metas(),
            data: data.to_vec(),
        };

        Ok((instruction, accounts, data))
    }

    /// Build the complete unsigned transaction.
    ///
    /// Identical `request` and `recent_blockhash` always produce a
    /// byte-identical result.
    pub fn build(
        &self,
        request: &RoutingRequest,
        recent_blockhash: &[u8; 32],
    ) -> Result<BuiltTransaction, MixError> {
        let (instruction, accounts, instruction_data) = self.build_instruction(request)?;
        let transaction =
            compile_transaction(&[instruction], &request.fee_payer, recent_blockhash)?;

        debug!(
            layers = request.layer_count,
            accounts = accounts.account_count(),
            keys = transaction.account_keys.len(),
            "built routing transaction"
        );

        Ok(BuiltTransaction {
            transaction,
            accounts,
            instruction_data,
        })
    }
}
