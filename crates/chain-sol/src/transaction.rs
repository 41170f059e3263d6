//! Manual Solana transaction wire format and signing.
//!
//! We build Solana transactions entirely by hand, with no `solana-sdk`
//! dependency. The wire format is a compact binary layout documented here:
//!
//! ```text
//! Transaction:
//!   num_signatures          compact-u16
//!   signatures              64 bytes * num_signatures
//!   message:
//!     num_required_sigs     u8
//!     num_readonly_signed   u8
//!     num_readonly_unsigned u8
//!     num_accounts          compact-u16
//!     account_keys          32 bytes * num_accounts
//!     recent_blockhash      32 bytes
//!     num_instructions      compact-u16
//!     instructions[]        (see below)
//!
//! Instruction:
//!   program_id_index        u8
//!   num_accounts            compact-u16
//!   account_indices         u8 * num_accounts
//!   data_len                compact-u16
//!   data                    u8 * data_len
//! ```

use crate::address::bytes_to_address;
use crate::error::SolError;
use crate::keypair::Keypair;

// ---------------------------------------------------------------------------
// Solana System Program
// ---------------------------------------------------------------------------

/// The Solana System Program public key: 32 zero bytes.
/// Base58: `11111111111111111111111111111111`
pub const SYSTEM_PROGRAM_ID: [u8; 32] = [0u8; 32];

/// Account indices are a single byte on the wire.
const MAX_ACCOUNT_KEYS: usize = 256;

// ---------------------------------------------------------------------------
// Compact-u16 encoding
// ---------------------------------------------------------------------------

/// Encode a `u16` value in Solana's compact-u16 format.
///
/// - Values 0..0x7f       -> 1 byte
/// - Values 0x80..0x3fff  -> 2 bytes
/// - Values 0x4000..      -> 3 bytes (max 0x1_ffff, but u16 caps at 0xffff)
pub fn encode_compact_u16(value: u16) -> Vec<u8> {
    let mut val = value as u32;
    let mut out = Vec::with_capacity(3);

    loop {
        let mut byte = (val & 0x7f) as u8;
        val >>= 7;
        if val > 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if val == 0 {
            break;
        }
    }

    out
}

/// Decode a compact-u16 value from a byte slice.
///
/// Returns `(value, bytes_consumed)` or an error if the data is truncated.
pub fn decode_compact_u16(data: &[u8]) -> Result<(u16, usize), SolError> {
    let mut value: u32 = 0;
    let mut shift = 0u32;
    let mut consumed = 0usize;

    loop {
        let byte = *data.get(consumed).ok_or_else(|| {
            SolError::SerializationError(
                "unexpected end of data while decoding compact-u16".into(),
            )
        })?;
        consumed += 1;

        value |= ((byte & 0x7f) as u32) << shift;
        shift += 7;

        if byte & 0x80 == 0 || consumed >= 3 {
            break;
        }
    }

    if value > u16::MAX as u32 {
        return Err(SolError::SerializationError(
            "compact-u16 value overflow".into(),
        ));
    }

    Ok((value as u16, consumed))
}

// ---------------------------------------------------------------------------
// Data structures
// ---------------------------------------------------------------------------

/// A single account reference in a Solana instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolAccountMeta {
    pub pubkey: [u8; 32],
    pub is_signer: bool,
    pub is_writable: bool,
}

impl SolAccountMeta {
    pub fn writable_signer(pubkey: [u8; 32]) -> Self {
        Self { pubkey, is_signer: true, is_writable: true }
    }

    pub fn writable(pubkey: [u8; 32]) -> Self {
        Self { pubkey, is_signer: false, is_writable: true }
    }

    pub fn readonly(pubkey: [u8; 32]) -> Self {
        Self { pubkey, is_signer: false, is_writable: false }
    }
}

/// A Solana instruction (before it is compiled into a transaction).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolInstruction {
    pub program_id: [u8; 32],
    pub accounts: Vec<SolAccountMeta>,
    pub data: Vec<u8>,
}

/// A compiled, unsigned Solana transaction message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolTransaction {
    /// All account keys referenced by this transaction, in canonical order:
    ///   1. writable signers
    ///   2. read-only signers
    ///   3. writable non-signers
    ///   4. read-only non-signers
    pub account_keys: Vec<[u8; 32]>,

    /// Number of required signatures (first N accounts are signers).
    pub num_required_signatures: u8,
    /// How many of the signing accounts are read-only.
    pub num_readonly_signed: u8,
    /// How many of the non-signing accounts are read-only.
    pub num_readonly_unsigned: u8,

    /// Recent blockhash (32 bytes).
    pub recent_blockhash: [u8; 32],

    /// Compiled instructions (account references replaced with indices).
    pub compiled_instructions: Vec<CompiledInstruction>,
}

/// A compiled instruction where account references are replaced by u8 indices
/// into the transaction's `account_keys` array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledInstruction {
    /// Index into `account_keys` for the program to invoke.
    pub program_id_index: u8,
    /// Indices into `account_keys` for each account the instruction reads/writes.
    pub account_indices: Vec<u8>,
    /// Opaque instruction data.
    pub data: Vec<u8>,
}

/// A fully signed transaction ready for `sendTransaction`.
#[derive(Debug, Clone)]
pub struct SignedTransaction {
    /// Wire bytes: signatures followed by the message.
    pub wire: Vec<u8>,
    /// The fee payer's signature, Base58-encoded. This is the transaction id.
    pub signature: String,
}

// ---------------------------------------------------------------------------
// Transaction building
// ---------------------------------------------------------------------------

/// Build a transaction from a set of instructions with a single fee payer.
///
/// The fee payer is always the first signer and is placed at index 0 in the
/// account keys. Account keys are de-duplicated with their permission bits
/// merged; the per-instruction account order is preserved through the
/// compiled indices.
pub fn compile_transaction(
    instructions: &[SolInstruction],
    fee_payer: &[u8; 32],
    recent_blockhash: &[u8; 32],
) -> Result<SolTransaction, SolError> {
    // Instruction account lists are tiny, a linear scan beats hashing here.
    struct AccountEntry {
        pubkey: [u8; 32],
        is_signer: bool,
        is_writable: bool,
    }

    let mut entries: Vec<AccountEntry> = Vec::new();

    let mut upsert = |pubkey: [u8; 32], signer: bool, writable: bool| {
        if let Some(entry) = entries.iter_mut().find(|e| e.pubkey == pubkey) {
            entry.is_signer |= signer;
            entry.is_writable |= writable;
        } else {
            entries.push(AccountEntry {
                pubkey,
                is_signer: signer,
                is_writable: writable,
            });
        }
    };

    // Fee payer is always signer + writable.
    upsert(*fee_payer, true, true);

    for ix in instructions {
        for meta in &ix.accounts {
            upsert(meta.pubkey, meta.is_signer, meta.is_writable);
        }
        // Program IDs are non-signer, read-only accounts.
        upsert(ix.program_id, false, false);
    }

    if entries.len() > MAX_ACCOUNT_KEYS {
        return Err(SolError::TransactionBuildError(format!(
            "{} account keys exceed the limit of {MAX_ACCOUNT_KEYS}",
            entries.len()
        )));
    }

    // Stable sort: within the same category insertion order is kept, which
    // leaves the fee payer first among writable signers.
    entries.sort_by_key(|e| match (e.is_signer, e.is_writable) {
        (true, true) => 0u8,
        (true, false) => 1,
        (false, true) => 2,
        (false, false) => 3,
    });

    let num_signers = entries.iter().filter(|e| e.is_signer).count() as u8;
    let num_readonly_signed = entries
        .iter()
        .filter(|e| e.is_signer && !e.is_writable)
        .count() as u8;
    let num_readonly_unsigned = entries
        .iter()
        .filter(|e| !e.is_signer && !e.is_writable)
        .count() as u8;

    let account_keys: Vec<[u8; 32]> = entries.iter().map(|e| e.pubkey).collect();

    let index_of = |key: &[u8; 32], what: &str| -> Result<u8, SolError> {
        account_keys
            .iter()
            .position(|k| k == key)
            .map(|i| i as u8)
            .ok_or_else(|| SolError::TransactionBuildError(format!("{what} not in account keys")))
    };

    let mut compiled = Vec::with_capacity(instructions.len());
    for ix in instructions {
        let program_id_index = index_of(&ix.program_id, "program_id")?;
        let account_indices = ix
            .accounts
            .iter()
            .map(|meta| index_of(&meta.pubkey, "account"))
            .collect::<Result<Vec<u8>, _>>()?;

        compiled.push(CompiledInstruction {
            program_id_index,
            account_indices,
            data: ix.data.clone(),
        });
    }

    Ok(SolTransaction {
        account_keys,
        num_required_signatures: num_signers,
        num_readonly_signed,
        num_readonly_unsigned,
        recent_blockhash: *recent_blockhash,
        compiled_instructions: compiled,
    })
}

/// Serialize the transaction message (the bytes that get signed).
pub fn serialize_message(tx: &SolTransaction) -> Result<Vec<u8>, SolError> {
    let mut buf = Vec::with_capacity(256);

    // Header: 3 bytes.
    buf.push(tx.num_required_signatures);
    buf.push(tx.num_readonly_signed);
    buf.push(tx.num_readonly_unsigned);

    buf.extend_from_slice(&encode_compact_u16(compact_len(tx.account_keys.len())?));
    for key in &tx.account_keys {
        buf.extend_from_slice(key);
    }

    buf.extend_from_slice(&tx.recent_blockhash);

    buf.extend_from_slice(&encode_compact_u16(compact_len(
        tx.compiled_instructions.len(),
    )?));
    for ix in &tx.compiled_instructions {
        buf.push(ix.program_id_index);

        buf.extend_from_slice(&encode_compact_u16(compact_len(ix.account_indices.len())?));
        buf.extend_from_slice(&ix.account_indices);

        buf.extend_from_slice(&encode_compact_u16(compact_len(ix.data.len())?));
        buf.extend_from_slice(&ix.data);
    }

    Ok(buf)
}

/// Parse a serialized message back into a [`SolTransaction`].
///
/// Rejects truncated input and trailing bytes.
pub fn deserialize_message(bytes: &[u8]) -> Result<SolTransaction, SolError> {
    let mut reader = Reader { data: bytes, pos: 0 };

    let num_required_signatures = reader.byte()?;
    let num_readonly_signed = reader.byte()?;
    let num_readonly_unsigned = reader.byte()?;

    let num_accounts = reader.compact()?;
    let mut account_keys = Vec::with_capacity(num_accounts);
    for _ in 0..num_accounts {
        account_keys.push(reader.array32()?);
    }

    let recent_blockhash = reader.array32()?;

    let num_instructions = reader.compact()?;
    let mut compiled_instructions = Vec::with_capacity(num_instructions);
    for _ in 0..num_instructions {
        let program_id_index = reader.byte()?;
        let n = reader.compact()?;
        let account_indices = reader.take(n)?.to_vec();
        let n = reader.compact()?;
        let data = reader.take(n)?.to_vec();

        if program_id_index as usize >= account_keys.len()
            || account_indices.iter().any(|&i| i as usize >= account_keys.len())
        {
            return Err(SolError::SerializationError(
                "instruction references an out-of-range account index".into(),
            ));
        }

        compiled_instructions.push(CompiledInstruction {
            program_id_index,
            account_indices,
            data,
        });
    }

    if reader.pos != bytes.len() {
        return Err(SolError::SerializationError(format!(
            "{} trailing bytes after message",
            bytes.len() - reader.pos
        )));
    }

    Ok(SolTransaction {
        account_keys,
        num_required_signatures,
        num_readonly_signed,
        num_readonly_unsigned,
        recent_blockhash,
        compiled_instructions,
    })
}

/// Serialize the transaction with every signature slot zero-filled.
///
/// This is the canonical form of an unsigned transaction, and what two
/// identical builds must agree on byte-for-byte.
pub fn serialize_unsigned(tx: &SolTransaction) -> Result<Vec<u8>, SolError> {
    let message = serialize_message(tx)?;
    let num_sigs = tx.num_required_signatures as usize;

    let mut wire = Vec::with_capacity(3 + 64 * num_sigs + message.len());
    wire.extend_from_slice(&encode_compact_u16(num_sigs as u16));
    wire.resize(wire.len() + 64 * num_sigs, 0);
    wire.extend_from_slice(&message);
    Ok(wire)
}

/// Sign a compiled transaction with every required signer.
///
/// Each signature is written into the slot whose index matches the signer's
/// position in `account_keys`. Every required signer must be supplied, and
/// every supplied keypair must be a required signer.
pub fn sign_transaction(
    tx: &SolTransaction,
    signers: &[&Keypair],
) -> Result<SignedTransaction, SolError> {
    let message_bytes = serialize_message(tx)?;
    let num_sigs = tx.num_required_signatures as usize;
    let required = tx.account_keys.get(..num_sigs).ok_or_else(|| {
        SolError::SigningError("header requires more signers than account keys".into())
    })?;

    for signer in signers {
        if !required.contains(&signer.pubkey()) {
            return Err(SolError::SigningError(format!(
                "{} is not a required signer",
                signer.address()
            )));
        }
    }

    let mut signatures = Vec::with_capacity(num_sigs);
    for key in required {
        let signer = signers
            .iter()
            .find(|s| s.pubkey() == *key)
            .ok_or_else(|| {
                SolError::SigningError(format!("missing signer {}", bytes_to_address(key)))
            })?;
        signatures.push(signer.sign(&message_bytes));
    }

    let mut wire = Vec::with_capacity(3 + 64 * num_sigs + message_bytes.len());
    wire.extend_from_slice(&encode_compact_u16(num_sigs as u16));
    for sig in &signatures {
        wire.extend_from_slice(sig);
    }
    wire.extend_from_slice(&message_bytes);

    let signature = signatures
        .first()
        .map(|s| bs58::encode(s).into_string())
        .ok_or_else(|| SolError::SigningError("transaction has zero signers".into()))?;

    Ok(SignedTransaction { wire, signature })
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn compact_len(len: usize) -> Result<u16, SolError> {
    u16::try_from(len)
        .map_err(|_| SolError::SerializationError(format!("length {len} exceeds compact-u16")))
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], SolError> {
        let end = self.pos.checked_add(n).filter(|&end| end <= self.data.len());
        let end = end.ok_or_else(|| {
            SolError::SerializationError("unexpected end of message".into())
        })?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn byte(&mut self) -> Result<u8, SolError> {
        Ok(self.take(1)?[0])
    }

    fn array32(&mut self) -> Result<[u8; 32], SolError> {
        let mut out = [0u8; 32];
        out.copy_from_slice(self.take(32)?);
        Ok(out)
    }

    fn compact(&mut self) -> Result<usize, SolError> {
        let (value, consumed) = decode_compact_u16(&self.data[self.pos..])?;
        self.pos += consumed;
        Ok(value as usize)
    }
}
