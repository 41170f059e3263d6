//! Routing instruction wire layout.
//!
//! ```text
//! offset  size  field
//!      0     1  tag          (0 = initialize routing with proxy payer)
//!      1     8  amount       u64 LE, lamports
//!      9     1  layer_count  u8
//!     10     8  seed         u64 LE
//! ```
//!
//! The layout for a given tag never changes. A new field means a new tag.

use crate::error::MixError;

/// Tag of the only routing operation.
pub const TAG_INITIALIZE_WITH_PROXY: u8 = 0;

/// Encoded size of a tag-0 instruction.
pub const ROUTING_INSTRUCTION_LEN: usize = 18;

pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// Serialize routing parameters into the fixed 18-byte layout.
pub fn encode(tag: u8, amount: u64, layer_count: u8, seed: u64) -> [u8; ROUTING_INSTRUCTION_LEN] {
    let mut data = [0u8; ROUTING_INSTRUCTION_LEN];
    data[0] = tag;
    data[1..9].copy_from_slice(&amount.to_le_bytes());
    data[9] = layer_count;
    data[10..18].copy_from_slice(&seed.to_le_bytes());
    data
}

/// Instructions understood by the routing program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingInstruction {
    InitializeWithProxy {
        amount: u64,
        layer_count: u8,
        seed: u64,
    },
}

impl RoutingInstruction {
    pub fn tag(&self) -> u8 {
        match self {
            RoutingInstruction::InitializeWithProxy { .. } => TAG_INITIALIZE_WITH_PROXY,
        }
    }

    pub fn pack(&self) -> [u8; ROUTING_INSTRUCTION_LEN] {
        match *self {
            RoutingInstruction::InitializeWithProxy {
                amount,
                layer_count,
                seed,
            } => encode(self.tag(), amount, layer_count, seed),
        }
    }

    /// Decode instruction data exactly as the routing program does.
    pub fn unpack(data: &[u8]) -> Result<Self, MixError> {
        let (&tag, rest) = data
            .split_first()
            .ok_or_else(|| MixError::InvalidInstructionData("empty instruction data".into()))?;

        match tag {
            TAG_INITIALIZE_WITH_PROXY => {
                if data.len() != ROUTING_INSTRUCTION_LEN {
                    return Err(MixError::InvalidInstructionData(format!(
                        "expected {ROUTING_INSTRUCTION_LEN} bytes, got {}",
                        data.len()
                    )));
                }
                let amount = u64::from_le_bytes(le_array(&rest[0..8]));
                let layer_count = rest[8];
                let seed = u64::from_le_bytes(le_array(&rest[9..17]));
                Ok(RoutingInstruction::InitializeWithProxy {
                    amount,
                    layer_count,
                    seed,
                })
            }
            other => Err(MixError::InvalidInstructionData(format!(
                "unknown instruction tag {other}"
            ))),
        }
    }
}

/// Convert a SOL amount to lamports, refusing anything that does not fit a
/// u64 exactly.
///
/// Amounts typed by humans arrive as floating point. This is the boundary
/// where they must become a u64.
pub fn lamports_from_sol(sol: f64) -> Result<u64, MixError> {
    if !sol.is_finite() {
        return Err(MixError::EncodingOverflow(format!("{sol} is not a finite amount")));
    }
    if sol < 0.0 {
        return Err(MixError::EncodingOverflow(format!("{sol} is negative")));
    }

    let lamports = (sol * LAMPORTS_PER_SOL as f64).round();
    // u64::MAX as f64 rounds up to 2^64, which is itself out of range.
    if lamports >= u64::MAX as f64 {
        return Err(MixError::EncodingOverflow(format!(
            "{sol} SOL exceeds the u64 lamport range"
        )));
    }

    Ok(lamports as u64)
}

fn le_array(bytes: &[u8]) -> [u8; 8] {
    let mut out = [0u8; 8];
    out.copy_from_slice(bytes);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_vector() {
        // 0.1 SOL, 4 layers, seed 42.
        let data = encode(0, 100_000_000, 4, 42);
        assert_eq!(
            data,
            [
                0x00, 0x00, 0xE1, 0xF5, 0x05, 0x00, 0x00, 0x00, 0x00, 0x04, 0x2A, 0x00, 0x00,
                0x00, 0x00, 0x00, 0x00, 0x00,
            ]
        );
    }

    #[test]
    fn unpack_recovers_fields() {
        let ix = RoutingInstruction::InitializeWithProxy {
            amount: u64::MAX,
            layer_count: 3,
            seed: 0xDEAD_BEEF_CAFE_F00D,
        };
        assert_eq!(RoutingInstruction::unpack(&ix.pack()).unwrap(), ix);
    }

    #[test]
    fn pack_matches_free_encoder() {
        let ix = RoutingInstruction::InitializeWithProxy {
            amount: 5,
            layer_count: 1,
            seed: 9,
        };
        assert_eq!(ix.pack(), encode(TAG_INITIALIZE_WITH_PROXY, 5, 1, 9));
    }

    #[test]
    fn unpack_rejects_empty() {
        assert!(RoutingInstruction::unpack(&[]).is_err());
    }

    #[test]
    fn unpack_rejects_wrong_length() {
        let data = encode(0, 1, 1, 1);
        assert!(RoutingInstruction::unpack(&data[..17]).is_err());

        let mut long = data.to_vec();
        long.push(0);
        assert!(RoutingInstruction::unpack(&long).is_err());
    }

    #[test]
    fn unpack_rejects_unknown_tag() {
        let data = encode(1, 1, 1, 1);
        let err = RoutingInstruction::unpack(&data).unwrap_err();
        assert!(err.to_string().contains("unknown instruction tag 1"));
    }

    #[test]
    fn lamports_from_sol_converts() {
        assert_eq!(lamports_from_sol(0.1).unwrap(), 100_000_000);
        assert_eq!(lamports_from_sol(1.0).unwrap(), LAMPORTS_PER_SOL);
        assert_eq!(lamports_from_sol(0.0).unwrap(), 0);
    }

    #[test]
    fn lamports_from_sol_rejects_out_of_range() {
        for bad in [-0.5, f64::NAN, f64::INFINITY, 1e11] {
            assert!(
                matches!(lamports_from_sol(bad), Err(MixError::EncodingOverflow(_))),
                "{bad} must overflow"
            );
        }
    }
}
