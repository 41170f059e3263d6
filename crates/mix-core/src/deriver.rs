//! Intermediate hop addresses.
//!
//! Each hop is a program derived address with seeds
//! `["mix_intermediate", seed as u64 LE, layer as u8]` under the routing
//! program. The program re-derives the same addresses to verify the account
//! list and signs for them with [`signer_seeds`].

use chain_sol::{find_program_address, SolError};

use crate::error::MixError;
use crate::types::IntermediateAddress;

/// Domain separation tag for intermediate hop addresses.
pub const INTERMEDIATE_SEED_TAG: &[u8] = b"mix_intermediate";

/// Derive the hop address for one layer.
pub fn derive_intermediate(
    program_id: &[u8; 32],
    seed: u64,
    layer: u8,
) -> Result<IntermediateAddress, MixError> {
    let seed_bytes = seed.to_le_bytes();
    let layer_bytes = [layer];

    let (address, bump) =
        find_program_address(&[INTERMEDIATE_SEED_TAG, &seed_bytes, &layer_bytes], program_id)
            .map_err(|e| match e {
                SolError::BumpSeedNotFound => MixError::DerivationExhausted { layer },
                other => MixError::Wire(other),
            })?;

    Ok(IntermediateAddress {
        layer_index: layer,
        address,
        bump,
    })
}

/// Derive every hop for `layer_count` layers, in ascending layer order.
pub fn derive_all(
    program_id: &[u8; 32],
    seed: u64,
    layer_count: u8,
) -> Result<Vec<IntermediateAddress>, MixError> {
    (0..layer_count)
        .map(|layer| derive_intermediate(program_id, seed, layer))
        .collect()
}

/// Seeds the routing program passes to `invoke_signed` when a hop forwards
/// funds to the next one.
pub fn signer_seeds(seed: u64, layer: u8, bump: u8) -> [Vec<u8>; 4] {
    [
        INTERMEDIATE_SEED_TAG.to_vec(),
        seed.to_le_bytes().to_vec(),
        vec![layer],
        vec![bump],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chain_sol::{create_program_address, is_on_curve};
    use std::collections::HashSet;

    const PROGRAM: [u8; 32] = [0x4d; 32];

    #[test]
    fn derivation_is_deterministic() {
        for layer in 0..4 {
            let a = derive_intermediate(&PROGRAM, 42, layer).unwrap();
            let b = derive_intermediate(&PROGRAM, 42, layer).unwrap();
            assert_eq!(a, b);
        }
    }

    #[test]
    fn layers_do_not_collide() {
        let hops = derive_all(&PROGRAM, 42, 4).unwrap();
        let unique: HashSet<[u8; 32]> = hops.iter().map(|h| h.address).collect();
        assert_eq!(unique.len(), 4);
    }

    #[test]
    fn seeds_do_not_collide() {
        let addresses: HashSet<[u8; 32]> = [0u64, 1, 42, u64::MAX, 1 << 53]
            .iter()
            .map(|&seed| derive_intermediate(&PROGRAM, seed, 0).unwrap().address)
            .collect();
        assert_eq!(addresses.len(), 5);
    }

    #[test]
    fn derive_all_is_in_ascending_layer_order() {
        let hops = derive_all(&PROGRAM, 7, 4).unwrap();
        let layers: Vec<u8> = hops.iter().map(|h| h.layer_index).collect();
        assert_eq!(layers, vec![0, 1, 2, 3]);
    }

    #[test]
    fn derived_addresses_are_off_curve() {
        for hop in derive_all(&PROGRAM, 99, 4).unwrap() {
            assert!(!is_on_curve(&hop.address));
        }
    }

    #[test]
    fn signer_seeds_recreate_the_hop() {
        let hop = derive_intermediate(&PROGRAM, 42, 2).unwrap();
        let seeds = signer_seeds(42, 2, hop.bump);
        let refs: Vec<&[u8]> = seeds.iter().map(|s| s.as_slice()).collect();
        assert_eq!(create_program_address(&refs, &PROGRAM).unwrap(), hop.address);
    }

    #[test]
    fn signer_seed_layout() {
        let seeds = signer_seeds(0x0102, 3, 254);
        assert_eq!(seeds[0], b"mix_intermediate");
        assert_eq!(seeds[1], vec![0x02, 0x01, 0, 0, 0, 0, 0, 0]);
        assert_eq!(seeds[2], vec![3]);
        assert_eq!(seeds[3], vec![254]);
    }

    #[test]
    fn zero_layers_derives_nothing() {
        assert!(derive_all(&PROGRAM, 1, 0).unwrap().is_empty());
    }
}
