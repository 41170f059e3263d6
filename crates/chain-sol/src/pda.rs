//! Program Derived Address (PDA) derivation.
//!
//! A PDA is a 32-byte address computed from a list of seeds and a program id
//! that deliberately falls off the Ed25519 curve, so no private key can sign
//! for it. Only the owning program can, by presenting the same seeds plus the
//! bump byte found here.

use sha2::{Digest, Sha256};

use crate::error::SolError;

/// The string appended to PDA derivation: "ProgramDerivedAddress".
const PDA_MARKER: &[u8] = b"ProgramDerivedAddress";

/// Maximum number of seeds accepted by the runtime.
pub const MAX_SEEDS: usize = 16;

/// Maximum length of a single seed, in bytes.
pub const MAX_SEED_LEN: usize = 32;

/// Find a valid Program Derived Address (PDA) for the given seeds and program.
///
/// Iterates bump seeds from 255 down to 0, computing
/// `SHA-256(seed_0 || seed_1 || ... || bump || program_id || "ProgramDerivedAddress")`
/// and returning the first result that is NOT a valid Ed25519 point. The
/// returned bump is the canonical one the runtime will accept.
pub fn find_program_address(
    seeds: &[&[u8]],
    program_id: &[u8; 32],
) -> Result<([u8; 32], u8), SolError> {
    check_seeds(seeds, 1)?;

    for bump in (0u8..=255).rev() {
        if let Some(address) = try_create_program_address(seeds, &[bump], program_id) {
            return Ok((address, bump));
        }
    }

    Err(SolError::BumpSeedNotFound)
}

/// Re-derive a PDA from a full seed list whose last element is the bump.
///
/// This is the check the runtime performs when a program signs with
/// `invoke_signed`. Fails if the resulting point lies on the curve.
pub fn create_program_address(
    seeds: &[&[u8]],
    program_id: &[u8; 32],
) -> Result<[u8; 32], SolError> {
    check_seeds(seeds, 0)?;

    try_create_program_address(seeds, &[], program_id).ok_or_else(|| {
        SolError::InvalidAddress("seeds produce an on-curve address".into())
    })
}

/// Attempt to create a PDA from seeds + bump + program_id.
///
/// Returns `Some(address)` if the derived point is OFF the Ed25519 curve,
/// `None` if it falls on the curve (invalid PDA, try next bump).
fn try_create_program_address(
    seeds: &[&[u8]],
    bump_seed: &[u8],
    program_id: &[u8; 32],
) -> Option<[u8; 32]> {
    let mut hasher = Sha256::new();

    for seed in seeds {
        hasher.update(seed);
    }
    hasher.update(bump_seed);
    hasher.update(program_id);
    hasher.update(PDA_MARKER);

    let hash: [u8; 32] = hasher.finalize().into();

    if is_on_curve(&hash) {
        return None;
    }

    Some(hash)
}

/// `reserved` is the number of seed slots still needed by the caller (the
/// bump, for `find_program_address`).
fn check_seeds(seeds: &[&[u8]], reserved: usize) -> Result<(), SolError> {
    if seeds.len() + reserved > MAX_SEEDS {
        return Err(SolError::InvalidAddress(format!(
            "too many seeds: {} (max {})",
            seeds.len(),
            MAX_SEEDS - reserved
        )));
    }
    if let Some(seed) = seeds.iter().find(|s| s.len() > MAX_SEED_LEN) {
        return Err(SolError::InvalidAddress(format!(
            "seed of {} bytes exceeds {MAX_SEED_LEN}",
            seed.len()
        )));
    }
    Ok(())
}

/// Check if 32 bytes represent a valid Ed25519 curve point.
///
/// Uses `curve25519-dalek` to attempt decompression. If it succeeds, the
/// point is on the curve.
pub fn is_on_curve(bytes: &[u8; 32]) -> bool {
    curve25519_dalek::edwards::CompressedEdwardsY(*bytes)
        .decompress()
        .is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROGRAM: [u8; 32] = [0x07; 32];

    #[test]
    fn pda_is_not_on_curve() {
        let (pda, _bump) = find_program_address(&[b"vault", &[1, 2, 3]], &PROGRAM).unwrap();
        assert!(!is_on_curve(&pda), "PDA must NOT be on the Ed25519 curve");
    }

    #[test]
    fn pda_derivation_is_deterministic() {
        let a = find_program_address(&[b"vault", &42u64.to_le_bytes()], &PROGRAM).unwrap();
        let b = find_program_address(&[b"vault", &42u64.to_le_bytes()], &PROGRAM).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn different_programs_give_different_pdas() {
        let other = [0x08u8; 32];
        let (a, _) = find_program_address(&[b"vault"], &PROGRAM).unwrap();
        let (b, _) = find_program_address(&[b"vault"], &other).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn seed_boundaries_are_not_ambiguous_with_different_content() {
        let (a, _) = find_program_address(&[b"ab", b"c"], &PROGRAM).unwrap();
        let (b, _) = find_program_address(&[b"ab", b"d"], &PROGRAM).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn create_program_address_matches_found_bump() {
        let seeds: [&[u8]; 2] = [b"vault", &[9u8; 8]];
        let (pda, bump) = find_program_address(&seeds, &PROGRAM).unwrap();

        let bump_bytes = [bump];
        let recreated =
            create_program_address(&[seeds[0], seeds[1], &bump_bytes], &PROGRAM).unwrap();
        assert_eq!(recreated, pda);
    }

    #[test]
    fn found_bump_is_the_highest_viable() {
        let seeds: [&[u8]; 1] = [b"canonical"];
        let (_pda, bump) = find_program_address(&seeds, &PROGRAM).unwrap();

        // Every bump above the canonical one must land on the curve.
        for higher in bump.saturating_add(1)..=255 {
            if higher == bump {
                continue;
            }
            let b = [higher];
            assert!(create_program_address(&[seeds[0], &b], &PROGRAM).is_err());
        }
    }

    #[test]
    fn oversized_seed_is_rejected() {
        let long = [0u8; 33];
        let result = find_program_address(&[&long], &PROGRAM);
        assert!(matches!(result, Err(SolError::InvalidAddress(_))));
    }

    #[test]
    fn too_many_seeds_is_rejected() {
        let seeds: Vec<&[u8]> = (0..MAX_SEEDS).map(|_| b"x".as_slice()).collect();
        // 16 seeds leave no room for the bump.
        assert!(find_program_address(&seeds, &PROGRAM).is_err());
        // But 16 seeds including the bump are fine for re-creation input checks.
        assert!(check_seeds(&seeds, 0).is_ok());
    }

    #[test]
    fn is_on_curve_accepts_basepoint() {
        // The Ed25519 basepoint (compressed form).
        let mut basepoint = [0x66u8; 32];
        basepoint[0] = 0x58;
        assert!(is_on_curve(&basepoint));
    }
}
