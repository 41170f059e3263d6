//! Ed25519 signing keys for Solana accounts.
//!
//! Keys arrive either as a raw 32-byte secret or as a Solana CLI keypair file
//! (a JSON array of 64 numbers: the 32-byte secret followed by the 32-byte
//! public key).

use std::path::Path;

use crypto_utils::ZeroizingBytes;
use ed25519_dalek::{Signer, SigningKey};
use zeroize::Zeroize;

use crate::address::bytes_to_address;
use crate::error::SolError;

/// A Solana account keypair. The secret half is zeroized on drop by
/// `ed25519-dalek`.
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    /// Build a keypair from a 32-byte Ed25519 secret seed.
    pub fn from_secret(secret: &[u8; 32]) -> Self {
        let mut seed = *secret;
        let signing_key = SigningKey::from_bytes(&seed);
        seed.zeroize();
        Self { signing_key }
    }

    /// Build a keypair from the 64-byte `secret || public` layout.
    ///
    /// The public half must match the key derived from the secret, so a
    /// truncated or hand-edited file is caught before it signs anything.
    pub fn from_keypair_bytes(bytes: &[u8]) -> Result<Self, SolError> {
        if bytes.len() != 64 {
            return Err(SolError::InvalidPrivateKey(format!(
                "expected 64 keypair bytes, got {}",
                bytes.len()
            )));
        }

        let mut secret = [0u8; 32];
        secret.copy_from_slice(&bytes[..32]);
        let keypair = Self::from_secret(&secret);
        secret.zeroize();

        if keypair.pubkey()[..] != bytes[32..] {
            return Err(SolError::InvalidPrivateKey(
                "public key does not match secret key".into(),
            ));
        }

        Ok(keypair)
    }

    /// Load a Solana CLI keypair file (`solana-keygen` JSON format).
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SolError> {
        let path = path.as_ref();
        let raw = ZeroizingBytes::new(std::fs::read(path).map_err(|e| {
            SolError::KeypairFile(format!("failed to read {}: {e}", path.display()))
        })?);

        Self::from_json_bytes(&raw)
    }

    /// Parse the JSON array form of a keypair.
    pub fn from_json_bytes(json: &[u8]) -> Result<Self, SolError> {
        let bytes: ZeroizingBytes = serde_json::from_slice::<Vec<u8>>(json)
            .map_err(|e| SolError::KeypairFile(format!("invalid keypair JSON: {e}")))?
            .into();

        if bytes.iter().all(|&b| b == 0) {
            return Err(SolError::KeypairFile("all-zero keypair rejected".into()));
        }

        Self::from_keypair_bytes(&bytes)
    }

    /// Generate a throwaway keypair from OS randomness.
    pub fn generate() -> Self {
        let mut secret: [u8; 32] = crypto_utils::random_bytes_fixed();
        let keypair = Self::from_secret(&secret);
        secret.zeroize();
        keypair
    }

    /// The 32-byte public key, which is also the account address.
    pub fn pubkey(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// The Base58 account address.
    pub fn address(&self) -> String {
        bytes_to_address(&self.pubkey())
    }

    /// Sign arbitrary bytes, returning the 64-byte Ed25519 signature.
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }
}

impl std::fmt::Debug for Keypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keypair")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signature, Verifier, VerifyingKey};

    fn keypair_bytes(secret: [u8; 32]) -> Vec<u8> {
        let kp = Keypair::from_secret(&secret);
        let mut bytes = secret.to_vec();
        bytes.extend_from_slice(&kp.pubkey());
        bytes
    }

    #[test]
    fn from_secret_is_deterministic() {
        let a = Keypair::from_secret(&[0x11; 32]);
        let b = Keypair::from_secret(&[0x11; 32]);
        assert_eq!(a.pubkey(), b.pubkey());
    }

    #[test]
    fn keypair_bytes_roundtrip() {
        let bytes = keypair_bytes([0x22; 32]);
        let kp = Keypair::from_keypair_bytes(&bytes).unwrap();
        assert_eq!(kp.pubkey()[..], bytes[32..]);
    }

    #[test]
    fn mismatched_public_half_is_rejected() {
        let mut bytes = keypair_bytes([0x22; 32]);
        bytes[40] ^= 0xff;
        let err = Keypair::from_keypair_bytes(&bytes).unwrap_err();
        assert!(err.to_string().contains("does not match"));
    }

    #[test]
    fn wrong_length_is_rejected() {
        assert!(Keypair::from_keypair_bytes(&[1u8; 32]).is_err());
    }

    #[test]
    fn json_keypair_parses() {
        let bytes = keypair_bytes([0x33; 32]);
        let json = serde_json::to_vec(&bytes).unwrap();
        let kp = Keypair::from_json_bytes(&json).unwrap();
        assert_eq!(kp.pubkey()[..], bytes[32..]);
    }

    #[test]
    fn all_zero_json_is_rejected() {
        let json = serde_json::to_vec(&vec![0u8; 64]).unwrap();
        let err = Keypair::from_json_bytes(&json).unwrap_err();
        assert!(matches!(err, SolError::KeypairFile(_)));
    }

    #[test]
    fn malformed_json_is_rejected() {
        assert!(Keypair::from_json_bytes(b"[1, 2, oops]").is_err());
    }

    #[test]
    fn missing_file_is_reported() {
        let err = Keypair::from_json_file("/definitely/not/here.json").unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }

    #[test]
    fn signature_verifies() {
        let kp = Keypair::generate();
        let sig = kp.sign(b"route me");

        let vk = VerifyingKey::from_bytes(&kp.pubkey()).unwrap();
        assert!(vk.verify(b"route me", &Signature::from_bytes(&sig)).is_ok());
    }

    #[test]
    fn debug_does_not_leak_secret() {
        let kp = Keypair::from_secret(&[0x44; 32]);
        let debug = format!("{:?}", kp);
        assert!(debug.contains(&kp.address()));
        assert!(!debug.contains("signing_key"));
    }
}
