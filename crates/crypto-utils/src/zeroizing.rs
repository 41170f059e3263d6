use std::ops::Deref;

use zeroize::{Zeroize, ZeroizeOnDrop};

/// A `Vec<u8>` wrapper that is zeroed when dropped.
///
/// Keypair files hold the raw Ed25519 secret in plain JSON. The file contents
/// and the decoded 64-byte array both pass through this type so neither
/// lingers on the heap after the signing key has been constructed.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct ZeroizingBytes(Vec<u8>);

impl ZeroizingBytes {
    pub fn new(data: Vec<u8>) -> Self {
        Self(data)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Deref for ZeroizingBytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for ZeroizingBytes {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

// Debug must never print key material.
impl std::fmt::Debug for ZeroizingBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ZeroizingBytes([REDACTED; {}])", self.0.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deref_exposes_bytes() {
        let data = vec![1u8, 2, 3, 4, 5];
        let zb = ZeroizingBytes::new(data.clone());
        assert_eq!(&*zb, &data[..]);
    }

    #[test]
    fn len_and_is_empty() {
        let zb = ZeroizingBytes::new(vec![10, 20]);
        assert_eq!(zb.len(), 2);
        assert!(!zb.is_empty());

        let empty = ZeroizingBytes::new(vec![]);
        assert!(empty.is_empty());
    }

    #[test]
    fn from_vec() {
        let zb: ZeroizingBytes = vec![0xFFu8; 64].into();
        assert_eq!(zb.len(), 64);
    }

    #[test]
    fn manual_zeroize_clears_contents() {
        // ZeroizeOnDrop calls the same routine on drop.
        let mut zb = ZeroizingBytes::new(vec![0xAA; 32]);
        zb.zeroize();
        assert!(zb.is_empty());
    }

    #[test]
    fn debug_redacts_contents() {
        let zb = ZeroizingBytes::new(vec![0x42; 64]);
        let debug = format!("{:?}", zb);
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains("42"));
    }
}
