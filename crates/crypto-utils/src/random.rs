use rand::RngCore;
use rand_core::OsRng;

/// Generates a fixed-size array of cryptographically secure random bytes.
pub fn random_bytes_fixed<const N: usize>() -> [u8; N] {
    let mut buf = [0u8; N];
    OsRng.fill_bytes(&mut buf);
    buf
}

/// Generates a uniformly distributed, full-width 64-bit value from the OS CSPRNG.
///
/// Routing seeds come from here. Every request must draw a fresh one; a
/// repeated seed maps to the same set of intermediate addresses.
pub fn random_u64() -> u64 {
    OsRng.next_u64()
}
