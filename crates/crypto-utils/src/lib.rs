//! # crypto-utils
//!
//! Secure random generation and memory hygiene helpers shared by the
//! routing client: routing seeds, throwaway key material, and buffers that
//! hold secret keys while they are being parsed.

pub mod random;
pub mod zeroizing;

pub use random::{random_bytes_fixed, random_u64};
pub use zeroizing::ZeroizingBytes;
