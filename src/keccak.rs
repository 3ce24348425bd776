//! keccak-256 (the Ethereum variant, not NIST SHA-3).

use tiny_keccak::{Hasher, Keccak};

/// Computes the keccak-256 digest of `bytes`.
pub fn keccak256(bytes: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    hasher.update(bytes);
    let mut out = [0u8; 32];
    hasher.finalize(&mut out);
    out
}
