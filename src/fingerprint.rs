//! SHA-256 fingerprints for generated artifacts.

use sha2::{Digest, Sha256};

/// Compute the 32-byte SHA-256 digest of `bytes`.
pub fn compute(bytes: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

/// Render a digest as lowercase hexadecimal.
pub fn to_hex(digest: &[u8; 32]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(64);
    for byte in digest {
        out.push(HEX[(byte >> 4) as usize] as char);
        out.push(HEX[(byte & 0x0f) as usize] as char);
    }
    out
}

/// Hex fingerprint of some text.
pub fn of_text(text: &str) -> String {
    to_hex(&compute(text.as_bytes()))
}

/// Leading characters of a fingerprint for compact display.
pub fn short(fingerprint: &str) -> &str {
    fingerprint.get(..12).unwrap_or(fingerprint)
}
