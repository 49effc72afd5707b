//! # Hashing Utilities
//!
//! Transaction digests are BLAKE3-256 over the canonical preimage, rendered
//! as lowercase hex. The ledger node recomputes the same digest on its side,
//! so the function choice here is part of the wire contract.

/// Compute the BLAKE3 hash of the input data.
///
/// Returns a 32-byte digest as a fixed-size array.
///
/// # Example
///
/// ```
/// use txpulse_protocol::crypto::blake3_hash;
///
/// let hash = blake3_hash(b"txpulse");
/// assert_eq!(hash.len(), 32);
/// ```
pub fn blake3_hash(data: &[u8]) -> [u8; 32] {
    *blake3::hash(data).as_bytes()
}

/// Compute the BLAKE3 hash and render it as 64 lowercase hex characters.
///
/// This is the form in which transaction hashes are logged and signed.
pub fn blake3_hex(data: &[u8]) -> String {
    hex::encode(blake3_hash(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blake3_known_vector() {
        // Empty-input vector from the BLAKE3 reference implementation.
        assert_eq!(
            blake3_hex(b""),
            "af1349b9f5f9a1a6a0404dea36dcc9499bcb25c9adc112b7cc9a93cae41f3262"
        );
    }

    #[test]
    fn test_blake3_hex_is_lowercase() {
        let digest = blake3_hex(b"1:alice:bob:10:1:5:{}");
        assert_eq!(digest.len(), 64);
        assert!(digest
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn test_blake3_deterministic() {
        assert_eq!(blake3_hash(b"same input"), blake3_hash(b"same input"));
        assert_ne!(blake3_hash(b"input a"), blake3_hash(b"input b"));
    }
}
