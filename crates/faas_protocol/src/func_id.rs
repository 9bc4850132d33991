//! Content-addressing for registered functions.

use base64::Engine;
use sha2::{Digest, Sha256};

/// `func_id = hex(SHA-256(name + ":" + base64(code)))` (spec.md §3, §6).
pub fn compute_func_id(name: &str, code: &[u8]) -> String {
    let code_b64 = base64::engine::general_purpose::STANDARD.encode(code);
    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    hasher.update(b":");
    hasher.update(code_b64.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_known_vector() {
        // hex(SHA-256("add:" + base64("body")))
        let id = compute_func_id("add", b"body");
        assert_eq!(id.len(), 64);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn is_deterministic_and_content_addressed() {
        let a = compute_func_id("add", b"body-a");
        let b = compute_func_id("add", b"body-b");
        let c = compute_func_id("add", b"body-a");
        assert_ne!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn name_participates_in_the_hash() {
        let a = compute_func_id("add", b"body");
        let b = compute_func_id("sub", b"body");
        assert_ne!(a, b);
    }
}
