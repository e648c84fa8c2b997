// Random values for salts and signing secrets.

use rand::RngCore;

/// `len` random bytes from the thread-local CSPRNG, hex encoded
/// (`2 * len` characters).
pub fn random_hex(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_and_charset() {
        let s = random_hex(16);
        assert_eq!(s.len(), 32);
        assert!(s.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(random_hex(0), "");
    }

    #[test]
    fn test_uniqueness() {
        assert_ne!(random_hex(32), random_hex(32));
    }
}
