// Password hashing.
//
// Stored format: `"{digest}:{salt}"` where `salt` is 16 random bytes as hex
// and `digest` is hex(SHA-256(password + salt)).

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use super::random::random_hex;

const SALT_BYTES: usize = 16;

fn digest(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hasher.update(salt.as_bytes());
    hex::encode(hasher.finalize())
}

/// Hash a password with a fresh random salt.
pub fn hash_password(password: &str) -> String {
    let salt = random_hex(SALT_BYTES);
    format!("{}:{salt}", digest(password, &salt))
}

/// Verify a password against a stored hash. A malformed stored value never
/// verifies.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((expected, salt)) = stored.split_once(':') else {
        return false;
    };
    let actual = digest(password, salt);
    actual.as_bytes().ct_eq(expected.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("bayanihan-2025");
        assert!(verify_password("bayanihan-2025", &hash));
        assert!(!verify_password("bayanihan-2024", &hash));
    }

    #[test]
    fn test_format() {
        let hash = hash_password("secret");
        let (digest, salt) = hash.split_once(':').unwrap();
        assert_eq!(digest.len(), 64);
        assert_eq!(salt.len(), 32);
        assert!(hash.chars().filter(|c| *c != ':').all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_salted() {
        assert_ne!(hash_password("same"), hash_password("same"));
    }

    #[test]
    fn test_known_digest() {
        // sha256("password" + "salt")
        let stored = "7a37b85c8918eac19a9089c0fa5a2ab4dce3f90528dcdeec108b23ddf3607b99:salt";
        assert!(verify_password("password", stored));
    }

    #[test]
    fn test_malformed_stored_value() {
        assert!(!verify_password("secret", "no-separator-here"));
        assert!(!verify_password("secret", ""));
        assert!(!verify_password("secret", ":"));
    }
}
