// Crypto module: password hashing, session tokens, random values.

pub mod jwt;
pub mod password;
pub mod random;

pub use jwt::{SessionClaims, TokenIssuer};
pub use password::{hash_password, verify_password};
pub use random::random_hex;
