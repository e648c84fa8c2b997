// Session tokens: HMAC-signed JWTs using the `jsonwebtoken` crate.
//
// Claims are `{sub, iat, exp}` with the user's email as subject. Expiry is
// checked with zero leeway.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use safezone_core::error::SafezoneError;
use safezone_core::options::TokenOptions;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and verifies bearer tokens with one secret and algorithm.
#[derive(Clone)]
pub struct TokenIssuer {
    algorithm: Algorithm,
    encoding: EncodingKey,
    decoding: DecodingKey,
    lifetime: Duration,
}

impl fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("algorithm", &self.algorithm)
            .field("lifetime_minutes", &self.lifetime.num_minutes())
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    pub fn new(options: &TokenOptions) -> Result<Self, SafezoneError> {
        let algorithm = Algorithm::from_str(&options.algorithm).map_err(|e| {
            SafezoneError::Config(format!("Invalid JWT algorithm {}: {e}", options.algorithm))
        })?;
        if !matches!(algorithm, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512) {
            return Err(SafezoneError::Config(format!(
                "JWT algorithm {} is not an HMAC algorithm",
                options.algorithm
            )));
        }

        let lifetime = Duration::try_minutes(options.expire_minutes)
            .filter(|lifetime| *lifetime > Duration::zero())
            .ok_or_else(|| {
                SafezoneError::Config(format!(
                    "Invalid token lifetime of {} minutes",
                    options.expire_minutes
                ))
            })?;

        let secret = options.secret.as_bytes();
        Ok(Self {
            algorithm,
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            lifetime,
        })
    }

    /// Issue a token for `subject`, valid from now.
    pub fn issue(&self, subject: &str) -> Result<String, SafezoneError> {
        self.issue_at(subject, Utc::now())
    }

    /// Issue a token as if it were `now`.
    pub fn issue_at(&self, subject: &str, now: DateTime<Utc>) -> Result<String, SafezoneError> {
        let claims = SessionClaims {
            sub: subject.to_string(),
            iat: now.timestamp(),
            exp: now
                .checked_add_signed(self.lifetime)
                .ok_or_else(|| SafezoneError::Crypto("Token expiry is out of range".into()))?
                .timestamp(),
        };
        jsonwebtoken::encode(&Header::new(self.algorithm), &claims, &self.encoding)
            .map_err(|e| SafezoneError::Crypto(format!("JWT signing failed: {e}")))
    }

    /// Verify signature and expiry. Returns `None` for any invalid token.
    pub fn verify(&self, token: &str) -> Option<SessionClaims> {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "sub"]);

        match jsonwebtoken::decode::<SessionClaims>(token, &self.decoding, &validation) {
            Ok(data) => Some(data.claims),
            Err(e) => {
                tracing::debug!(error = %e, "rejected bearer token");
                None
            }
        }
    }
}
