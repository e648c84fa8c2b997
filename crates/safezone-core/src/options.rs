// Process configuration, read from the environment.

use std::fmt;
use std::str::FromStr;

use crate::env::{self, EnvMode};
use crate::error::{Result, SafezoneError};

pub const DEFAULT_DATABASE_URL: &str = "sqlite://safezoneph_dev.db?mode=rwc";
pub const DEFAULT_TOKEN_EXPIRE_MINUTES: i64 = 1440;
/// One year.
pub const MAX_TOKEN_EXPIRE_MINUTES: i64 = 60 * 24 * 366;

/// Signing algorithms accepted for session tokens.
pub const SUPPORTED_ALGORITHMS: [&str; 3] = ["HS256", "HS384", "HS512"];

/// Bearer token settings.
#[derive(Clone)]
pub struct TokenOptions {
    pub secret: String,
    pub algorithm: String,
    pub expire_minutes: i64,
}

impl TokenOptions {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            algorithm: "HS256".to_string(),
            expire_minutes: DEFAULT_TOKEN_EXPIRE_MINUTES,
        }
    }
}

impl fmt::Debug for TokenOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenOptions")
            .field("secret", &"[REDACTED]")
            .field("algorithm", &self.algorithm)
            .field("expire_minutes", &self.expire_minutes)
            .finish()
    }
}

/// Top-level configuration for the SafeZone backend.
#[derive(Debug, Clone)]
pub struct SafezoneOptions {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    /// Origins allowed by the CORS layer.
    pub cors_origins: Vec<String>,
    pub token: TokenOptions,
}

impl SafezoneOptions {
    /// Options suitable for tests and embedding: in-memory defaults and the
    /// given signing secret.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            host: "127.0.0.1".to_string(),
            port: 8000,
            cors_origins: default_cors_origins(),
            token: TokenOptions::new(secret),
        }
    }

    /// Load options from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok(), env::detect_env_mode())
    }

    /// Load options through `lookup`, so callers can supply their own
    /// variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>, mode: EnvMode) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let secret = match var("JWT_SECRET_KEY") {
            Some(secret) => secret,
            None if mode == EnvMode::Production => {
                return Err(SafezoneError::Config(
                    "JWT_SECRET_KEY must be set in production".into(),
                ));
            }
            None => {
                tracing::warn!(
                    "JWT_SECRET_KEY not set, generated a random secret; tokens will not survive a restart"
                );
                random_secret()
            }
        };
        if secret.len() < 32 {
            tracing::warn!(
                length = secret.len(),
                "JWT_SECRET_KEY is shorter than 32 characters"
            );
        }

        let algorithm = var("JWT_ALGORITHM")
            .unwrap_or_else(|| "HS256".to_string())
            .to_uppercase();
        if !SUPPORTED_ALGORITHMS.contains(&algorithm.as_str()) {
            return Err(SafezoneError::Config(format!(
                "Unsupported JWT_ALGORITHM {algorithm}, expected one of {}",
                SUPPORTED_ALGORITHMS.join(", ")
            )));
        }

        let expire_minutes: i64 = parse_or(&var, "JWT_EXPIRE_MINUTES", DEFAULT_TOKEN_EXPIRE_MINUTES)?;
        if !(1..=MAX_TOKEN_EXPIRE_MINUTES).contains(&expire_minutes) {
            return Err(SafezoneError::Config(format!(
                "JWT_EXPIRE_MINUTES must be between 1 and {MAX_TOKEN_EXPIRE_MINUTES}"
            )));
        }

        let cors_origins = match var("CORS_ORIGINS") {
            Some(list) => list
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect(),
            None => default_cors_origins(),
        };

        Ok(Self {
            database_url: var("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            host: var("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: parse_or(&var, "PORT", 8000)?,
            cors_origins,
            token: TokenOptions {
                secret,
                algorithm,
                expire_minutes,
            },
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn random_secret() -> String {
    use rand::RngCore;

    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://127.0.0.1:3000".to_string(),
    ]
}

fn parse_or<T>(var: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| SafezoneError::Config(format!("Invalid {key} value {raw:?}: {e}"))),
        None => Ok(default),
    }
}
