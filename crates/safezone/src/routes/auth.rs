// Auth routes: registration, login and the current-user lookup.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use safezone_core::db::models::{ledger, NewPointsHistory, NewUser, User};
use safezone_core::error::{ApiError, ErrorCode, SafezoneError};
use safezone_core::rank::{compute_rank, WELCOME_BONUS};

use crate::context::AppContext;
use crate::crypto::{hash_password, verify_password};

const WELCOME_MESSAGE: &str = "Welcome to SafeZonePH! Thank you for joining our community.";

/// Registration body. The web client sends camelCase names; snake_case is
/// accepted too.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(alias = "firstName")]
    pub first_name: String,
    #[serde(alias = "lastName")]
    pub last_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub barangay: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Public view of a user. The password hash never leaves the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub barangay: Option<String>,
    pub city: Option<String>,
    pub location: Option<String>,
    pub bio: Option<String>,
    pub points: i64,
    pub rank: String,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            phone: user.phone.clone(),
            barangay: user.barangay.clone(),
            city: user.city.clone(),
            location: user.location.clone(),
            bio: user.bio.clone(),
            points: user.points,
            rank: user.rank.clone(),
            is_verified: user.is_verified,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub user: UserResponse,
}

/// Basic address check: exactly one `@`, non-empty local part, and a domain
/// containing a dot.
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

/// `"{barangay}, {city}"` when both parts are present.
fn derive_location(barangay: Option<&str>, city: Option<&str>) -> Option<String> {
    match (barangay, city) {
        (Some(b), Some(c)) if !b.is_empty() && !c.is_empty() => Some(format!("{b}, {c}")),
        _ => None,
    }
}

fn token_response(ctx: &AppContext, user: &User) -> Result<TokenResponse, ApiError> {
    Ok(TokenResponse {
        access_token: ctx.issuer.issue(&user.email)?,
        token_type: "bearer",
        user: UserResponse::from(user),
    })
}

/// Create an account with the welcome bonus and sign it in.
pub async fn handle_register(ctx: &AppContext, body: RegisterRequest) -> Result<TokenResponse, ApiError> {
    if !is_valid_email(&body.email) {
        return Err(ApiError::validation(ErrorCode::InvalidEmail));
    }

    let new_user = NewUser {
        location: derive_location(body.barangay.as_deref(), body.city.as_deref()),
        email: body.email,
        first_name: body.first_name,
        last_name: body.last_name,
        phone: body.phone,
        barangay: body.barangay,
        city: body.city,
        hashed_password: hash_password(&body.password),
        points: WELCOME_BONUS,
        rank: compute_rank(WELCOME_BONUS).to_string(),
        is_verified: false,
        is_active: true,
    };

    let tx = ctx.store.begin().await?;
    let result = async {
        let records = tx.records();
        if records.find_user_by_email(&new_user.email).await?.is_some() {
            return Err(ApiError::conflict(ErrorCode::EmailAlreadyRegistered));
        }
        let user = records.create_user(&new_user).await.map_err(|e| match e {
            SafezoneError::Duplicate(_) => ApiError::conflict(ErrorCode::EmailAlreadyRegistered),
            other => other.into(),
        })?;
        records
            .add_points_entry(&NewPointsHistory {
                user_id: user.id,
                kind: ledger::BONUS.to_string(),
                description: WELCOME_MESSAGE.to_string(),
                points: WELCOME_BONUS,
            })
            .await?;
        Ok::<_, ApiError>(user)
    }
    .await;
    let user = tx.finish(result).await?;

    tracing::info!(user_id = user.id, "registered user");
    token_response(ctx, &user)
}

/// Exchange email and password for a token. Unknown email and wrong
/// password produce the same error.
pub async fn handle_login(ctx: &AppContext, body: LoginRequest) -> Result<TokenResponse, ApiError> {
    let user = ctx
        .store
        .records()
        .find_user_by_email(&body.email)
        .await?
        .filter(|user| verify_password(&body.password, &user.hashed_password))
        .ok_or_else(|| ApiError::unauthorized(ErrorCode::IncorrectEmailOrPassword))?;

    token_response(ctx, &user)
}

pub fn handle_me(user: &User) -> UserResponse {
    UserResponse::from(user)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_email() {
        assert!(is_valid_email("ana@safezone.ph"));
        assert!(is_valid_email("ana.cruz+alerts@mail.example.com"));
        assert!(!is_valid_email("ana.safezone.ph"));
        assert!(!is_valid_email("@safezone.ph"));
        assert!(!is_valid_email("ana@"));
        assert!(!is_valid_email("ana@localhost"));
        assert!(!is_valid_email("ana@@safezone.ph"));
        assert!(!is_valid_email("ana cruz@safezone.ph"));
        assert!(!is_valid_email("ana@safezone."));
    }

    #[test]
    fn test_derive_location() {
        assert_eq!(
            derive_location(Some("Brgy. Malolos"), Some("Bulacan")).as_deref(),
            Some("Brgy. Malolos, Bulacan")
        );
        assert_eq!(derive_location(Some("Brgy. Malolos"), None), None);
        assert_eq!(derive_location(None, Some("Bulacan")), None);
        assert_eq!(derive_location(Some(""), Some("Bulacan")), None);
    }

    #[test]
    fn test_register_body_accepts_both_casings() {
        let camel: RegisterRequest = serde_json::from_value(serde_json::json!({
            "email": "ana@safezone.ph",
            "password": "pw",
            "firstName": "Ana",
            "lastName": "Cruz"
        }))
        .unwrap();
        assert_eq!(camel.first_name, "Ana");
        assert!(camel.phone.is_none());

        let snake: RegisterRequest = serde_json::from_value(serde_json::json!({
            "email": "ana@safezone.ph",
            "password": "pw",
            "first_name": "Ana",
            "last_name": "Cruz",
            "city": "Bulacan"
        }))
        .unwrap();
        assert_eq!(snake.last_name, "Cruz");
        assert_eq!(snake.city.as_deref(), Some("Bulacan"));
    }
}
