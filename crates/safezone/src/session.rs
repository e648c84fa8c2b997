// Bearer token resolution.
//
// Every failure (bad signature, expiry, unknown subject) produces the same
// Unauthorized error.

use safezone_core::db::models::User;
use safezone_core::error::{ApiError, ErrorCode};

use crate::context::AppContext;

fn invalid_credentials() -> ApiError {
    ApiError::unauthorized(ErrorCode::CouldNotValidateCredentials)
}

/// Resolve a bearer token to the user it was issued for.
pub async fn resolve_token(ctx: &AppContext, token: &str) -> Result<User, ApiError> {
    let claims = ctx.issuer.verify(token).ok_or_else(invalid_credentials)?;
    ctx.store
        .records()
        .find_user_by_email(&claims.sub)
        .await?
        .ok_or_else(invalid_credentials)
}

/// The token of a `Bearer <token>` header value. The scheme name is matched
/// case-insensitively.
fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Resolve an optional `Authorization` header value.
pub async fn resolve_authorization(ctx: &AppContext, header: Option<&str>) -> Result<User, ApiError> {
    let token = header.and_then(bearer_token).ok_or_else(invalid_credentials)?;
    resolve_token(ctx, token).await
}
