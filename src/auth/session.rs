//! Cookie carrier for session tokens.
//!
//! The token travels in the `jwt` cookie. Verification never touches the
//! database, and logout only asks the client to drop the cookie: a copy of
//! the token made earlier stays valid until its own expiry.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use time::Duration;
use tracing::debug;
use uuid::Uuid;

use super::jwt::TokenService;
use crate::errors::AppError;
use crate::state::AppState;

pub const TOKEN_COOKIE: &str = "jwt";

/// Finds the session token in a raw `Cookie` header value.
pub fn token_from_cookies(header: &str) -> Option<&str> {
    header.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == TOKEN_COOKIE && !value.is_empty()).then_some(value)
    })
}

/// Resolves the carrier to a user id. Any problem with the carrier, missing,
/// malformed, forged or expired, comes out as the same `Unauthenticated`.
pub fn authenticate_request(
    tokens: &TokenService,
    cookie_header: Option<&str>,
) -> Result<Uuid, AppError> {
    let Some(token) = cookie_header.and_then(token_from_cookies) else {
        debug!("no session cookie");
        return Err(AppError::Unauthenticated);
    };
    match tokens.verify(token) {
        Ok(claims) => Ok(claims.sub),
        Err(reason) => {
            debug!(%reason, "session rejected");
            Err(AppError::Unauthenticated)
        }
    }
}

/// `Set-Cookie` value handing a fresh token to the client.
pub fn session_cookie(token: &str, max_age: Duration) -> String {
    format!(
        "{TOKEN_COOKIE}={token}; Max-Age={}; Path=/; Secure; HttpOnly; SameSite=None",
        max_age.whole_seconds()
    )
}

/// `Set-Cookie` value telling the client to forget its token now.
pub fn clear_session_cookie() -> String {
    format!("{TOKEN_COOKIE}=; Max-Age=0; Path=/; Secure; HttpOnly; SameSite=None")
}

/// Extracts the authenticated user id from the session cookie.
pub struct AuthUser(pub Uuid);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let cookies = parts
            .headers
            .get(header::COOKIE)
            .and_then(|v| v.to_str().ok());
        authenticate_request(&state.tokens, cookies).map(AuthUser)
    }
}
