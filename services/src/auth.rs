//! Bearer-token authentication for API routes.
//!
//! Tokens are HS256 JWTs signed with `JWT_SECRET` whose `sub` claim is the
//! acting user's id. Issuing tokens belongs to the identity service; this
//! crate only validates them (plus a signing helper for tooling and tests).
//!
//! # Usage
//!
//! ```rust,ignore
//! use recipebook_services::auth::RequireAuth;
//!
//! async fn protected_handler(auth: RequireAuth) -> impl IntoResponse {
//!     format!("Hello, user {}!", auth.user_id())
//! }
//! ```
//!
//! # Token Requirements
//!
//! The JWT must:
//! - Be signed with the server's `JWT_SECRET`
//! - Have a valid `exp` (expiration) claim
//! - Have a numeric `sub` (subject) claim
//! - Have an `iss` (issuer) claim matching [`ISSUER`]

use crate::config::Config;
use crate::model::UserId;
use axum::{
    Json,
    extract::FromRequestParts,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

pub const ISSUER: &str = "recipebook";

/// Claims carried by a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// User id, as a decimal string.
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
}

/// Authenticated user context extracted from a valid session JWT.
///
/// # Rejection
///
/// Returns [`SessionAuthError`] (401 Unauthorized) if the header is missing or
/// malformed, or the token fails validation.
#[derive(Debug, Clone)]
pub struct RequireAuth {
    user_id: UserId,
}

impl RequireAuth {
    pub fn user_id(&self) -> UserId {
        self.user_id
    }
}

/// Like [`RequireAuth`], but a request without an `Authorization` header is
/// accepted as anonymous. A header that is present but invalid is still
/// rejected.
#[derive(Debug, Clone)]
pub struct MaybeAuth(pub Option<RequireAuth>);

impl MaybeAuth {
    pub fn user_id(&self) -> Option<UserId> {
        self.0.as_ref().map(RequireAuth::user_id)
    }
}

/// Error type for session authentication failures.
#[derive(Debug, Serialize)]
pub struct SessionAuthError {
    pub error: String,
    pub message: String,
}

impl SessionAuthError {
    fn missing_token() -> Self {
        Self {
            error: "missing_token".to_string(),
            message: "Authorization header with Bearer token is required".to_string(),
        }
    }

    fn invalid_format() -> Self {
        Self {
            error: "invalid_format".to_string(),
            message: "Authorization header must be in format: Bearer <token>".to_string(),
        }
    }

    fn invalid_token(reason: impl Into<String>) -> Self {
        Self {
            error: "invalid_token".to_string(),
            message: reason.into(),
        }
    }

    fn missing_config() -> Self {
        Self {
            error: "server_error".to_string(),
            message: "Server configuration error".to_string(),
        }
    }
}

impl IntoResponse for SessionAuthError {
    fn into_response(self) -> Response {
        (StatusCode::UNAUTHORIZED, Json(self)).into_response()
    }
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    let header_str = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let stripped = header_str.strip_prefix("Bearer ")?;
    if stripped.is_empty() {
        return None;
    }
    Some(stripped)
}

/// Validate a session JWT and return its claims.
pub fn validate_session_token(token: &str, jwt_secret: &str) -> Result<SessionClaims, String> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.validate_exp = true;

    let token_data = decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => "Token has expired".to_string(),
        jsonwebtoken::errors::ErrorKind::InvalidSignature => "Invalid token signature".to_string(),
        jsonwebtoken::errors::ErrorKind::InvalidIssuer => "Invalid token issuer".to_string(),
        _ => format!("Token validation failed: {e}"),
    })?;

    Ok(token_data.claims)
}

/// Sign a session token for `user` valid for `ttl_secs` seconds.
pub fn sign_session_token(
    user: UserId,
    jwt_secret: &str,
    ttl_secs: i64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now().timestamp();
    let claims = SessionClaims {
        sub: user.to_string(),
        iat: now,
        exp: now + ttl_secs,
        iss: ISSUER.to_string(),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_bytes()),
    )
}

fn authenticate(parts: &Parts) -> Result<RequireAuth, SessionAuthError> {
    let config = parts
        .extensions
        .get::<Config>()
        .ok_or_else(SessionAuthError::missing_config)?;

    let token = extract_bearer_token(&parts.headers).ok_or_else(|| {
        if parts.headers.get(AUTHORIZATION).is_some() {
            SessionAuthError::invalid_format()
        } else {
            SessionAuthError::missing_token()
        }
    })?;

    let claims = validate_session_token(token, config.jwt_secret())
        .map_err(SessionAuthError::invalid_token)?;
    let user_id = claims
        .sub
        .parse::<i64>()
        .map(UserId)
        .map_err(|_| SessionAuthError::invalid_token("Token subject is not a user id"))?;

    Ok(RequireAuth { user_id })
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = SessionAuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        authenticate(parts)
    }
}

impl<S> FromRequestParts<S> for MaybeAuth
where
    S: Send + Sync,
{
    type Rejection = SessionAuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if parts.headers.get(AUTHORIZATION).is_none() {
            return Ok(MaybeAuth(None));
        }
        authenticate(parts).map(|auth| MaybeAuth(Some(auth)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    const TEST_SECRET: &str = "test-jwt-secret-for-unit-tests";

    fn parts_with(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/recipes");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        parts.extensions.insert(Config::new_for_test());
        parts
    }

    #[test]
    fn test_extract_bearer_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, "Bearer abc".parse().unwrap());
        assert_eq!(extract_bearer_token(&headers), Some("abc"));

        headers.insert(AUTHORIZATION, "abc".parse().unwrap());
        assert_eq!(extract_bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, "Bearer ".parse().unwrap());
        assert_eq!(extract_bearer_token(&headers), None);
    }

    #[test]
    fn test_sign_and_validate_round_trip() {
        let token = sign_session_token(UserId(42), TEST_SECRET, 3600).unwrap();
        let claims = validate_session_token(&token, TEST_SECRET).unwrap();
        assert_eq!(claims.sub, "42");
        assert_eq!(claims.iss, ISSUER);
    }

    #[test]
    fn test_validate_rejects_wrong_secret_and_expired() {
        let token = sign_session_token(UserId(1), TEST_SECRET, 3600).unwrap();
        assert!(validate_session_token(&token, "other-secret").is_err());

        let expired = sign_session_token(UserId(1), TEST_SECRET, -3600).unwrap();
        let err = validate_session_token(&expired, TEST_SECRET).unwrap_err();
        assert!(err.contains("expired"));
    }

    #[tokio::test]
    async fn test_require_auth_extracts_user() {
        let secret = Config::new_for_test().jwt_secret().to_owned();
        let token = sign_session_token(UserId(7), &secret, 600).unwrap();
        let mut parts = parts_with(Some(&format!("Bearer {token}")));

        let auth = RequireAuth::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(auth.user_id(), UserId(7));
    }

    #[tokio::test]
    async fn test_require_auth_rejects_missing_header() {
        let mut parts = parts_with(None);
        let err = RequireAuth::from_request_parts(&mut parts, &())
            .await
            .unwrap_err();
        assert_eq!(err.error, "missing_token");
    }

    #[tokio::test]
    async fn test_maybe_auth() {
        let mut anonymous = parts_with(None);
        let auth = MaybeAuth::from_request_parts(&mut anonymous, &()).await.unwrap();
        assert_eq!(auth.user_id(), None);

        let mut garbage = parts_with(Some("Bearer not-a-jwt"));
        let err = MaybeAuth::from_request_parts(&mut garbage, &())
            .await
            .unwrap_err();
        assert_eq!(err.error, "invalid_token");
    }
}
