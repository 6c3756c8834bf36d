//! Bearer token pass-through.
//!
//! The relay does not validate tokens; identity is the upstream services'
//! concern. It only insists that a bearer credential is present so nothing is
//! forwarded anonymously.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use pengajuan_core::AppError;

use crate::error::HttpAppError;

/// The caller's bearer token, forwarded verbatim to every outbound call.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(pub String);

impl std::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BearerToken(..)")
    }
}

impl BearerToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn from_header_value(value: &str) -> Result<Self, AppError> {
        let (scheme, token) = value
            .trim()
            .split_once(' ')
            .ok_or_else(invalid_scheme)?;
        if !scheme.eq_ignore_ascii_case("bearer") {
            return Err(invalid_scheme());
        }
        let token = token.trim();
        if token.is_empty() {
            return Err(AppError::Unauthorized("Bearer token is empty".to_string()));
        }
        Ok(BearerToken(token.to_string()))
    }
}

fn invalid_scheme() -> AppError {
    AppError::Unauthorized("Authorization header must use the Bearer scheme".to_string())
}

// Extracted from parts so it runs before the multipart body is touched.
impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = HttpAppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or_else(|| AppError::Unauthorized("Missing authorization header".to_string()))?;
        let value = header.to_str().map_err(|_| invalid_scheme())?;
        Ok(BearerToken::from_header_value(value)?)
    }
}
