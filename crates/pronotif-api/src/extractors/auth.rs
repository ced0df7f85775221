//! `AuthAccount` extractor: pulls the bearer token from the Authorization
//! header and validates it.

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;

use pronotif_core::AccountKey;
use pronotif_core::error::AppError;

use crate::error::ApiError;
use crate::state::AppState;

/// Authenticated account available in handlers.
#[derive(Debug, Clone)]
pub struct AuthAccount {
    /// The account the token was issued for.
    pub key: AccountKey,
    /// The device token bound to the bearer token, if any.
    pub device: Option<String>,
}

impl AuthAccount {
    /// The bound device token, required by device-scoped routes.
    pub fn device(&self) -> Result<&str, ApiError> {
        self.device
            .as_deref()
            .ok_or_else(|| AppError::validation("No device is bound to this token").into())
    }
}

impl FromRequestParts<AppState> for AuthAccount {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)?;
        let claims = state
            .jwt_decoder
            .decode(token)
            .map_err(|e| ApiError::unauthorized(e.message))?;

        Ok(AuthAccount {
            key: claims.account_key(),
            device: claims.device,
        })
    }
}

/// The raw bearer token of the Authorization header.
pub(crate) fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::unauthorized("Missing Authorization header"))?
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::unauthorized("Invalid Authorization header format"))
}
