//! Admin mutation authorization.
//!
//! Every mutating call presents the shared secret as a bearer token. A
//! mismatch is rejected before the store is touched, so an unauthorized
//! call can never leave a partial effect.

use axum::http::HeaderMap;

/// Shared-secret check for curator mutations.
#[derive(Clone)]
pub struct AdminAuth {
    token: String,
}

impl AdminAuth {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// Authorize a request by its `Authorization: Bearer <token>` header.
    pub fn authorize(&self, headers: &HeaderMap) -> Result<(), AuthError> {
        let presented = headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or(AuthError::Unauthorized)?;

        if presented == self.token {
            Ok(())
        } else {
            Err(AuthError::Unauthorized)
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing or invalid admin token")]
    Unauthorized,
}
