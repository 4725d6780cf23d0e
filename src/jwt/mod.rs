//! Bearer-token signing and verification for authenticated requests.

use jwt_simple::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

const TOKEN_VALIDITY_DAYS: u64 = 30;

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthClaims {
    pub user_id: String,
}

#[derive(Clone)]
pub struct JwtKeys {
    key: HS256Key,
}

impl JwtKeys {
    pub fn from_secret(secret: &str) -> Self {
        Self {
            key: HS256Key::from_bytes(secret.as_bytes()),
        }
    }

    pub fn sign(&self, user_id: &str) -> Result<String> {
        let claims = Claims::with_custom_claims(
            AuthClaims {
                user_id: user_id.to_string(),
            },
            Duration::from_days(TOKEN_VALIDITY_DAYS),
        );
        self.key
            .authenticate(claims)
            .map_err(|e| AppError::Internal(format!("token signing failed: {e}")))
    }

    pub fn verify(&self, token: &str) -> Result<AuthClaims> {
        let claims = self
            .key
            .verify_token::<AuthClaims>(token, None)
            .map_err(|_| AppError::Unauthorized("Invalid or expired token".into()))?;
        Ok(claims.custom)
    }
}
