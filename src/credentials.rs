//! Password hashing and bearer token issuance.

use crate::config::AuthConfig;
use crate::error::{AppError, Result};
use anyhow::Context;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub id: String,
    pub iat: u64,
    pub exp: u64,
}

pub struct CredentialService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    config: AuthConfig,
}

impl CredentialService {
    pub fn new(config: AuthConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            config,
        }
    }

    pub async fn hash_password(&self, password: &str) -> Result<String> {
        let password = password.to_string();
        let cost = self.config.bcrypt_cost;
        let hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .context("Password hashing task failed")?
            .context("Failed to hash password")?;
        Ok(hash)
    }

    pub async fn verify_password(&self, password: &str, hash: &str) -> Result<bool> {
        let password = password.to_string();
        let hash = hash.to_string();
        let valid = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .context("Password verification task failed")?
            .context("Failed to verify password")?;
        Ok(valid)
    }

    pub fn issue_token(&self, user_id: &str) -> Result<String> {
        let now = jsonwebtoken::get_current_timestamp();
        let claims = Claims {
            id: user_id.to_string(),
            iat: now,
            exp: now.saturating_add(self.config.token_ttl.as_secs()),
        };
        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .context("Failed to sign token")?;
        Ok(token)
    }

    /// Returns the user id carried by a valid token. Any failure is
    /// `Unauthorized`.
    pub fn verify_token(&self, token: &str) -> Result<String> {
        let mut validation = Validation::default();
        validation.leeway = 0;

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims.id)
            .map_err(|e| {
                tracing::debug!(error = %e, "Token rejected");
                AppError::Unauthorized("Not authorized to access this route".to_string())
            })
    }
}
