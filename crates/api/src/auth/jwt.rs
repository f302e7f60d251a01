//! Session-bound JWT access tokens.
//!
//! Tokens are HS256-signed and carry the usercode as `sub` plus a random
//! `jti`. Login stores the SHA-256 of the `jti` in `user_sessions`; a token is
//! only honoured while that row is active, which is what makes logout work.

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// JWT claims embedded in every access token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject -- the user's usercode.
    pub sub: String,
    /// Expiration time (UTC Unix timestamp).
    pub exp: i64,
    /// Issued-at time (UTC Unix timestamp).
    pub iat: i64,
    /// Session identifier (UUID v4).
    pub jti: String,
}

/// Configuration for JWT token generation and validation.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// HMAC-SHA256 secret used to sign and verify tokens.
    pub secret: String,
    /// Session lifetime in hours (default: 8).
    pub session_expiry_hours: i64,
}

/// Default session lifetime in hours.
const DEFAULT_SESSION_EXPIRY_HOURS: i64 = 8;

impl JwtConfig {
    /// Load JWT configuration from environment variables.
    ///
    /// | Env Var                    | Required | Default |
    /// |----------------------------|----------|---------|
    /// | `JWT_SECRET`               | **yes**  | --      |
    /// | `JWT_SESSION_EXPIRY_HOURS` | no       | `8`     |
    ///
    /// # Panics
    ///
    /// Panics if `JWT_SECRET` is not set or is empty.
    pub fn from_env() -> Self {
        let secret =
            std::env::var("JWT_SECRET").expect("JWT_SECRET must be set in the environment");
        assert!(!secret.is_empty(), "JWT_SECRET must not be empty");

        let session_expiry_hours: i64 = std::env::var("JWT_SESSION_EXPIRY_HOURS")
            .unwrap_or_else(|_| DEFAULT_SESSION_EXPIRY_HOURS.to_string())
            .parse()
            .expect("JWT_SESSION_EXPIRY_HOURS must be a valid i64");

        Self {
            secret,
            session_expiry_hours,
        }
    }

    /// Session lifetime in seconds, as reported to clients.
    pub fn expires_in_secs(&self) -> i64 {
        self.session_expiry_hours * 3600
    }
}

/// A freshly signed token and the session facts to persist alongside it.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    /// SHA-256 hex of the `jti`; the `user_sessions.token_hash` value.
    pub session_hash: String,
    pub expires_at: DateTime<Utc>,
}

/// Sign an access token for `usercode` with a new session id.
pub fn generate_access_token(
    usercode: &str,
    config: &JwtConfig,
) -> Result<IssuedToken, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let expires_at = now + chrono::Duration::hours(config.session_expiry_hours);

    let claims = Claims {
        sub: usercode.to_string(),
        exp: expires_at.timestamp(),
        iat: now.timestamp(),
        jti: Uuid::new_v4().to_string(),
    };

    let token = encode(
        &Header::default(), // HS256
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )?;

    Ok(IssuedToken {
        token,
        session_hash: hash_session_id(&claims.jti),
        expires_at,
    })
}

/// Validate and decode an access token, returning the embedded [`Claims`].
///
/// Checks the signature and expiration; session state is checked separately.
pub fn validate_token(
    token: &str,
    config: &JwtConfig,
) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &Validation::default(), // HS256, validates exp
    )?;
    Ok(token_data.claims)
}

/// SHA-256 hex digest of a session id.
pub fn hash_session_id(jti: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(jti.as_bytes());
    format!("{:x}", hasher.finalize())
}
