//! Signed bearer tokens.
//!
//! Tokens are HS256 JWTs valid for 24 hours. Any other algorithm is rejected,
//! and expiry is checked without leeway.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use bookstore_core::{Role, UserId};

use crate::models::session::AuthContext;

/// How long an issued token stays valid.
pub const TOKEN_LIFETIME_HOURS: i64 = 24;

/// Token failures. All of them mean "not authenticated".
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,

    #[error("invalid token: {0}")]
    Invalid(String),

    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// JWT claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User ID.
    pub sub: UserId,
    pub email: String,
    pub role: Role,
    pub is_premium: bool,
    /// Issued at (Unix timestamp).
    pub iat: i64,
    /// Expiration (Unix timestamp).
    pub exp: i64,
}

impl From<Claims> for AuthContext {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email,
            role: claims.role,
            is_premium: claims.is_premium,
        }
    }
}

/// Issues and validates tokens with the server secret.
pub struct TokenManager {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager").finish_non_exhaustive()
    }
}

impl TokenManager {
    /// Create a token manager from the signing secret.
    #[must_use]
    pub fn new(secret: &SecretString) -> Self {
        let key = secret.expose_secret().as_bytes();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub", "iat"]);

        Self {
            encoding: EncodingKey::from_secret(key),
            decoding: DecodingKey::from_secret(key),
            validation,
        }
    }

    /// Issue a token for the given identity, valid from `now`.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Signing` if encoding fails.
    pub fn issue(
        &self,
        user_id: UserId,
        email: &str,
        role: Role,
        is_premium: bool,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let claims = Claims {
            sub: user_id,
            email: email.to_owned(),
            role,
            is_premium,
            iat: now.timestamp(),
            exp: (now + Duration::hours(TOKEN_LIFETIME_HOURS)).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Check signature, algorithm and expiry, and return the claims.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Expired` for expired tokens and
    /// `TokenError::Invalid` for anything else wrong with the token.
    pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e.to_string()),
            })
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
#[must_use]
pub fn extract_bearer(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn manager(secret: &str) -> TokenManager {
        TokenManager::new(&SecretString::from(secret.to_owned()))
    }

    const SECRET: &str = "k8#Qz!r2Lw@9Xv$Tn4&Bp7*Hj3^Mc6%Fd";

    #[test]
    fn test_round_trip() {
        let tokens = manager(SECRET);
        let user_id = UserId::generate();
        let token = tokens
            .issue(user_id, "reader@example.com", Role::Moderator, true, Utc::now())
            .unwrap();

        let claims = tokens.validate(&token).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.email, "reader@example.com");
        assert_eq!(claims.role, Role::Moderator);
        assert!(claims.is_premium);
        assert_eq!(claims.exp - claims.iat, TOKEN_LIFETIME_HOURS * 3600);

        let ctx = AuthContext::from(claims);
        assert_eq!(ctx.user_id, user_id);
    }

    #[test]
    fn test_expired_token_rejected() {
        let tokens = manager(SECRET);
        let issued = Utc::now() - Duration::hours(TOKEN_LIFETIME_HOURS + 1);
        let token = tokens
            .issue(UserId::generate(), "a@b.co", Role::Customer, false, issued)
            .unwrap();
        assert!(matches!(tokens.validate(&token), Err(TokenError::Expired)));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = manager(SECRET)
            .issue(UserId::generate(), "a@b.co", Role::Admin, false, Utc::now())
            .unwrap();
        let other = manager("another-secret-entirely-9f8e7d6c5b4a3210");
        assert!(matches!(other.validate(&token), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn test_other_algorithm_rejected() {
        let now = Utc::now();
        let claims = Claims {
            sub: UserId::generate(),
            email: "a@b.co".to_owned(),
            role: Role::Admin,
            is_premium: false,
            iat: now.timestamp(),
            exp: (now + Duration::hours(1)).timestamp(),
        };
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();
        assert!(matches!(
            manager(SECRET).validate(&token),
            Err(TokenError::Invalid(_))
        ));
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let tokens = manager(SECRET);
        let token = tokens
            .issue(UserId::generate(), "a@b.co", Role::Customer, false, Utc::now())
            .unwrap();
        let forged = tokens
            .issue(UserId::generate(), "a@b.co", Role::Admin, false, Utc::now())
            .unwrap();
        let parts: Vec<&str> = token.split('.').collect();
        let forged_payload = forged.split('.').nth(1).unwrap();
        let spliced = format!("{}.{forged_payload}.{}", parts[0], parts[2]);
        assert!(tokens.validate(&spliced).is_err());
        assert!(tokens.validate("not-a-token").is_err());
    }

    #[test]
    fn test_extract_bearer() {
        assert_eq!(extract_bearer("Bearer abc.def.ghi"), Some("abc.def.ghi"));
        assert_eq!(extract_bearer("bearer   xyz "), Some("xyz"));
        assert_eq!(extract_bearer("Basic dXNlcjpwYXNz"), None);
        assert_eq!(extract_bearer("Bearer "), None);
        assert_eq!(extract_bearer("Bearer"), None);
    }
}
