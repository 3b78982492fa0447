use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::api::UserId;

/// Sessions live entirely in the token: expiry is checked on every
/// verification and there is no server-side session state to revoke.
const TOKEN_TTL_SECONDS: i64 = 2 * 60 * 60;

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct Claims {
    pub user_id: UserId,
    pub username: String,
    pub email: String,
    /// Issued-at, seconds since unix epoch
    pub iat: i64,
    /// Expiry, seconds since unix epoch
    pub exp: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("Failed to encode token: {0}")]
    Encoding(#[from] jsonwebtoken::errors::Error),

    #[error("System clock is before unix epoch")]
    Clock,
}

/// Why a presented token was rejected. Callers treat all three the same way
/// (the request stays anonymous); the split exists for logging.
#[derive(Debug, Clone, Copy, Eq, PartialEq, thiserror::Error)]
pub enum InvalidToken {
    #[error("token expired")]
    Expired,
    #[error("signature mismatch")]
    BadSignature,
    #[error("malformed token")]
    Malformed,
}

/// Issues and verifies the signed identity tokens.
///
/// One instance is built from the configured secret at startup and injected
/// as app data; issuing never touches storage or any session registry.
#[derive(Clone)]
pub struct TokenService {
    secret: Vec<u8>,
    algorithm: Algorithm,
}

impl TokenService {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
            algorithm: Algorithm::HS256,
        }
    }

    /// Signs claims for the user, valid for two hours from `now`.
    pub fn issue(
        &self,
        user_id: UserId,
        username: &str,
        email: &str,
        now: SystemTime,
    ) -> Result<String, TokenError> {
        let iat = now
            .duration_since(UNIX_EPOCH)
            .map_err(|_| TokenError::Clock)?
            .as_secs() as i64;

        let claims = Claims {
            user_id,
            username: username.to_string(),
            email: email.to_string(),
            iat,
            exp: iat + TOKEN_TTL_SECONDS,
        };

        Ok(encode(
            &Header::new(self.algorithm),
            &claims,
            &EncodingKey::from_secret(&self.secret),
        )?)
    }

    /// Decodes a presented token, checking signature and expiry. Rejection is
    /// an ordinary return value, the caller decides how to react.
    pub fn verify(&self, token: &str) -> Result<Claims, InvalidToken> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(&self.secret),
            &Validation::new(self.algorithm),
        )
        .map(|data| data.claims)
        .map_err(|err| match err.kind() {
            ErrorKind::ExpiredSignature => InvalidToken::Expired,
            ErrorKind::InvalidSignature => InvalidToken::BadSignature,
            _ => InvalidToken::Malformed,
        })
    }
}

#[cfg(test)]
mod token_service_tests {
    use std::time::{Duration, SystemTime};

    use super::*;

    const TEST_SECRET: &[u8] = b"token-service-tests-secret";

    #[test]
    fn test_issue_and_verify_roundtrip() {
        let service = TokenService::new(TEST_SECRET);
        let now = SystemTime::now();

        let token = service
            .issue(7, "ada", "ada@example.com", now)
            .expect("Failed to issue token");
        let claims = service.verify(&token).expect("Failed to verify token");

        assert_eq!(claims.user_id, 7);
        assert_eq!(claims.username, "ada");
        assert_eq!(claims.email, "ada@example.com");
        assert_eq!(claims.exp, claims.iat + TOKEN_TTL_SECONDS);
    }

    #[test]
    fn test_verify_rejects_other_secret() {
        let issuing = TokenService::new(TEST_SECRET);
        let verifying = TokenService::new(b"a-different-secret".to_vec());

        let token = issuing
            .issue(7, "ada", "ada@example.com", SystemTime::now())
            .expect("Failed to issue token");

        assert_eq!(
            verifying.verify(&token),
            Err(InvalidToken::BadSignature),
            "Token signed with another secret must not verify"
        );
    }

    #[test]
    fn test_verify_rejects_expired_token() {
        let service = TokenService::new(TEST_SECRET);
        let three_hours_ago = SystemTime::now() - Duration::from_secs(3 * 60 * 60);

        let token = service
            .issue(7, "ada", "ada@example.com", three_hours_ago)
            .expect("Failed to issue token");

        assert_eq!(service.verify(&token), Err(InvalidToken::Expired));
    }

    #[test]
    fn test_verify_rejects_garbage() {
        let service = TokenService::new(TEST_SECRET);
        assert_eq!(
            service.verify("definitely-not-a-token"),
            Err(InvalidToken::Malformed)
        );
    }
}
