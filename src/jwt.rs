use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::principal::Principal;
use crate::Error;

const ALGORITHM: Algorithm = Algorithm::HS512;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// The principal's username (their email).
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// Why a token was refused. Only ever logged; callers of
/// [`TokenService::validate`] just see `false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("JWT claims string is empty")]
    Empty,
    #[error("Invalid JWT token")]
    Malformed,
    #[error("Invalid JWT signature")]
    InvalidSignature,
    #[error("JWT token is expired")]
    Expired,
    #[error("JWT token is unsupported")]
    UnsupportedAlgorithm,
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::InvalidSignature => TokenError::InvalidSignature,
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
                TokenError::UnsupportedAlgorithm
            }
            _ => TokenError::Malformed,
        }
    }
}

/// Signs and checks compact HS512 tokens whose subject is a username.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str, ttl_ms: u64) -> Self {
        let mut validation = Validation::new(ALGORITHM);
        // Expiry is checked against the caller's clock in `verify_at`.
        validation.validate_exp = false;
        validation.required_spec_claims = HashSet::new();
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl: Duration::milliseconds(i64::try_from(ttl_ms).unwrap_or(i64::MAX)),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.jwt_secret, config.jwt_expiration_ms)
    }

    pub fn issue(&self, principal: &Principal) -> Result<String, Error> {
        self.issue_at(principal, Utc::now())
    }

    pub fn issue_at(&self, principal: &Principal, now: DateTime<Utc>) -> Result<String, Error> {
        let expires_at = now
            .checked_add_signed(self.ttl)
            .ok_or_else(|| Error::InternalError {
                kind: "SigningError",
                message: "token expiration overflows".to_string(),
            })?;
        // Rounded up, so a sub-second lifetime still outlives the issue second.
        let mut exp = expires_at.timestamp();
        if expires_at.timestamp_subsec_nanos() > 0 {
            exp += 1;
        }
        let claims = Claims {
            sub: principal.username.clone(),
            iat: now.timestamp(),
            exp,
        };
        Ok(jsonwebtoken::encode(
            &Header::new(ALGORITHM),
            &claims,
            &self.encoding,
        )?)
    }

    pub fn validate(&self, token: &str) -> bool {
        self.validate_at(token, Utc::now())
    }

    pub fn validate_at(&self, token: &str, now: DateTime<Utc>) -> bool {
        match self.verify_at(token, now) {
            Ok(_) => true,
            Err(err) => {
                log::error!("{}", err);
                false
            }
        }
    }

    /// The subject of a token, after the same checks [`TokenService::validate`]
    /// performs. An invalid token never yields a subject.
    pub fn subject(&self, token: &str) -> Result<String, TokenError> {
        self.verify_at(token, Utc::now()).map(|claims| claims.sub)
    }

    /// Full verification: structure, algorithm, signature, then expiry. A token
    /// is expired from the second named in `exp` onwards.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        if token.trim().is_empty() {
            return Err(TokenError::Empty);
        }
        let header = jsonwebtoken::decode_header(token)?;
        if header.alg != ALGORITHM {
            return Err(TokenError::UnsupportedAlgorithm);
        }
        let claims =
            jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)?.claims;
        if now.timestamp() >= claims.exp {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const SECRET: &str = "testSecret";

    fn principal() -> Principal {
        Principal {
            id: 1,
            username: "alice@example.com".to_string(),
            first_name: "Alice".to_string(),
            last_name: "Liddell".to_string(),
            admin: false,
            password_hash: String::new(),
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn issued_token_is_three_base64url_segments() {
        let token = TokenService::new(SECRET, 60_000)
            .issue_at(&principal(), t0())
            .unwrap();
        let parts: Vec<&str> = token.split('.').collect();
        assert_eq!(parts.len(), 3);
        assert!(parts.iter().all(|p| !p.is_empty()
            && p.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')));
    }

    #[test]
    fn claims_carry_subject_and_lifetime() {
        let tokens = TokenService::new(SECRET, 60_000);
        let token = tokens.issue_at(&principal(), t0()).unwrap();
        let claims = tokens.verify_at(&token, t0()).unwrap();
        assert_eq!(claims.sub, "alice@example.com");
        assert_eq!(claims.iat, 1_700_000_000);
        assert_eq!(claims.exp, 1_700_000_060);
    }

    #[test]
    fn valid_until_ttl_elapses() {
        let tokens = TokenService::new(SECRET, 60_000);
        let token = tokens.issue_at(&principal(), t0()).unwrap();
        assert!(tokens.validate_at(&token, t0()));
        assert!(tokens.validate_at(&token, t0() + Duration::seconds(59)));
        assert_eq!(
            tokens.verify_at(&token, t0() + Duration::seconds(60)),
            Err(TokenError::Expired)
        );
        assert!(!tokens.validate_at(&token, t0() + Duration::seconds(61)));
    }

    #[test]
    fn sub_second_lifetime_is_valid_at_issue() {
        let tokens = TokenService::new(SECRET, 500);
        let token = tokens.issue_at(&principal(), t0()).unwrap();
        assert!(tokens.validate_at(&token, t0()));
        assert_eq!(
            tokens.verify_at(&token, t0() + Duration::seconds(1)),
            Err(TokenError::Expired)
        );

        let late = t0() + Duration::milliseconds(900);
        let token = tokens.issue_at(&principal(), late).unwrap();
        assert!(tokens.validate_at(&token, late));
    }

    #[test]
    fn fresh_token_yields_subject() {
        let tokens = TokenService::new(SECRET, 60_000);
        let token = tokens.issue(&principal()).unwrap();
        assert!(tokens.validate(&token));
        assert_eq!(tokens.subject(&token).unwrap(), "alice@example.com");
    }

    #[test]
    fn garbage_and_empty_are_refused() {
        let tokens = TokenService::new(SECRET, 60_000);
        assert_eq!(tokens.verify_at("invalidToken", t0()), Err(TokenError::Malformed));
        assert_eq!(tokens.verify_at("", t0()), Err(TokenError::Empty));
        assert_eq!(tokens.verify_at("   ", t0()), Err(TokenError::Empty));
        assert!(!tokens.validate("invalidToken"));
        assert!(tokens.subject("").is_err());
    }

    #[test]
    fn foreign_secret_fails_signature() {
        let token = TokenService::new("otherSecret", 60_000)
            .issue_at(&principal(), t0())
            .unwrap();
        let tokens = TokenService::new(SECRET, 60_000);
        assert_eq!(
            tokens.verify_at(&token, t0()),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn tampered_payload_fails_signature() {
        let tokens = TokenService::new(SECRET, 60_000);
        let token = tokens.issue_at(&principal(), t0()).unwrap();
        let forged_claims = Claims {
            sub: "mallory@example.com".to_string(),
            iat: 1_700_000_000,
            exp: 1_700_000_060,
        };
        let forged = jsonwebtoken::encode(
            &Header::new(ALGORITHM),
            &forged_claims,
            &EncodingKey::from_secret(b"guess"),
        )
        .unwrap();
        let mut parts: Vec<&str> = token.split('.').collect();
        let forged_payload = forged.split('.').nth(1).unwrap();
        parts[1] = forged_payload;
        assert_eq!(
            tokens.verify_at(&parts.join("."), t0()),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn other_algorithms_are_unsupported() {
        let claims = Claims {
            sub: "alice@example.com".to_string(),
            iat: 1_700_000_000,
            exp: 1_700_000_060,
        };
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();
        let tokens = TokenService::new(SECRET, 60_000);
        assert_eq!(
            tokens.verify_at(&token, t0()),
            Err(TokenError::UnsupportedAlgorithm)
        );
    }
}
