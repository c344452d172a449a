//! Bearer tokens.
//!
//! Compact HS256 JWTs: `base64url(header).base64url(claims).base64url(sig)`
//! without padding, where the signature is HMAC-SHA256 over the first two
//! segments. Only HS256 is accepted.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

use joestar_core::{Email, UserId};

type HmacSha256 = Hmac<Sha256>;

const HEADER: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

/// Errors from verifying or issuing a token.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,

    #[error("invalid token signature")]
    InvalidSignature,

    #[error("token expired")]
    Expired,

    #[error("failed to encode token: {0}")]
    Encoding(String),
}

/// Claims carried by an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub user_id: UserId,
    pub email: Email,
    /// Issued at, seconds since the epoch.
    pub iat: i64,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
}

#[derive(Deserialize)]
struct Header {
    alg: String,
}

/// Issues and verifies access tokens with a shared secret.
#[derive(Clone)]
pub struct TokenService {
    secret: SecretString,
    ttl: Duration,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("secret", &"[REDACTED]")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl TokenService {
    #[must_use]
    pub const fn new(secret: SecretString, ttl: Duration) -> Self {
        Self { secret, ttl }
    }

    /// Issue a token for a user, valid from `now` for the configured lifetime.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Encoding` if the claims cannot be serialized.
    pub fn issue(
        &self,
        user_id: UserId,
        email: &Email,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let claims = Claims {
            user_id,
            email: email.clone(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        let payload =
            serde_json::to_vec(&claims).map_err(|e| TokenError::Encoding(e.to_string()))?;

        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(HEADER),
            URL_SAFE_NO_PAD.encode(payload)
        );
        let signature = URL_SAFE_NO_PAD.encode(self.mac(&signing_input)?.finalize().into_bytes());

        Ok(format!("{signing_input}.{signature}"))
    }

    /// Verify a token's signature and expiry at `now`.
    ///
    /// # Errors
    ///
    /// Returns `Malformed` for anything that isn't a three-part HS256 token,
    /// `InvalidSignature` when the signature doesn't match and `Expired` once
    /// `now` reaches `exp`.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        let (signing_input, signature) = token.rsplit_once('.').ok_or(TokenError::Malformed)?;
        let (header, payload) = signing_input
            .split_once('.')
            .ok_or(TokenError::Malformed)?;
        if payload.contains('.') {
            return Err(TokenError::Malformed);
        }

        let header: Header = decode_segment(header)?;
        if header.alg != "HS256" {
            return Err(TokenError::Malformed);
        }

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| TokenError::Malformed)?;
        self.mac(signing_input)?
            .verify_slice(&signature)
            .map_err(|_| TokenError::InvalidSignature)?;

        let claims: Claims = decode_segment(payload)?;
        if now.timestamp() >= claims.exp {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }

    fn mac(&self, signing_input: &str) -> Result<HmacSha256, TokenError> {
        let mut mac = HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|e| TokenError::Encoding(e.to_string()))?;
        mac.update(signing_input.as_bytes());
        Ok(mac)
    }
}

fn decode_segment<T: for<'de> Deserialize<'de>>(segment: &str) -> Result<T, TokenError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| TokenError::Malformed)?;
    serde_json::from_slice(&bytes).map_err(|_| TokenError::Malformed)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new(
            SecretString::from("k8Jz2Qm4Vx7Np1Rt5Yw9Bc3Df6Gh0LsA"),
            Duration::hours(168),
        )
    }

    fn email() -> Email {
        Email::parse("jotaro@example.com").unwrap()
    }

    #[test]
    fn test_issue_and_verify() {
        let tokens = service();
        let now = Utc::now();
        let token = tokens.issue(UserId::new(7), &email(), now).unwrap();

        assert_eq!(token.split('.').count(), 3);
        let claims = tokens.verify(&token, now).unwrap();
        assert_eq!(claims.user_id, UserId::new(7));
        assert_eq!(claims.email, email());
        assert_eq!(claims.exp - claims.iat, 168 * 3600);
    }

    #[test]
    fn test_expired_token_rejected() {
        let tokens = service();
        let issued = Utc::now() - Duration::hours(200);
        let token = tokens.issue(UserId::new(1), &email(), issued).unwrap();
        assert_eq!(tokens.verify(&token, Utc::now()), Err(TokenError::Expired));
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let tokens = service();
        let now = Utc::now();
        let token = tokens.issue(UserId::new(1), &email(), now).unwrap();

        let forged_claims = Claims {
            user_id: UserId::new(2),
            email: email(),
            iat: now.timestamp(),
            exp: now.timestamp() + 3600,
        };
        let forged_payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged_claims).unwrap());
        let mut parts: Vec<&str> = token.split('.').collect();
        parts[1] = &forged_payload;
        let forged = parts.join(".");

        assert_eq!(
            tokens.verify(&forged, now),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn test_other_secret_rejected() {
        let now = Utc::now();
        let token = service().issue(UserId::new(1), &email(), now).unwrap();
        let other = TokenService::new(
            SecretString::from("Zq4Wm8Np2Xv6Bt0Ry3Kc7Hf1Ls5Dg9Ja"),
            Duration::hours(1),
        );
        assert_eq!(other.verify(&token, now), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn test_malformed_tokens() {
        let tokens = service();
        let now = Utc::now();
        assert_eq!(tokens.verify("", now), Err(TokenError::Malformed));
        assert_eq!(tokens.verify("a.b", now), Err(TokenError::Malformed));
        assert_eq!(tokens.verify("a.b.c.d", now), Err(TokenError::Malformed));
        assert_eq!(tokens.verify("!!!.b.c", now), Err(TokenError::Malformed));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let debug = format!("{:?}", service());
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("k8Jz2Qm4"));
    }
}
