//! Signed session tokens.
//!
//! Compact JWS-style tokens signed with HMAC-SHA256. Expiry (`exp`) is
//! enforced here; whether the credential behind a live token is still
//! fresh is the validity gate's concern, not the signer's.

use base64ct::{Base64UrlUnpadded, Encoding};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use uuid::Uuid;

/// Claims layout version. Bump when the claims struct changes shape.
pub const TOKEN_VERSION: u8 = 1;

const MIN_KEY_BYTES: usize = 32;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("signing key must be at least {MIN_KEY_BYTES} bytes")]
    WeakKey,
    #[error("invalid token format")]
    TokenFormat,
    #[error("invalid base64url encoding")]
    Base64,
    #[error("invalid json payload")]
    Json,
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlg(String),
    #[error("invalid signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
    #[error("invalid token version")]
    InvalidVersion,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct TokenHeader {
    alg: String,
    typ: String,
}

impl TokenHeader {
    fn hs256() -> Self {
        Self {
            alg: "HS256".to_string(),
            typ: "JWT".to_string(),
        }
    }
}

/// Verified session claims.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionClaims {
    /// Claims layout version.
    pub v: u8,
    /// Account the session belongs to.
    pub sub: Uuid,
    /// Issuance instant, unix seconds. The validity gate compares this
    /// against the account's credential-change timestamp.
    pub iat: i64,
    /// Expiry instant, unix seconds.
    pub exp: i64,
}

fn b64e_json<T: Serialize>(value: &T) -> Result<String, TokenError> {
    let json = serde_json::to_vec(value).map_err(|_| TokenError::Json)?;
    Ok(Base64UrlUnpadded::encode_string(&json))
}

fn b64d_json<T: for<'de> Deserialize<'de>>(encoded: &str) -> Result<T, TokenError> {
    let bytes = Base64UrlUnpadded::decode_vec(encoded).map_err(|_| TokenError::Base64)?;
    serde_json::from_slice(&bytes).map_err(|_| TokenError::Json)
}

/// Issues and verifies session tokens with a single symmetric key.
#[derive(Debug)]
pub struct SessionSigner {
    key: SecretString,
    token_ttl_seconds: i64,
}

impl SessionSigner {
    /// # Errors
    ///
    /// Returns [`TokenError::WeakKey`] when the key is shorter than 32
    /// bytes.
    pub fn new(key: SecretString, token_ttl_seconds: i64) -> Result<Self, TokenError> {
        if key.expose_secret().len() < MIN_KEY_BYTES {
            return Err(TokenError::WeakKey);
        }
        Ok(Self {
            key,
            token_ttl_seconds,
        })
    }

    fn mac(&self) -> Result<HmacSha256, TokenError> {
        HmacSha256::new_from_slice(self.key.expose_secret().as_bytes())
            .map_err(|_| TokenError::WeakKey)
    }

    /// Mint a signed token for `subject` issued at `issued_at`.
    ///
    /// # Errors
    ///
    /// Fails only when the key or claims cannot be encoded.
    pub fn issue(&self, subject: Uuid, issued_at: i64) -> Result<String, TokenError> {
        let claims = SessionClaims {
            v: TOKEN_VERSION,
            sub: subject,
            iat: issued_at,
            exp: issued_at + self.token_ttl_seconds,
        };

        let header_b64 = b64e_json(&TokenHeader::hs256())?;
        let claims_b64 = b64e_json(&claims)?;
        let signing_input = format!("{header_b64}.{claims_b64}");

        let mut mac = self.mac()?;
        mac.update(signing_input.as_bytes());
        let signature_b64 = Base64UrlUnpadded::encode_string(&mac.finalize().into_bytes());

        Ok(format!("{signing_input}.{signature_b64}"))
    }

    /// Verify a token's structure, signature, version, and expiry, in that
    /// order, and return its claims.
    ///
    /// # Errors
    ///
    /// One [`TokenError`] variant per failed check.
    pub fn verify(&self, token: &str, now: i64) -> Result<SessionClaims, TokenError> {
        let mut parts = token.split('.');
        let header_b64 = parts.next().ok_or(TokenError::TokenFormat)?;
        let claims_b64 = parts.next().ok_or(TokenError::TokenFormat)?;
        let signature_b64 = parts.next().ok_or(TokenError::TokenFormat)?;
        if parts.next().is_some() {
            return Err(TokenError::TokenFormat);
        }

        let header: TokenHeader = b64d_json(header_b64)?;
        if header.alg != "HS256" {
            return Err(TokenError::UnsupportedAlg(header.alg));
        }

        let signature =
            Base64UrlUnpadded::decode_vec(signature_b64).map_err(|_| TokenError::Base64)?;
        let mut mac = self.mac()?;
        mac.update(format!("{header_b64}.{claims_b64}").as_bytes());
        // verify_slice is constant-time.
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::InvalidSignature)?;

        let claims: SessionClaims = b64d_json(claims_b64)?;
        if claims.v != TOKEN_VERSION {
            return Err(TokenError::InvalidVersion);
        }
        if claims.exp <= now {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }

    #[must_use]
    pub fn token_ttl_seconds(&self) -> i64 {
        self.token_ttl_seconds
    }
}

#[cfg(test)]
mod tests {
    use super::{b64e_json, SessionClaims, SessionSigner, TokenError, TokenHeader, TOKEN_VERSION};
    use base64ct::{Base64UrlUnpadded, Encoding};
    use hmac::{Hmac, Mac};
    use secrecy::SecretString;
    use sha2::Sha256;
    use uuid::Uuid;

    const KEY: &str = "0123456789abcdef0123456789abcdef";
    const OTHER_KEY: &str = "fedcba9876543210fedcba9876543210";

    fn signer(key: &str) -> SessionSigner {
        SessionSigner::new(SecretString::from(key.to_string()), 3_600).unwrap()
    }

    fn sign_with(key: &str, header: &TokenHeader, claims: &SessionClaims) -> String {
        let signing_input = format!(
            "{}.{}",
            b64e_json(header).unwrap(),
            b64e_json(claims).unwrap()
        );
        let mut mac = Hmac::<Sha256>::new_from_slice(key.as_bytes()).unwrap();
        mac.update(signing_input.as_bytes());
        let signature = Base64UrlUnpadded::encode_string(&mac.finalize().into_bytes());
        format!("{signing_input}.{signature}")
    }

    #[test]
    fn test_round_trip() {
        let signer = signer(KEY);
        let subject = Uuid::new_v4();
        let token = signer.issue(subject, 1_000).unwrap();
        let claims = signer.verify(&token, 1_001).unwrap();
        assert_eq!(claims.v, TOKEN_VERSION);
        assert_eq!(claims.sub, subject);
        assert_eq!(claims.iat, 1_000);
        assert_eq!(claims.exp, 4_600);
    }

    #[test]
    fn test_weak_key_rejected() {
        let err = SessionSigner::new(SecretString::from("short".to_string()), 3_600).unwrap_err();
        assert_eq!(err, TokenError::WeakKey);
    }

    #[test]
    fn test_malformed_tokens_rejected() {
        let signer = signer(KEY);
        assert_eq!(signer.verify("", 0).unwrap_err(), TokenError::TokenFormat);
        assert_eq!(
            signer.verify("only-one-part", 0).unwrap_err(),
            TokenError::TokenFormat
        );
        assert_eq!(
            signer.verify("a.b.c.d", 0).unwrap_err(),
            TokenError::TokenFormat
        );
        assert_eq!(
            signer.verify("!!!.???.###", 0).unwrap_err(),
            TokenError::Base64
        );
    }

    #[test]
    fn test_wrong_key_rejected() {
        let token = signer(KEY).issue(Uuid::new_v4(), 1_000).unwrap();
        assert_eq!(
            signer(OTHER_KEY).verify(&token, 1_001).unwrap_err(),
            TokenError::InvalidSignature
        );
    }

    #[test]
    fn test_tampered_claims_rejected() {
        let signer = signer(KEY);
        let token = signer.issue(Uuid::new_v4(), 1_000).unwrap();
        let claims = SessionClaims {
            v: TOKEN_VERSION,
            sub: Uuid::new_v4(),
            iat: 1_000,
            exp: 4_600,
        };
        let mut parts: Vec<&str> = token.split('.').collect();
        let forged_claims = b64e_json(&claims).unwrap();
        parts[1] = &forged_claims;
        assert_eq!(
            signer.verify(&parts.join("."), 1_001).unwrap_err(),
            TokenError::InvalidSignature
        );
    }

    #[test]
    fn test_expired_token_rejected() {
        let signer = signer(KEY);
        let token = signer.issue(Uuid::new_v4(), 1_000).unwrap();
        assert!(signer.verify(&token, 4_599).is_ok());
        assert_eq!(
            signer.verify(&token, 4_600).unwrap_err(),
            TokenError::Expired
        );
    }

    #[test]
    fn test_unsupported_algorithm_rejected() {
        let header = TokenHeader {
            alg: "none".to_string(),
            typ: "JWT".to_string(),
        };
        let claims = SessionClaims {
            v: TOKEN_VERSION,
            sub: Uuid::new_v4(),
            iat: 1_000,
            exp: 4_600,
        };
        let token = sign_with(KEY, &header, &claims);
        assert_eq!(
            signer(KEY).verify(&token, 1_001).unwrap_err(),
            TokenError::UnsupportedAlg("none".to_string())
        );
    }

    #[test]
    fn test_unknown_version_rejected() {
        let header = TokenHeader::hs256();
        let claims = SessionClaims {
            v: TOKEN_VERSION + 1,
            sub: Uuid::new_v4(),
            iat: 1_000,
            exp: 4_600,
        };
        let token = sign_with(KEY, &header, &claims);
        assert_eq!(
            signer(KEY).verify(&token, 1_001).unwrap_err(),
            TokenError::InvalidVersion
        );
    }
}
