//! Self-contained signed tokens.
//!
//! A token is `<claims>.<signature>`: the claims record serialized as JSON and base64url
//! encoded, followed by the base64url HMAC-SHA256 of that encoded segment. Any instance holding
//! the shared secret can validate a token on its own, so no session state is kept anywhere.

use std::time::Duration;

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, crypto};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Principal, RoleSet};

const SEGMENT_DELIMITER: char = '.';

/// Claims
///
/// The payload carried inside a token. Only handed out by [`TokenService::validate`] after the
/// signature has been checked, so holding a `Claims` value means it was issued with our secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Claims {
    /// The principal's opaque id.
    pub subject: String,
    pub roles: RoleSet,
    /// Unix seconds.
    pub issued_at: i64,
    /// Unix seconds. The token is accepted up to and including this instant.
    pub expires_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("token is not two well-formed segments")]
    MalformedToken,
    #[error("token signature does not match its claims")]
    SignatureInvalid,
    #[error("token expired")]
    Expired,
    #[error("token ttl must be at least one second")]
    InvalidTtl,
    #[error("signing backend failure: {0}")]
    Signing(String),
}

/// The signing primitive behind the token service.
///
/// `sign` returns the signature already text-encoded; `verify` must compare in constant time.
pub trait TokenSigner: Send + Sync {
    fn sign(&self, payload: &[u8]) -> Result<String, TokenError>;
    fn verify(&self, payload: &[u8], signature: &str) -> bool;
}

/// HMAC-SHA256 signer backed by `jsonwebtoken`'s crypto provider.
#[derive(Clone)]
pub struct HmacSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl HmacSigner {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }
}

impl TokenSigner for HmacSigner {
    fn sign(&self, payload: &[u8]) -> Result<String, TokenError> {
        crypto::sign(payload, &self.encoding, Algorithm::HS256)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    fn verify(&self, payload: &[u8], signature: &str) -> bool {
        // Undecodable signatures surface as errors from the backend and count as a mismatch.
        crypto::verify(signature, payload, &self.decoding, Algorithm::HS256).unwrap_or(false)
    }
}

/// TokenService
///
/// Issues and validates tokens. Holds nothing but the signer, so a single instance is shared
/// read-only by every in-flight request.
pub struct TokenService {
    signer: Box<dyn TokenSigner>,
}

impl TokenService {
    pub fn new(signer: impl TokenSigner + 'static) -> Self {
        Self {
            signer: Box::new(signer),
        }
    }

    /// Convenience constructor for the HMAC signer over a shared secret.
    pub fn with_secret(secret: &[u8]) -> Self {
        Self::new(HmacSigner::new(secret))
    }

    /// Issues a token for `principal` valid for `ttl` from now.
    pub fn issue(&self, principal: &Principal, ttl: Duration) -> Result<String, TokenError> {
        self.issue_at(principal, ttl, Utc::now().timestamp())
    }

    /// Issues a token as if the current time were `now` (unix seconds).
    pub fn issue_at(
        &self,
        principal: &Principal,
        ttl: Duration,
        now: i64,
    ) -> Result<String, TokenError> {
        let ttl_secs = i64::try_from(ttl.as_secs()).map_err(|_| TokenError::InvalidTtl)?;
        if ttl_secs == 0 {
            return Err(TokenError::InvalidTtl);
        }
        let expires_at = now.checked_add(ttl_secs).ok_or(TokenError::InvalidTtl)?;

        let claims = Claims {
            subject: principal.id().to_string(),
            roles: principal.roles().clone(),
            issued_at: now,
            expires_at,
        };
        self.sign(&claims)
    }

    /// Encodes and signs an arbitrary claims record.
    pub fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        let json = serde_json::to_vec(claims).map_err(|e| TokenError::Signing(e.to_string()))?;
        let encoded_claims = URL_SAFE_NO_PAD.encode(json);
        let signature = self.signer.sign(encoded_claims.as_bytes())?;
        Ok(format!("{encoded_claims}{SEGMENT_DELIMITER}{signature}"))
    }

    /// Validates `token` against the current time.
    pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        self.validate_at(token, Utc::now().timestamp())
    }

    /// Validates `token` as if the current time were `now` (unix seconds).
    ///
    /// Checks run in a fixed order: structure, signature, claims decoding, expiry. The signature
    /// is checked before anything in the claims segment is parsed.
    pub fn validate_at(&self, token: &str, now: i64) -> Result<Claims, TokenError> {
        let mut segments = token.split(SEGMENT_DELIMITER);
        let (Some(encoded_claims), Some(signature), None) =
            (segments.next(), segments.next(), segments.next())
        else {
            return Err(TokenError::MalformedToken);
        };
        if encoded_claims.is_empty() || signature.is_empty() {
            return Err(TokenError::MalformedToken);
        }

        if !self.signer.verify(encoded_claims.as_bytes(), signature) {
            return Err(TokenError::SignatureInvalid);
        }

        let json = URL_SAFE_NO_PAD
            .decode(encoded_claims)
            .map_err(|_| TokenError::MalformedToken)?;
        let claims: Claims =
            serde_json::from_slice(&json).map_err(|_| TokenError::MalformedToken)?;

        if now > claims.expires_at {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }
}
