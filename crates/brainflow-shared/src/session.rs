//! Signed bearer tokens.
//!
//! A token is `<claims>.<signature>`: the JSON claims and their Ed25519
//! signature, each URL-safe base64 without padding. Access and refresh
//! tokens share the format and differ only in `kind` and lifetime.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};

use crate::constants::{ACCESS_TOKEN_MINUTES, REFRESH_TOKEN_DAYS, SIGNING_SEED_SIZE};
use crate::error::TokenError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    pub kind: TokenKind,
    pub expires: DateTime<Utc>,
}

/// An access/refresh pair as handed to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
}

#[derive(Clone)]
pub struct TokenSigner {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenSigner {
    pub fn new(seed: [u8; SIGNING_SEED_SIZE]) -> Self {
        let signing_key = SigningKey::from_bytes(&seed);
        let verifying_key = signing_key.verifying_key();
        Self {
            signing_key,
            verifying_key,
            access_ttl: Duration::minutes(ACCESS_TOKEN_MINUTES),
            refresh_ttl: Duration::days(REFRESH_TOKEN_DAYS),
        }
    }

    /// A signer with a fresh key. Tokens do not survive a restart.
    pub fn generate() -> Self {
        Self::new(SigningKey::generate(&mut OsRng).to_bytes())
    }

    /// Parse a 64-char hex seed.
    pub fn from_hex(seed_hex: &str) -> Option<Self> {
        let bytes = hex::decode(seed_hex.trim()).ok()?;
        let seed: [u8; SIGNING_SEED_SIZE] = bytes.try_into().ok()?;
        Some(Self::new(seed))
    }

    pub fn with_lifetimes(mut self, access: Duration, refresh: Duration) -> Self {
        self.access_ttl = access;
        self.refresh_ttl = refresh;
        self
    }

    pub fn issue(&self, user_id: &str, kind: TokenKind, now: DateTime<Utc>) -> String {
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let claims = Claims {
            sub: user_id.to_string(),
            kind,
            expires: now + ttl,
        };
        // Serializing a struct of strings and a timestamp cannot fail
        let payload = serde_json::to_vec(&claims).unwrap_or_default();
        let signature = self.signing_key.sign(&payload);
        format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(&payload),
            URL_SAFE_NO_PAD.encode(signature.to_bytes())
        )
    }

    pub fn issue_pair(&self, user_id: &str, now: DateTime<Utc>) -> TokenPair {
        TokenPair {
            access_token: self.issue(user_id, TokenKind::Access, now),
            refresh_token: self.issue(user_id, TokenKind::Refresh, now),
            token_type: "bearer".to_string(),
        }
    }

    /// Verify signature, expiry and kind; return the claims.
    pub fn verify(
        &self,
        token: &str,
        expected: TokenKind,
        now: DateTime<Utc>,
    ) -> Result<Claims, TokenError> {
        let (payload_b64, signature_b64) = token.split_once('.').ok_or(TokenError::Malformed)?;
        let payload = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|_| TokenError::Malformed)?;
        let signature_bytes = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| TokenError::Malformed)?;
        let signature =
            Signature::from_slice(&signature_bytes).map_err(|_| TokenError::Malformed)?;

        self.verifying_key
            .verify(&payload, &signature)
            .map_err(|_| TokenError::BadSignature)?;

        let claims: Claims = serde_json::from_slice(&payload).map_err(|_| TokenError::Malformed)?;
        if now >= claims.expires {
            return Err(TokenError::Expired);
        }
        if claims.kind != expected {
            return Err(TokenError::WrongKind {
                expected: expected.as_str(),
            });
        }
        Ok(claims)
    }
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner")
            .field("public_key", &hex::encode(self.verifying_key.to_bytes()))
            .finish()
    }
}
