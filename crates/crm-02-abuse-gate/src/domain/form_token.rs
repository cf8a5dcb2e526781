//! Signed, time-stamped form tokens.
//!
//! ## Layout
//!
//! ```text
//! base64url( issued_at: i64 BE (8) ‖ nonce (16) ‖ HMAC-SHA256(key, issued_at ‖ nonce) (32) )
//! ```
//!
//! Tokens are stateless: verification needs only the key and the clock. The
//! issue time doubles as the form-fill timer for the minimum fill time check.

use crate::domain::config::ConfigError;
use crate::domain::errors::TokenError;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use crm_types::Clock;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use std::sync::Arc;
use std::time::Duration;

type HmacSha256 = Hmac<Sha256>;

const TIMESTAMP_LEN: usize = 8;
const NONCE_LEN: usize = 16;
const TAG_LEN: usize = 32;
const TOKEN_LEN: usize = TIMESTAMP_LEN + NONCE_LEN + TAG_LEN;

/// Maximum allowed clock skew for future timestamps (seconds).
pub const MAX_FUTURE_SKEW: i64 = 60;

/// A token that passed verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifiedToken {
    pub issued_at: i64,
    /// Time between issue and verification (zero if issued slightly ahead)
    pub age: Duration,
}

/// Issues and verifies form tokens.
#[derive(Clone)]
pub struct FormTokenSigner {
    mac: HmacSha256,
    max_age: Duration,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for FormTokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormTokenSigner")
            .field("max_age", &self.max_age)
            .finish_non_exhaustive()
    }
}

impl FormTokenSigner {
    /// Create a signer with the given key.
    pub fn new(
        secret: &[u8],
        max_age: Duration,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        let mac = HmacSha256::new_from_slice(secret)
            .map_err(|e| ConfigError::InvalidFormToken(e.to_string()))?;
        Ok(Self {
            mac,
            max_age,
            clock,
        })
    }

    /// Create a signer with a fresh random 32-byte key.
    pub fn with_random_key(
        max_age: Duration,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        let mut secret = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut secret);
        Self::new(&secret, max_age, clock)
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    /// Issue a token stamped with the current time.
    pub fn issue(&self) -> String {
        let mut payload = [0u8; TIMESTAMP_LEN + NONCE_LEN];
        payload[..TIMESTAMP_LEN].copy_from_slice(&self.clock.unix_seconds().to_be_bytes());
        rand::thread_rng().fill_bytes(&mut payload[TIMESTAMP_LEN..]);

        let mut mac = self.mac.clone();
        mac.update(&payload);
        let tag = mac.finalize().into_bytes();

        let mut raw = Vec::with_capacity(TOKEN_LEN);
        raw.extend_from_slice(&payload);
        raw.extend_from_slice(&tag);
        URL_SAFE_NO_PAD.encode(raw)
    }

    /// Verify signature and age of a token.
    pub fn verify(&self, token: &str) -> Result<VerifiedToken, TokenError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(TokenError::Missing);
        }

        let raw = URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|_| TokenError::Malformed)?;
        if raw.len() != TOKEN_LEN {
            return Err(TokenError::Malformed);
        }

        let (payload, tag) = raw.split_at(TIMESTAMP_LEN + NONCE_LEN);
        let mut mac = self.mac.clone();
        mac.update(payload);
        mac.verify_slice(tag)
            .map_err(|_| TokenError::BadSignature)?;

        let mut stamp = [0u8; TIMESTAMP_LEN];
        stamp.copy_from_slice(&payload[..TIMESTAMP_LEN]);
        let issued_at = i64::from_be_bytes(stamp);

        let now = self.clock.unix_seconds();
        let age_secs = now.saturating_sub(issued_at);
        if age_secs < -MAX_FUTURE_SKEW {
            return Err(TokenError::FromFuture);
        }
        let age = Duration::from_secs(age_secs.max(0) as u64);
        if age > self.max_age {
            return Err(TokenError::Expired {
                age_secs: age.as_secs(),
            });
        }

        Ok(VerifiedToken { issued_at, age })
    }
}
