//! Stateless XSRF tokens.
//!
//! A token is `base64url(HMAC-SHA256(secret, identity || 0x00 || bucket))` where
//! `bucket = unix_time / token_timeout`. Nothing is stored: validation recomputes
//! the signature for the buckets that are still acceptable and compares in
//! constant time. Tokens cannot be revoked; they lapse with their bucket.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use hmac::digest::{Key, KeyInit};
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;
use thiserror::Error;

use super::Identity;

type HmacSha256 = Hmac<Sha256>;

const SIGNATURE_LEN: usize = 32;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("XSRF token is malformed")]
    Malformed,
    #[error("XSRF token is incorrect or expired")]
    Incorrect,
}

/// Which age limit a validation applies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenWindow {
    /// Issuing bucket, the one after it, and one bucket of forward skew
    Standard,
    /// Extended look-back used by the token refresh endpoint
    Refresh,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssuedToken {
    pub token: String,
    /// Seconds until the token stops passing standard validation
    pub expires_in_secs: i64,
}

#[derive(Clone)]
pub struct XsrfTokenService {
    keyed: HmacSha256,
    bucket_secs: i64,
    refresh_secs: i64,
}

impl XsrfTokenService {
    pub fn new(secret: impl AsRef<[u8]>, token_timeout_secs: i64, refresh_timeout_secs: i64) -> Self {
        Self {
            keyed: keyed_mac(secret.as_ref()),
            bucket_secs: token_timeout_secs.max(1),
            refresh_secs: refresh_timeout_secs.max(token_timeout_secs),
        }
    }

    pub fn issue(&self, identity: Option<&Identity>) -> IssuedToken {
        self.issue_at(identity, Utc::now().timestamp())
    }

    pub fn validate(&self, token: &str, identity: Option<&Identity>, window: TokenWindow) -> Result<(), TokenError> {
        self.validate_at(token, identity, window, Utc::now().timestamp())
    }

    pub fn issue_at(&self, identity: Option<&Identity>, now: i64) -> IssuedToken {
        let bucket = self.bucket(now);
        let signature = self.sign(identity_key(identity), bucket);
        IssuedToken {
            token: URL_SAFE_NO_PAD.encode(signature),
            expires_in_secs: (bucket + 2) * self.bucket_secs - now,
        }
    }

    pub fn validate_at(
        &self,
        token: &str,
        identity: Option<&Identity>,
        window: TokenWindow,
        now: i64,
    ) -> Result<(), TokenError> {
        let presented = URL_SAFE_NO_PAD
            .decode(token.trim())
            .map_err(|_| TokenError::Malformed)?;
        if presented.len() != SIGNATURE_LEN {
            return Err(TokenError::Malformed);
        }

        let current = self.bucket(now);
        let oldest = current - self.lookback_buckets(window);
        let key = identity_key(identity);
        for bucket in (oldest..=current + 1).rev() {
            if self.verify(key, bucket, &presented) {
                return Ok(());
            }
        }
        Err(TokenError::Incorrect)
    }

    fn lookback_buckets(&self, window: TokenWindow) -> i64 {
        match window {
            TokenWindow::Standard => 1,
            TokenWindow::Refresh => (self.refresh_secs / self.bucket_secs).max(1),
        }
    }

    fn bucket(&self, now: i64) -> i64 {
        now.div_euclid(self.bucket_secs)
    }

    fn mac(&self, key: &str, bucket: i64) -> HmacSha256 {
        let mut mac = self.keyed.clone();
        mac.update(key.as_bytes());
        mac.update(&[0]);
        mac.update(bucket.to_string().as_bytes());
        mac
    }

    fn sign(&self, key: &str, bucket: i64) -> Vec<u8> {
        self.mac(key, bucket).finalize().into_bytes().to_vec()
    }

    fn verify(&self, key: &str, bucket: i64, presented: &[u8]) -> bool {
        self.mac(key, bucket).verify_slice(presented).is_ok()
    }
}

/// HMAC keyed with `secret` the way the algorithm defines it: keys longer than
/// a block are hashed, shorter ones zero-padded to the block size.
fn keyed_mac(secret: &[u8]) -> HmacSha256 {
    let mut block = Key::<HmacSha256>::default();
    if secret.len() > block.len() {
        let digest = <Sha256 as sha2::Digest>::digest(secret);
        block[..digest.len()].copy_from_slice(&digest);
    } else {
        block[..secret.len()].copy_from_slice(secret);
    }
    <HmacSha256 as KeyInit>::new(&block)
}

fn identity_key(identity: Option<&Identity>) -> &str {
    identity.map(Identity::email).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: i64 = 60 * 60;
    const NOW: i64 = 1_700_000_000;

    fn service() -> XsrfTokenService {
        XsrfTokenService::new("test-secret", HOUR, 30 * 24 * HOUR)
    }

    fn alice() -> Identity {
        Identity::new("alice@example.com")
    }

    #[test]
    fn issued_token_validates_for_same_identity() {
        let svc = service();
        let issued = svc.issue_at(Some(&alice()), NOW);
        assert!(svc
            .validate_at(&issued.token, Some(&alice()), TokenWindow::Standard, NOW)
            .is_ok());
        assert!(issued.expires_in_secs > HOUR && issued.expires_in_secs <= 2 * HOUR);
    }

    #[test]
    fn issue_is_deterministic_within_a_bucket() {
        let svc = service();
        let bucket_start = NOW - NOW.rem_euclid(HOUR);
        let a = svc.issue_at(Some(&alice()), bucket_start);
        let b = svc.issue_at(Some(&alice()), bucket_start + HOUR - 1);
        assert_eq!(a.token, b.token);
    }

    #[test]
    fn other_identity_is_rejected() {
        let svc = service();
        let issued = svc.issue_at(Some(&alice()), NOW);
        let bob = Identity::new("bob@example.com");
        assert_eq!(
            svc.validate_at(&issued.token, Some(&bob), TokenWindow::Standard, NOW),
            Err(TokenError::Incorrect)
        );
        assert_eq!(
            svc.validate_at(&issued.token, None, TokenWindow::Standard, NOW),
            Err(TokenError::Incorrect)
        );
    }

    #[test]
    fn corrupted_token_is_rejected() {
        let svc = service();
        let issued = svc.issue_at(Some(&alice()), NOW);

        let mut flipped = issued.token.clone().into_bytes();
        flipped[0] = if flipped[0] == b'A' { b'B' } else { b'A' };
        let flipped = String::from_utf8(flipped).unwrap();
        assert_eq!(
            svc.validate_at(&flipped, Some(&alice()), TokenWindow::Standard, NOW),
            Err(TokenError::Incorrect)
        );

        assert_eq!(
            svc.validate_at("not base64!!", Some(&alice()), TokenWindow::Standard, NOW),
            Err(TokenError::Malformed)
        );
        assert_eq!(
            svc.validate_at(&issued.token[..10], Some(&alice()), TokenWindow::Standard, NOW),
            Err(TokenError::Malformed)
        );
    }

    #[test]
    fn token_expires_after_window() {
        let svc = service();
        let issued = svc.issue_at(Some(&alice()), NOW);
        // Still inside: the following bucket
        assert!(svc
            .validate_at(&issued.token, Some(&alice()), TokenWindow::Standard, NOW + HOUR)
            .is_ok());
        // Two buckets later the standard window has lapsed
        assert_eq!(
            svc.validate_at(&issued.token, Some(&alice()), TokenWindow::Standard, NOW + 3 * HOUR),
            Err(TokenError::Incorrect)
        );
        // but the refresh window still accepts it
        assert!(svc
            .validate_at(&issued.token, Some(&alice()), TokenWindow::Refresh, NOW + 3 * HOUR)
            .is_ok());
    }

    #[test]
    fn tolerates_one_bucket_of_forward_skew() {
        let svc = service();
        let issued = svc.issue_at(Some(&alice()), NOW + HOUR);
        assert!(svc
            .validate_at(&issued.token, Some(&alice()), TokenWindow::Standard, NOW)
            .is_ok());
    }

    #[test]
    fn precomputed_key_matches_standard_hmac() {
        let long_secret = "s".repeat(100);
        for secret in ["test-secret", "", long_secret.as_str()] {
            let svc = XsrfTokenService::new(secret, HOUR, HOUR);
            let mut expected = <HmacSha256 as KeyInit>::new_from_slice(secret.as_bytes()).unwrap();
            expected.update(b"alice@example.com");
            expected.update(&[0]);
            expected.update((NOW / HOUR).to_string().as_bytes());
            let expected = URL_SAFE_NO_PAD.encode(expected.finalize().into_bytes());
            assert_eq!(svc.issue_at(Some(&alice()), NOW).token, expected);
        }
    }

    #[test]
    fn different_secret_is_rejected() {
        let issued = service().issue_at(Some(&alice()), NOW);
        let other = XsrfTokenService::new("other-secret", HOUR, HOUR);
        assert!(other
            .validate_at(&issued.token, Some(&alice()), TokenWindow::Standard, NOW)
            .is_err());
    }
}
