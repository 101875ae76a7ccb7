//! Email verification links.
//!
//! A link is `/users/verify-email/{uid}/{token}` where
//!
//! - `uid` is the user's UUID (hyphenated string) in URL-safe base64 without
//!   padding, and
//! - `token` is `{ts}-{hash}`: `ts` is seconds since 2001-01-01 UTC in base 36
//!   and `hash` is every other hex digit of an HMAC-SHA256 over the user's
//!   state at issue time.
//!
//! The hashed state includes the password hash, last login and verification
//! flag, so a token stops working once the user changes password, logs in
//! again, or completes verification. No token storage is needed.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, TimeZone, Utc};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

use bricky_core::UserId;

use crate::models::User;

type HmacSha256 = Hmac<Sha256>;

/// Namespaces the HMAC so the same key can sign other things safely.
const KEY_SALT: &str = "bricky.users.tokens.EmailVerificationTokenGenerator";

/// Token epoch: 2001-01-01T00:00:00Z as a Unix timestamp.
const TOKEN_EPOCH: i64 = 978_307_200;

/// Longest base-36 timestamp accepted (covers dates well past 2069).
const MAX_TS_DIGITS: usize = 6;

const HASH_LEN: usize = 32;

/// Issues and checks verification tokens.
#[derive(Clone)]
pub struct VerificationTokens {
    secret: SecretString,
    ttl: Duration,
}

impl std::fmt::Debug for VerificationTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerificationTokens")
            .field("secret", &"[REDACTED]")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl VerificationTokens {
    #[must_use]
    pub const fn new(secret: SecretString, ttl: Duration) -> Self {
        Self { secret, ttl }
    }

    /// A fresh token for `user`, stamped with `now`.
    #[must_use]
    pub fn make_token(&self, user: &User, now: DateTime<Utc>) -> String {
        self.make_token_at(user, seconds_since_epoch(now))
    }

    /// Whether `token` was issued for `user` in its current state and has not expired.
    #[must_use]
    pub fn check_token(&self, user: &User, token: &str, now: DateTime<Utc>) -> bool {
        let Some((ts_b36, hash)) = token.split_once('-') else {
            return false;
        };
        if ts_b36.is_empty() || ts_b36.len() > MAX_TS_DIGITS || hash.len() != HASH_LEN {
            return false;
        }
        let Some(ts) = base36_decode(ts_b36) else {
            return false;
        };

        let expected = self.make_token_at(user, ts);
        if !constant_time_compare(&expected, token) {
            return false;
        }

        let age = seconds_since_epoch(now) - ts;
        let ttl = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        age <= ttl
    }

    /// Absolute verification link for `user`, issued at `now`.
    #[must_use]
    pub fn link_for(&self, base_url: &str, user: &User, now: DateTime<Utc>) -> String {
        verification_link(base_url, &encode_uid(user.id), &self.make_token(user, now))
    }

    fn make_token_at(&self, user: &User, ts: i64) -> String {
        let ts_b36 = base36_encode(ts);
        let hash = self.hash_state(user, ts);
        format!("{ts_b36}-{hash}")
    }

    fn hash_state(&self, user: &User, ts: i64) -> String {
        // Drop sub-second precision so a value round-tripped through the
        // database hashes the same as the in-memory one.
        let last_login = user
            .last_login
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default();

        let mut mac = HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .unwrap_or_else(|_| unreachable!("HMAC accepts keys of any length"));
        mac.update(KEY_SALT.as_bytes());
        mac.update(user.id.to_string().as_bytes());
        mac.update(user.password_hash.as_bytes());
        mac.update(last_login.as_bytes());
        mac.update(ts.to_string().as_bytes());
        mac.update(user.email.as_str().as_bytes());
        mac.update(if user.email_is_verified { b"1" } else { b"0" });

        let digest = hex::encode(mac.finalize().into_bytes());
        digest.chars().step_by(2).collect()
    }
}

/// URL-safe base64 of the user's hyphenated UUID.
#[must_use]
pub fn encode_uid(id: UserId) -> String {
    URL_SAFE_NO_PAD.encode(id.to_string())
}

/// Reverse of [`encode_uid`]. Accepts padded input too.
#[must_use]
pub fn decode_uid(uidb64: &str) -> Option<UserId> {
    let bytes = URL_SAFE_NO_PAD.decode(uidb64.trim_end_matches('=')).ok()?;
    let text = String::from_utf8(bytes).ok()?;
    text.parse().ok()
}

/// Absolute verification link from already-encoded parts.
#[must_use]
pub fn verification_link(base_url: &str, uidb64: &str, token: &str) -> String {
    format!(
        "{}/users/verify-email/{uidb64}/{token}",
        base_url.trim_end_matches('/')
    )
}

fn seconds_since_epoch(now: DateTime<Utc>) -> i64 {
    now.timestamp() - TOKEN_EPOCH
}

/// Point in time a token timestamp refers to (for diagnostics).
#[must_use]
pub fn token_issued_at(token: &str) -> Option<DateTime<Utc>> {
    let (ts_b36, _) = token.split_once('-')?;
    let ts = base36_decode(ts_b36)?;
    Utc.timestamp_opt(ts + TOKEN_EPOCH, 0).single()
}

fn base36_encode(mut n: i64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n <= 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        let digit = usize::try_from(n % 36).unwrap_or(0);
        out.push(DIGITS.get(digit).copied().unwrap_or(b'0'));
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

fn base36_decode(s: &str) -> Option<i64> {
    i64::from_str_radix(s, 36).ok().filter(|n| *n >= 0)
}

/// Constant-time string comparison.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration as ChronoDuration;

    use bricky_core::{Email, Username};

    use super::*;

    fn tokens() -> VerificationTokens {
        VerificationTokens::new(
            SecretString::from("q8Zr!m2Lx#4vT9wPn6@eK1sY7bHc3Gd0"),
            Duration::from_secs(24 * 3600),
        )
    }

    fn user() -> User {
        User {
            id: "0e53f1df-8755-4163-a9c3-79cbc1bf0d35".parse().unwrap(),
            username: Username::parse("brickfan").unwrap(),
            email: Email::parse("fan@bricky.shop").unwrap(),
            phone: None,
            password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".to_string(),
            email_is_verified: false,
            is_active: true,
            last_login: None,
            date_joined: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 4, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_fresh_token_validates() {
        let token = tokens().make_token(&user(), now());
        assert!(tokens().check_token(&user(), &token, now()));
        assert!(tokens().check_token(&user(), &token, now() + ChronoDuration::hours(23)));
    }

    #[test]
    fn test_token_shape() {
        let token = tokens().make_token(&user(), now());
        let (ts, hash) = token.split_once('-').unwrap();
        assert!(ts.len() <= MAX_TS_DIGITS);
        assert_eq!(hash.len(), HASH_LEN);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(token_issued_at(&token), Some(now()));
    }

    #[test]
    fn test_expired_token_rejected() {
        let token = tokens().make_token(&user(), now());
        let later = now() + ChronoDuration::hours(24) + ChronoDuration::seconds(1);
        assert!(!tokens().check_token(&user(), &token, later));
    }

    #[test]
    fn test_tampered_token_rejected() {
        let token = tokens().make_token(&user(), now());
        let mut tampered = token.clone();
        let last = tampered.pop().unwrap();
        tampered.push(if last == '0' { '1' } else { '0' });
        assert!(!tokens().check_token(&user(), &tampered, now()));

        // Moving the timestamp forward invalidates the hash.
        let (_, hash) = token.split_once('-').unwrap();
        let forged = format!("{}-{hash}", base36_encode(seconds_since_epoch(now()) + 3600));
        assert!(!tokens().check_token(&user(), &forged, now()));
    }

    #[test]
    fn test_malformed_tokens_rejected() {
        for bad in ["", "-", "abc", "zzzzzzz-0123456789abcdef0123456789abcdef", "1-short"] {
            assert!(!tokens().check_token(&user(), bad, now()), "{bad}");
        }
    }

    #[test]
    fn test_other_user_rejected() {
        let token = tokens().make_token(&user(), now());
        let mut other = user();
        other.id = UserId::generate();
        assert!(!tokens().check_token(&other, &token, now()));
    }

    #[test]
    fn test_single_use_after_verification() {
        let token = tokens().make_token(&user(), now());
        let mut verified = user();
        verified.email_is_verified = true;
        assert!(!tokens().check_token(&verified, &token, now()));
    }

    #[test]
    fn test_invalid_after_password_change_or_login() {
        let token = tokens().make_token(&user(), now());

        let mut changed = user();
        changed.password_hash.push('x');
        assert!(!tokens().check_token(&changed, &token, now()));

        let mut logged_in = user();
        logged_in.last_login = Some(now());
        assert!(!tokens().check_token(&logged_in, &token, now()));
    }

    #[test]
    fn test_different_secret_rejected() {
        let token = tokens().make_token(&user(), now());
        let other = VerificationTokens::new(
            SecretString::from("Zx9!pQ2@wE4#rT6$yU8%iO0^aS1&dF3*"),
            Duration::from_secs(3600),
        );
        assert!(!other.check_token(&user(), &token, now()));
    }

    #[test]
    fn test_uid_roundtrip() {
        let id = UserId::generate();
        assert_eq!(decode_uid(&encode_uid(id)), Some(id));
    }

    #[test]
    fn test_uid_compatible_with_issued_links() {
        let id = decode_uid("MGU1M2YxZGYtODc1NS00MTYzLWE5YzMtNzljYmMxYmYwZDM1").unwrap();
        assert_eq!(id.to_string(), "0e53f1df-8755-4163-a9c3-79cbc1bf0d35");
        assert_eq!(
            encode_uid(id),
            "MGU1M2YxZGYtODc1NS00MTYzLWE5YzMtNzljYmMxYmYwZDM1"
        );
    }

    #[test]
    fn test_malformed_uid() {
        assert_eq!(decode_uid("not base64!"), None);
        assert_eq!(decode_uid(&URL_SAFE_NO_PAD.encode("not-a-uuid")), None);
        assert_eq!(decode_uid(""), None);
    }

    #[test]
    fn test_verification_link() {
        assert_eq!(
            verification_link("https://bricky.shop/", "abc", "1-2"),
            "https://bricky.shop/users/verify-email/abc/1-2"
        );
    }

    #[test]
    fn test_link_for_checks_back() {
        let link = tokens().link_for("https://bricky.shop", &user(), now());
        let rest = link
            .strip_prefix("https://bricky.shop/users/verify-email/")
            .unwrap();
        let (uid, token) = rest.split_once('/').unwrap();
        assert_eq!(decode_uid(uid), Some(user().id));
        assert!(tokens().check_token(&user(), token, now()));
    }

    #[test]
    fn test_base36() {
        assert_eq!(base36_encode(0), "0");
        assert_eq!(base36_encode(35), "z");
        assert_eq!(base36_encode(36), "10");
        assert_eq!(base36_decode("10"), Some(36));
        assert_eq!(base36_decode("-1"), None);
        assert_eq!(base36_decode("!"), None);
    }
}
