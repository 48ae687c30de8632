//! Authentication module
//!
//! bcrypt password hashes, session tokens and signup field validation.

pub mod accounts;

use std::sync::LazyLock;

use rand::Rng;
use regex::Regex;
use sha2::{Digest, Sha256};

/// bcrypt cost used when none is configured
pub const DEFAULT_HASH_COST: u32 = bcrypt::DEFAULT_COST;

/// Minimum password length
pub const MIN_PASSWORD_LEN: usize = 8;

static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.-]{3,50}$").expect("valid username regex"));

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[A-Za-z]{2,}$").expect("valid email regex")
});

/// Generate a secure random session token
pub fn generate_token() -> String {
    let random_bytes: [u8; 32] = rand::rng().random();
    let mut hasher = Sha256::new();
    hasher.update(random_bytes);
    hasher.update(
        chrono::Utc::now()
            .timestamp_nanos_opt()
            .unwrap_or(0)
            .to_le_bytes(),
    );
    hex::encode(hasher.finalize())
}

/// Hash a password with bcrypt at the given cost
///
/// CPU-bound; call from a blocking thread.
pub fn hash_password(password: &str, cost: u32) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(password, cost)
}

/// Verify a password against a stored bcrypt hash
///
/// A malformed stored hash never verifies.
pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}

/// Check a username: 3-50 letters, digits, `_`, `.` or `-`
pub fn valid_username(username: &str) -> bool {
    USERNAME_RE.is_match(username)
}

/// Check an email address shape
pub fn valid_email(email: &str) -> bool {
    email.len() <= 100 && EMAIL_RE.is_match(email)
}
