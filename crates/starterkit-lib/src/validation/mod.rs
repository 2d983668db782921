// ============================
// crates/starterkit-lib/src/validation/mod.rs
// ============================
//! Form validation module.
//!
//! Field rules, the password policy and the password strength meter live
//! here; per-form validators are in [`forms`]. Every validator collects all
//! failures across fields instead of stopping at the first one.

pub mod forms;

pub use forms::{
    validate_avatar, validate_change_email, validate_change_password, validate_login,
    validate_profile, validate_reset_password, validate_reset_request, validate_signup,
    AVATAR_CONTENT_TYPES, ChangeEmailData, ChangeEmailInput, ChangePasswordData,
    ChangePasswordInput, LoginData, LoginInput, MAX_AVATAR_BYTES, ProfileData, ProfileInput,
    ResetPasswordData, ResetPasswordInput, ResetRequestData, ResetRequestInput, SignupData,
    SignupInput,
};

use regex::Regex;
use serde::Serialize;
use starterkit_common::PasswordStrength;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;
use url::Url;

// Common validation constants
pub const MIN_PASSWORD_LENGTH: usize = 8;
const STRONG_PASSWORD_LENGTH: usize = 12;
const MIN_NAME_LENGTH: usize = 2;
const MAX_NAME_LENGTH: usize = 50;
pub const MAX_BIO_LENGTH: usize = 500;
pub const MAX_LOCATION_LENGTH: usize = 100;
const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321 SMTP limit

// Messages shared by several forms
pub const MSG_INVALID_EMAIL: &str = "Please enter a valid email address";
pub const MSG_PASSWORD_TOO_SHORT: &str = "Password must be at least 8 characters";
pub const MSG_PASSWORD_NO_UPPERCASE: &str = "Password must contain at least one uppercase letter";
pub const MSG_PASSWORD_NO_LOWERCASE: &str = "Password must contain at least one lowercase letter";
pub const MSG_PASSWORD_NO_DIGIT: &str = "Password must contain at least one number";
pub const MSG_PASSWORDS_DIFFER: &str = "Passwords do not match";
pub const MSG_NAME_TOO_SHORT: &str = "Name must be at least 2 characters";
pub const MSG_NAME_TOO_LONG: &str = "Name must not exceed 50 characters";
pub const MSG_NAME_CHARSET: &str = "Name can only contain letters and spaces";
pub const MSG_INVALID_URL: &str = "Please enter a valid URL";

// Regex patterns for validation
static EMAIL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap());
static NAME_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-zA-Z\s]+$").unwrap());

/// Validation failures keyed by field path
///
/// Paths are the camelCase form field names (`confirmPassword`), dotted for
/// nested fields (`emailNotifications.newsletter`). A field may carry more
/// than one message, e.g. every password policy rule it breaks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors {
    errors: BTreeMap<String, Vec<String>>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one failure against `path`
    pub fn add(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.entry(path.into()).or_default().push(message.into());
    }

    /// Record every message in `messages` against `path`
    pub fn add_all<I, M>(&mut self, path: &str, messages: I)
    where
        I: IntoIterator<Item = M>,
        M: Into<String>,
    {
        for message in messages {
            self.add(path, message);
        }
    }

    /// Merge `other` under `prefix`, producing `prefix.field` paths
    pub fn merge_nested(&mut self, prefix: &str, other: FieldErrors) {
        for (path, messages) in other.errors {
            let nested = format!("{prefix}.{path}");
            self.add_all(&nested, messages);
        }
    }

    pub fn get(&self, path: &str) -> Option<&[String]> {
        self.errors.get(path).map(Vec::as_slice)
    }

    /// First message for `path`, the one a form renders inline
    pub fn first(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(|m| m.first()).map(String::as_str)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.errors.contains_key(path)
    }

    /// Field paths that failed, in sorted order
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.errors.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of failing fields
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// `Ok(value)` when nothing was recorded
    pub fn into_result<T>(self, value: impl FnOnce() -> T) -> Result<T, FieldErrors> {
        if self.is_empty() {
            Ok(value())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (path, messages) in &self.errors {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{path}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

impl std::error::Error for FieldErrors {}

/// Length in UTF-16 code units, the unit browser form limits count in
fn utf16_len(value: &str) -> usize {
    value.encode_utf16().count()
}

/// Rules of the password policy broken by `password`, in rule order
pub fn password_policy_violations(password: &str) -> Vec<&'static str> {
    let mut violations = Vec::new();
    if utf16_len(password) < MIN_PASSWORD_LENGTH {
        violations.push(MSG_PASSWORD_TOO_SHORT);
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        violations.push(MSG_PASSWORD_NO_UPPERCASE);
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        violations.push(MSG_PASSWORD_NO_LOWERCASE);
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        violations.push(MSG_PASSWORD_NO_DIGIT);
    }
    violations
}

/// Whether `password` satisfies every policy rule
pub fn meets_password_policy(password: &str) -> bool {
    password_policy_violations(password).is_empty()
}

/// Classify a password for the strength meter
pub fn password_strength(password: &str) -> PasswordStrength {
    let length = utf16_len(password);
    if length < MIN_PASSWORD_LENGTH {
        return PasswordStrength::Weak;
    }

    let checks = [
        length >= MIN_PASSWORD_LENGTH,
        length >= STRONG_PASSWORD_LENGTH,
        password.chars().any(|c| c.is_ascii_uppercase()),
        password.chars().any(|c| c.is_ascii_lowercase()),
        password.chars().any(|c| c.is_ascii_digit()),
        password.chars().any(|c| !c.is_ascii_alphanumeric()),
    ];
    let score = checks.iter().filter(|passed| **passed).count();

    match score {
        5.. => PasswordStrength::Strong,
        3.. => PasswordStrength::Medium,
        _ => PasswordStrength::Weak,
    }
}

/// Check an email address
pub fn check_email(email: &str) -> Option<&'static str> {
    if email.is_empty() || utf16_len(email) > MAX_EMAIL_LENGTH || !EMAIL_REGEX.is_match(email)
    {
        return Some(MSG_INVALID_EMAIL);
    }
    None
}

/// Check a display name: 2-50 characters, letters and whitespace only
pub fn check_full_name(name: &str) -> Vec<&'static str> {
    let mut violations = Vec::new();
    let length = utf16_len(name);
    if length < MIN_NAME_LENGTH {
        violations.push(MSG_NAME_TOO_SHORT);
    }
    if length > MAX_NAME_LENGTH {
        violations.push(MSG_NAME_TOO_LONG);
    }
    if !NAME_REGEX.is_match(name) {
        violations.push(MSG_NAME_CHARSET);
    }
    violations
}

/// Check that an absolute URL parses
pub fn check_url(value: &str) -> Option<&'static str> {
    match Url::parse(value) {
        Ok(_) => None,
        Err(_) => Some(MSG_INVALID_URL),
    }
}

/// `Some(message)` when `value` is longer than `max` UTF-16 units
pub fn check_max_length(value: &str, max: usize, message: &'static str) -> Option<&'static str> {
    (utf16_len(value) > max).then_some(message)
}
