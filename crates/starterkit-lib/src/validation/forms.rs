// ============================
// crates/starterkit-lib/src/validation/forms.rs
// ============================
//! Per-form validators.
//!
//! Inputs deserialize from the camelCase JSON a form submits; a missing
//! required key fails at that boundary. Validated data types that carry
//! secrets wipe them on drop.

use super::{
    check_email, check_full_name, check_max_length, check_url, password_policy_violations,
    FieldErrors, MAX_BIO_LENGTH, MAX_LOCATION_LENGTH, MSG_PASSWORDS_DIFFER,
};
use serde::{Deserialize, Serialize};
use starterkit_common::ProfileUpdate;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Largest avatar accepted for upload (5 MiB)
pub const MAX_AVATAR_BYTES: u64 = 5 * 1024 * 1024;

/// Image types accepted for avatars
pub const AVATAR_CONTENT_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/gif"];

const MSG_PASSWORD_REQUIRED: &str = "Password is required";
const MSG_CONFIRM_REQUIRED: &str = "Please confirm your password";
const MSG_CONFIRM_NEW_REQUIRED: &str = "Please confirm your new password";
const MSG_CURRENT_REQUIRED: &str = "Current password is required";
const MSG_EMAIL_CHANGE_PASSWORD_REQUIRED: &str = "Password is required to change email";
const MSG_TERMS: &str = "You must accept the terms and conditions";
const MSG_BIO_TOO_LONG: &str = "Bio must not exceed 500 characters";
const MSG_LOCATION_TOO_LONG: &str = "Location must not exceed 100 characters";
const MSG_AVATAR_TYPE: &str = "Please upload a JPG, PNG, or GIF image";
const MSG_AVATAR_SIZE: &str = "Image must be less than 5MB";

fn check_new_password(errors: &mut FieldErrors, field: &str, password: &str) {
    errors.add_all(field, password_policy_violations(password));
}

/// Cross-field check; the error lands on the confirmation input
fn check_confirmation(
    errors: &mut FieldErrors,
    password: &str,
    confirmation: &str,
    required_message: &'static str,
) {
    if confirmation.is_empty() {
        errors.add("confirmPassword", required_message);
    } else if password != confirmation {
        errors.add("confirmPassword", MSG_PASSWORDS_DIFFER);
    }
}

fn check_email_field(errors: &mut FieldErrors, field: &str, email: &str) {
    if let Some(message) = check_email(email) {
        errors.add(field, message);
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.is_empty()).cloned()
}

// ---- login ----

#[derive(Deserialize, Clone, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
pub struct LoginInput {
    pub email: String,
    pub password: String,
    #[serde(default)]
    #[zeroize(skip)]
    pub remember_me: Option<bool>,
}

#[derive(Serialize, Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
pub struct LoginData {
    pub email: String,
    #[serde(skip)]
    pub password: String,
    #[zeroize(skip)]
    pub remember_me: bool,
}

/// Validate the login form. The password policy is not re-checked here.
pub fn validate_login(input: &LoginInput) -> Result<LoginData, FieldErrors> {
    let mut errors = FieldErrors::new();
    check_email_field(&mut errors, "email", &input.email);
    if input.password.is_empty() {
        errors.add("password", MSG_PASSWORD_REQUIRED);
    }
    errors.into_result(|| LoginData {
        email: input.email.clone(),
        password: input.password.clone(),
        remember_me: input.remember_me.unwrap_or(false),
    })
}

// ---- signup ----

#[derive(Deserialize, Clone, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
pub struct SignupInput {
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    #[zeroize(skip)]
    pub accept_terms: bool,
}

#[derive(Serialize, Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
pub struct SignupData {
    pub full_name: String,
    pub email: String,
    #[serde(skip)]
    pub password: String,
}

/// Validate the signup form
pub fn validate_signup(input: &SignupInput) -> Result<SignupData, FieldErrors> {
    let mut errors = FieldErrors::new();
    errors.add_all("fullName", check_full_name(&input.full_name));
    check_email_field(&mut errors, "email", &input.email);
    check_new_password(&mut errors, "password", &input.password);
    check_confirmation(
        &mut errors,
        &input.password,
        &input.confirm_password,
        MSG_CONFIRM_REQUIRED,
    );
    if !input.accept_terms {
        errors.add("acceptTerms", MSG_TERMS);
    }
    errors.into_result(|| SignupData {
        full_name: input.full_name.clone(),
        email: input.email.clone(),
        password: input.password.clone(),
    })
}

// ---- password reset request ----

#[derive(Deserialize, Debug, Clone)]
pub struct ResetRequestInput {
    pub email: String,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ResetRequestData {
    pub email: String,
}

/// Validate the "forgot password" form
pub fn validate_reset_request(input: &ResetRequestInput) -> Result<ResetRequestData, FieldErrors> {
    let mut errors = FieldErrors::new();
    check_email_field(&mut errors, "email", &input.email);
    errors.into_result(|| ResetRequestData {
        email: input.email.clone(),
    })
}

// ---- password reset ----

#[derive(Deserialize, Clone, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordInput {
    pub password: String,
    pub confirm_password: String,
}

#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct ResetPasswordData {
    pub password: String,
}

/// Validate the "choose a new password" form reached from a reset email
pub fn validate_reset_password(
    input: &ResetPasswordInput,
) -> Result<ResetPasswordData, FieldErrors> {
    let mut errors = FieldErrors::new();
    check_new_password(&mut errors, "password", &input.password);
    check_confirmation(
        &mut errors,
        &input.password,
        &input.confirm_password,
        MSG_CONFIRM_REQUIRED,
    );
    errors.into_result(|| ResetPasswordData {
        password: input.password.clone(),
    })
}

// ---- change password ----

#[derive(Deserialize, Clone, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordInput {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct ChangePasswordData {
    pub current_password: String,
    pub new_password: String,
}

/// Validate the account settings "change password" form
pub fn validate_change_password(
    input: &ChangePasswordInput,
) -> Result<ChangePasswordData, FieldErrors> {
    let mut errors = FieldErrors::new();
    if input.current_password.is_empty() {
        errors.add("currentPassword", MSG_CURRENT_REQUIRED);
    }
    check_new_password(&mut errors, "newPassword", &input.new_password);
    check_confirmation(
        &mut errors,
        &input.new_password,
        &input.confirm_password,
        MSG_CONFIRM_NEW_REQUIRED,
    );
    errors.into_result(|| ChangePasswordData {
        current_password: input.current_password.clone(),
        new_password: input.new_password.clone(),
    })
}

// ---- change email ----

#[derive(Deserialize, Clone, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEmailInput {
    pub new_email: String,
    pub password: String,
}

#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct ChangeEmailData {
    pub new_email: String,
    pub password: String,
}

pub fn validate_change_email(input: &ChangeEmailInput) -> Result<ChangeEmailData, FieldErrors> {
    let mut errors = FieldErrors::new();
    check_email_field(&mut errors, "newEmail", &input.new_email);
    if input.password.is_empty() {
        errors.add("password", MSG_EMAIL_CHANGE_PASSWORD_REQUIRED);
    }
    errors.into_result(|| ChangeEmailData {
        new_email: input.new_email.clone(),
        password: input.password.clone(),
    })
}

// ---- profile ----

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProfileInput {
    pub full_name: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
}

/// Normalised profile form: empty optional strings become `None`
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProfileData {
    pub full_name: String,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
}

impl ProfileData {
    /// Every form field is written, clearing the optional ones left blank
    pub fn into_update(self) -> ProfileUpdate {
        ProfileUpdate {
            full_name: Some(self.full_name),
            bio: Some(self.bio),
            location: Some(self.location),
            website: Some(self.website),
            ..ProfileUpdate::default()
        }
    }
}

/// Validate the profile settings form
pub fn validate_profile(input: &ProfileInput) -> Result<ProfileData, FieldErrors> {
    let mut errors = FieldErrors::new();
    errors.add_all("fullName", check_full_name(&input.full_name));

    let bio = non_empty(&input.bio);
    if let Some(message) = bio
        .as_deref()
        .and_then(|b| check_max_length(b, MAX_BIO_LENGTH, MSG_BIO_TOO_LONG))
    {
        errors.add("bio", message);
    }

    let location = non_empty(&input.location);
    if let Some(message) = location
        .as_deref()
        .and_then(|l| check_max_length(l, MAX_LOCATION_LENGTH, MSG_LOCATION_TOO_LONG))
    {
        errors.add("location", message);
    }

    let website = non_empty(&input.website);
    if let Some(message) = website.as_deref().and_then(check_url) {
        errors.add("website", message);
    }

    errors.into_result(|| ProfileData {
        full_name: input.full_name.clone(),
        bio,
        location,
        website,
    })
}

// ---- avatar ----

/// Check an avatar file before it is uploaded
pub fn validate_avatar(content_type: &str, size_bytes: u64) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();
    if !AVATAR_CONTENT_TYPES.contains(&content_type) {
        errors.add("avatar", MSG_AVATAR_TYPE);
    }
    if size_bytes > MAX_AVATAR_BYTES {
        errors.add("avatar", MSG_AVATAR_SIZE);
    }
    errors.into_result(|| ())
}
