// ============================
// tests/unit/validation_tests.rs
// ============================
//! Unit tests for the per-form validators
use starterkit_lib::validation::{
    validate_avatar, validate_change_email, validate_change_password, validate_login,
    validate_profile, validate_reset_password, validate_reset_request, validate_signup,
    ChangeEmailInput, ChangePasswordInput, LoginInput, ProfileInput, ResetPasswordInput,
    ResetRequestInput, SignupInput, MAX_AVATAR_BYTES, MSG_INVALID_EMAIL, MSG_INVALID_URL,
    MSG_NAME_TOO_SHORT, MSG_PASSWORDS_DIFFER, MSG_PASSWORD_NO_UPPERCASE,
};

fn valid_signup() -> SignupInput {
    SignupInput {
        full_name: "Ada Lovelace".to_string(),
        email: "ada@example.com".to_string(),
        password: "Password1".to_string(),
        confirm_password: "Password1".to_string(),
        accept_terms: true,
    }
}

fn profile(website: &str) -> ProfileInput {
    ProfileInput {
        full_name: "Ada Lovelace".to_string(),
        website: Some(website.to_string()),
        ..ProfileInput::default()
    }
}

#[test]
fn test_signup_accepts_valid_form() {
    let data = validate_signup(&valid_signup()).unwrap();
    assert_eq!(data.email, "ada@example.com");
    assert_eq!(data.full_name, "Ada Lovelace");
}

#[test]
fn test_signup_single_character_name() {
    let mut input = valid_signup();
    input.full_name = "A".to_string();
    input.email = "a@b.com".to_string();

    let errors = validate_signup(&input).err().unwrap();
    assert_eq!(errors.fields().collect::<Vec<_>>(), vec!["fullName"]);
    assert_eq!(errors.first("fullName"), Some(MSG_NAME_TOO_SHORT));
}

#[test]
fn test_signup_mismatch_lands_on_confirmation() {
    let pairs = [
        ("Password1", "Password2"),
        ("Password1", "password1"),
        ("Password1", "Password1 "),
        ("Short1", "Short2"),
    ];
    for (password, confirmation) in pairs {
        let mut input = valid_signup();
        input.password = password.to_string();
        input.confirm_password = confirmation.to_string();

        let errors = validate_signup(&input).err().unwrap();
        assert_eq!(
            errors.first("confirmPassword"),
            Some(MSG_PASSWORDS_DIFFER),
            "{password:?} vs {confirmation:?}"
        );
    }
}

#[test]
fn test_signup_requires_terms_regardless_of_other_fields() {
    let mut valid = valid_signup();
    valid.accept_terms = false;
    let errors = validate_signup(&valid).err().unwrap();
    assert_eq!(errors.len(), 1);
    assert!(errors.contains("acceptTerms"));

    let invalid = SignupInput {
        full_name: String::new(),
        email: "nope".to_string(),
        password: String::new(),
        confirm_password: String::new(),
        accept_terms: false,
    };
    let errors = validate_signup(&invalid).err().unwrap();
    assert!(errors.contains("acceptTerms"));
    // every failing field is reported, not just the first
    for field in ["fullName", "email", "password", "confirmPassword"] {
        assert!(errors.contains(field), "missing {field}");
    }
}

#[test]
fn test_signup_reports_each_policy_violation() {
    let mut input = valid_signup();
    input.password = "password".to_string();
    input.confirm_password = "password".to_string();

    let errors = validate_signup(&input).err().unwrap();
    let messages = errors.get("password").unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0], MSG_PASSWORD_NO_UPPERCASE);
}

#[test]
fn test_signup_from_form_json() {
    let input: SignupInput = serde_json::from_str(
        r#"{"fullName":"Ada","email":"ada@example.com","password":"Password1","confirmPassword":"Password1","acceptTerms":true}"#,
    )
    .unwrap();
    assert!(validate_signup(&input).is_ok());

    // a missing key is a malformed call, caught at the boundary
    assert!(serde_json::from_str::<SignupInput>(r#"{"fullName":"Ada"}"#).is_err());
}

#[test]
fn test_login_does_not_recheck_policy() {
    let input: LoginInput =
        serde_json::from_str(r#"{"email":"ada@example.com","password":"x"}"#).unwrap();
    let data = validate_login(&input).unwrap();
    assert!(!data.remember_me);

    let input: LoginInput =
        serde_json::from_str(r#"{"email":"ada@","password":"","rememberMe":true}"#).unwrap();
    let errors = validate_login(&input).err().unwrap();
    assert_eq!(errors.first("email"), Some(MSG_INVALID_EMAIL));
    assert!(errors.contains("password"));
}

#[test]
fn test_reset_forms() {
    let ok = ResetRequestInput {
        email: "ada@example.com".to_string(),
    };
    assert_eq!(validate_reset_request(&ok).unwrap().email, "ada@example.com");
    let bad = ResetRequestInput {
        email: "ada at example".to_string(),
    };
    assert!(validate_reset_request(&bad).is_err());

    let input = ResetPasswordInput {
        password: "Password1".to_string(),
        confirm_password: "Password1".to_string(),
    };
    assert_eq!(validate_reset_password(&input).unwrap().password, "Password1");

    let input = ResetPasswordInput {
        password: "Password1".to_string(),
        confirm_password: String::new(),
    };
    let errors = validate_reset_password(&input).err().unwrap();
    assert_eq!(
        errors.fields().collect::<Vec<_>>(),
        vec!["confirmPassword"]
    );
}

#[test]
fn test_change_password() {
    let input = ChangePasswordInput {
        current_password: String::new(),
        new_password: "Password2".to_string(),
        confirm_password: "Password3".to_string(),
    };
    let errors = validate_change_password(&input).err().unwrap();
    assert!(errors.contains("currentPassword"));
    assert_eq!(errors.first("confirmPassword"), Some(MSG_PASSWORDS_DIFFER));
    assert!(!errors.contains("newPassword"));

    let input = ChangePasswordInput {
        current_password: "Password1".to_string(),
        new_password: "Password2".to_string(),
        confirm_password: "Password2".to_string(),
    };
    let data = validate_change_password(&input).unwrap();
    assert_eq!(data.new_password, "Password2");
}

#[test]
fn test_change_email() {
    let input = ChangeEmailInput {
        new_email: "new@example.com".to_string(),
        password: String::new(),
    };
    let errors = validate_change_email(&input).err().unwrap();
    assert_eq!(errors.fields().collect::<Vec<_>>(), vec!["password"]);
}

#[test]
fn test_profile_website() {
    assert!(validate_profile(&profile("")).is_ok());
    assert_eq!(validate_profile(&profile("")).unwrap().website, None);
    assert!(validate_profile(&profile("https://example.com")).is_ok());

    let errors = validate_profile(&profile("not-a-url")).err().unwrap();
    assert_eq!(errors.first("website"), Some(MSG_INVALID_URL));
}

#[test]
fn test_profile_lengths() {
    let input = ProfileInput {
        full_name: "Ada".to_string(),
        bio: Some("x".repeat(500)),
        location: Some("y".repeat(100)),
        website: None,
    };
    assert!(validate_profile(&input).is_ok());

    let input = ProfileInput {
        full_name: "Ada".to_string(),
        bio: Some("x".repeat(501)),
        location: Some("y".repeat(101)),
        website: None,
    };
    let errors = validate_profile(&input).err().unwrap();
    assert!(errors.contains("bio"));
    assert!(errors.contains("location"));
}

#[test]
fn test_profile_update_clears_blank_fields() {
    let data = validate_profile(&ProfileInput {
        full_name: "Ada".to_string(),
        bio: Some(String::new()),
        location: Some("London".to_string()),
        website: None,
    })
    .unwrap();
    let update = data.into_update();
    assert_eq!(update.bio, Some(None));
    assert_eq!(update.location, Some(Some("London".to_string())));
    assert!(update.theme_preference.is_none());
}

#[test]
fn test_avatar_checks() {
    assert!(validate_avatar("image/png", 1024).is_ok());
    assert!(validate_avatar("image/gif", MAX_AVATAR_BYTES).is_ok());

    let errors = validate_avatar("image/webp", MAX_AVATAR_BYTES + 1)
        .err()
        .unwrap();
    assert_eq!(errors.get("avatar").unwrap().len(), 2);
}
