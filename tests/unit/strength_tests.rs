// ============================
// tests/unit/strength_tests.rs
// ============================
//! Unit tests for the password strength meter
use starterkit_common::PasswordStrength;
use starterkit_lib::validation::{meets_password_policy, password_strength};

#[test]
fn test_short_passwords_are_always_weak() {
    for password in ["", "a", "Ab1!", "Abc12!@", "ÄÖÜäöü1", "Pass1!x"] {
        assert_eq!(
            password_strength(password),
            PasswordStrength::Weak,
            "{password:?} should be weak"
        );
    }
}

#[test]
fn test_long_passwords_with_every_class_are_strong() {
    for password in ["Password123!", "Tr0ub4dor&3x", "correct-Horse-9-battery"] {
        assert_eq!(
            password_strength(password),
            PasswordStrength::Strong,
            "{password:?} should be strong"
        );
    }
}

#[test]
fn test_strength_scenarios() {
    assert_eq!(password_strength("abc"), PasswordStrength::Weak);
    assert_eq!(password_strength("Password1"), PasswordStrength::Medium);
    assert_eq!(password_strength("Password123!"), PasswordStrength::Strong);

    // twelve spaces: both length points plus a symbol
    assert_eq!(password_strength("            "), PasswordStrength::Medium);
    assert_eq!(password_strength("abcdefgh"), PasswordStrength::Weak);
    // eight characters and three classes
    assert_eq!(password_strength("abcdefg1"), PasswordStrength::Medium);
}

#[test]
fn test_strength_is_independent_of_policy() {
    // strong enough for the meter without meeting the policy
    assert_eq!(password_strength("password123!"), PasswordStrength::Strong);
    assert!(!meets_password_policy("password123!"));
    assert!(meets_password_policy("Password1"));
}

#[test]
fn test_strength_display() {
    assert_eq!(PasswordStrength::Medium.to_string(), "medium");
    assert_eq!(
        serde_json::to_string(&PasswordStrength::Strong).unwrap(),
        "\"strong\""
    );
}
