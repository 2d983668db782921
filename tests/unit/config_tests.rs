// ============================
// tests/unit/config_tests.rs
// ============================
//! Unit tests for the configuration module
use starterkit_lib::{auth::AuthControllerConfig, config::Settings, AppState};
use tempfile::tempdir;

#[test]
fn test_load_from_file_with_sections() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("custom.toml");
    std::fs::write(
        &config_path,
        r#"
        site_url = "https://app.example.com"
        reset_redirect_path = "/auth/reset"
        avatar_bucket = "profile-images"

        [memory_provider]
        require_email_confirmation = false
        obfuscate_existing_accounts = true
        "#,
    )
    .unwrap();

    let settings = Settings::load_layered(&config_path, "STARTERKIT_UNITTEST_").unwrap();
    assert_eq!(
        settings.password_reset_redirect(),
        "https://app.example.com/auth/reset"
    );
    assert!(settings.memory_provider.obfuscate_existing_accounts);
    assert_eq!(settings.memory_provider.session_ttl_secs, 3600);

    let controller = AuthControllerConfig::from(&settings);
    assert_eq!(controller.avatar_bucket, "profile-images");
}

#[test]
fn test_invalid_values_are_rejected() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("bad.toml");
    std::fs::write(&config_path, "site_url = \"ftp://files.example.com\"\n").unwrap();
    assert!(Settings::load_layered(&config_path, "STARTERKIT_UNITBAD_").is_err());

    std::fs::write(&config_path, "memory_provider = 3\n").unwrap();
    assert!(Settings::load_layered(&config_path, "STARTERKIT_UNITBAD_").is_err());

    std::fs::write(
        &config_path,
        "[memory_provider]\nsession_ttl_secs = 10000000000000\n",
    )
    .unwrap();
    assert!(Settings::load_layered(&config_path, "STARTERKIT_UNITBAD_").is_err());
}

#[tokio::test]
async fn test_app_state_uses_settings() {
    let mut settings = Settings::default();
    settings.memory_provider.require_email_confirmation = false;
    let (state, provider) = AppState::with_memory_provider(settings.clone());

    assert_eq!(*state.settings, settings);
    assert_eq!(provider.account_count(), 0);
    assert!(state.auth_reader().snapshot().is_loading);
}
