// crates/starterkit-lib/src/error.rs

//! Error types for provider calls and auth session operations.
use thiserror::Error;

/// Failure reported by the identity & storage provider
///
/// Transport failures and provider-side rejections ("email already
/// registered") share this shape.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ProviderError {
    pub message: String,
    /// Provider-specific code such as `user_already_exists`
    pub code: Option<String>,
}

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    pub fn with_code(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: Some(code.into()),
        }
    }

    /// Whether the provider tagged this error with `code`
    pub fn has_code(&self, code: &str) -> bool {
        self.code.as_deref() == Some(code)
    }
}

/// Error returned by auth session controller operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("{0}")]
    Provider(#[from] ProviderError),

    #[error("Profile sync failed: {0}")]
    ProfileSync(ProviderError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("No user logged in")]
    NoActiveSession,
}

impl AuthError {
    /// Called a session-dependent operation without a session. This is a
    /// caller bug rather than an outcome to render inline.
    pub fn is_precondition(&self) -> bool {
        matches!(self, AuthError::NoActiveSession)
    }

    /// Provider code, when one was reported
    pub fn provider_code(&self) -> Option<&str> {
        match self {
            AuthError::Provider(e) | AuthError::ProfileSync(e) => e.code.as_deref(),
            _ => None,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::Provider(_) => "AUTH_001",
            AuthError::ProfileSync(_) => "PROFILE_001",
            AuthError::InvalidInput(_) => "VAL_001",
            AuthError::NoActiveSession => "AUTH_002",
        }
    }

    /// Message for a transient notification
    ///
    /// Provider messages are already written for end users, so they pass
    /// through; the rest get a fixed wording.
    pub fn user_message(&self) -> String {
        match self {
            AuthError::Provider(e) => e.message.clone(),
            AuthError::ProfileSync(_) => "Failed to update profile".to_string(),
            AuthError::InvalidInput(msg) => msg.clone(),
            AuthError::NoActiveSession => "You must be logged in to do that".to_string(),
        }
    }
}

impl From<crate::validation::FieldErrors> for AuthError {
    fn from(errors: crate::validation::FieldErrors) -> Self {
        AuthError::InvalidInput(errors.to_string())
    }
}
