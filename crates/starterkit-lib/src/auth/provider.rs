//! Identity & storage provider abstraction.
use crate::error::ProviderError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use starterkit_common::{AuthStateChange, Profile, ProfileUpdate, Session, User, UserMetadata};
use tokio::sync::broadcast;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Result of a password-grant sign-in
#[derive(Debug, Clone)]
pub struct SignInResponse {
    /// Providers may deliver the session only through the push channel
    pub session: Option<Session>,
}

/// Result of a sign-up request
#[derive(Debug, Clone)]
pub struct SignUpResponse {
    pub user: Option<User>,
    /// `None` when the account must be confirmed first
    pub session: Option<Session>,
}

/// Attributes accepted by [`IdentityProvider::update_current_user`]
#[derive(Clone, Default, Zeroize, ZeroizeOnDrop)]
pub struct UserAttributes {
    pub password: Option<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UploadOptions {
    /// Replace an existing object at the same path
    pub overwrite: bool,
}

/// The single external collaborator of the auth core
///
/// Implementations talk to a hosted auth/storage service. Every call may
/// fail with a [`ProviderError`]; none of them retry.
#[async_trait]
pub trait IdentityProvider: Send + Sync + 'static {
    /// Session persisted from an earlier run, if any
    async fn get_session(&self) -> Result<Option<Session>, ProviderError>;

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<SignInResponse, ProviderError>;

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &UserMetadata,
    ) -> Result<SignUpResponse, ProviderError>;

    async fn sign_out(&self) -> Result<(), ProviderError>;

    /// Send an out-of-band reset link pointing at `redirect_url`
    async fn send_password_reset_email(
        &self,
        email: &str,
        redirect_url: &str,
    ) -> Result<(), ProviderError>;

    async fn resend_verification_email(&self, email: &str) -> Result<(), ProviderError>;

    /// Update the signed-in user's credentials
    async fn update_current_user(&self, attributes: &UserAttributes)
        -> Result<User, ProviderError>;

    /// Register for auth state push notifications
    fn subscribe(&self) -> broadcast::Receiver<AuthStateChange>;

    async fn get_profile_record(&self, subject_id: &str) -> Result<Profile, ProviderError>;

    /// Merge `fields` into the stored record and return the full row
    async fn upsert_profile_record(
        &self,
        subject_id: &str,
        fields: &ProfileUpdate,
        updated_at: DateTime<Utc>,
    ) -> Result<Profile, ProviderError>;

    /// Store `bytes` at `path` and return its public URL
    async fn upload_binary(
        &self,
        path: &str,
        bytes: Vec<u8>,
        options: UploadOptions,
    ) -> Result<String, ProviderError>;

    /// Full paths of the objects under `prefix`
    async fn list_files(&self, prefix: &str) -> Result<Vec<String>, ProviderError>;

    async fn delete_files(&self, paths: &[String]) -> Result<(), ProviderError>;
}
