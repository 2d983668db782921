// ============================
// crates/starterkit-lib/src/auth/controller.rs
// ============================
//! Auth session controller.
//!
//! Owns the single active session/profile pair and mediates every mutation
//! through the identity provider. State is published through a
//! `tokio::sync::watch` channel; only the controller writes to it.
//!
//! Explicit operations and provider push notifications both write the
//! state and the last one to finish wins. Profile results are fenced by
//! subject: a fetch or update issued for one identity is never applied
//! once a different identity (or none) is active.
use super::provider::{IdentityProvider, UploadOptions, UserAttributes};
use crate::error::AuthError;
use crate::metrics as keys;
use crate::validation::validate_avatar;
use chrono::Utc;
use starterkit_common::{
    default_email_notifications, AuthStateChange, NotificationPreferences, Profile,
    ProfileUpdate, ResolvedTheme, Session, ThemePreference, User, UserMetadata,
};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Shown after a reset request, whether or not the address is registered
pub const RESET_EMAIL_SENT_MESSAGE: &str =
    "If an account exists for that email, you will receive a password reset link shortly.";

/// Where the session lifecycle stands
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionStatus {
    #[default]
    Anonymous,
    /// Signed up, waiting for the emailed confirmation link
    PendingVerification { email: String },
    Active,
}

/// Snapshot of the controller state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthState {
    pub user: Option<User>,
    pub profile: Option<Profile>,
    pub session: Option<Session>,
    pub status: SessionStatus,
    /// True only until the initial bootstrap finishes
    pub is_loading: bool,
}

impl AuthState {
    fn bootstrapping() -> Self {
        Self {
            user: None,
            profile: None,
            session: None,
            status: SessionStatus::Anonymous,
            is_loading: true,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    pub fn subject_id(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.id.as_str())
    }
}

/// Read-only view handed to UI components
pub trait AuthStateReader: Send + Sync {
    /// Copy of the current state
    fn snapshot(&self) -> AuthState;

    /// Receiver notified on every state change
    fn watch(&self) -> watch::Receiver<AuthState>;

    fn is_authenticated(&self) -> bool {
        self.snapshot().is_authenticated()
    }
}

/// Outcome of a successful sign-up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignUpOutcome {
    /// The account must be confirmed before a session is issued
    pub needs_verification: bool,
}

/// Deployment-specific values the controller forwards to the provider
#[derive(Debug, Clone)]
pub struct AuthControllerConfig {
    /// Absolute URL the password reset email links back to
    pub password_reset_redirect: String,
    /// Storage bucket holding avatar images
    pub avatar_bucket: String,
}

impl Default for AuthControllerConfig {
    fn default() -> Self {
        Self {
            password_reset_redirect: "http://localhost:3000/reset-password".to_string(),
            avatar_bucket: "avatars".to_string(),
        }
    }
}

/// Handle of the push-notification listener started by
/// [`AuthController::start`]. Dropping it stops the listener.
pub struct AuthSubscription {
    handle: JoinHandle<()>,
}

impl AuthSubscription {
    pub fn unsubscribe(self) {
        self.handle.abort();
    }

    pub fn is_active(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for AuthSubscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Auth session controller
pub struct AuthController {
    provider: Arc<dyn IdentityProvider>,
    config: AuthControllerConfig,
    state: watch::Sender<AuthState>,
}

impl AuthStateReader for AuthController {
    fn snapshot(&self) -> AuthState {
        self.state.borrow().clone()
    }

    fn watch(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }
}

impl AuthController {
    /// Create a controller in the bootstrapping state
    pub fn new(provider: Arc<dyn IdentityProvider>, config: AuthControllerConfig) -> Self {
        let (state, _) = watch::channel(AuthState::bootstrapping());
        Self {
            provider,
            config,
            state,
        }
    }

    /// Load any persisted session, then clear `is_loading`
    pub async fn initialize(&self) {
        self.resync().await;
        self.state.send_modify(|s| s.is_loading = false);
        debug!(authenticated = self.is_authenticated(), "Auth bootstrap finished");
    }

    /// Listen for provider push notifications until the returned handle
    /// is dropped
    pub fn start(self: &Arc<Self>) -> AuthSubscription {
        let mut changes = self.provider.subscribe();
        let controller = Arc::clone(self);
        let handle = tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(change) => controller.handle_auth_change(change).await,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Auth listener lagged, resyncing");
                        controller.resync().await;
                    },
                    Err(RecvError::Closed) => break,
                }
            }
            debug!("Auth listener stopped");
        });
        AuthSubscription { handle }
    }

    /// Apply one push notification
    pub async fn handle_auth_change(&self, change: AuthStateChange) {
        debug!(event = ?change.event, "Auth state change");
        match change.session {
            Some(session) => self.establish(session).await,
            None => self.clear(),
        }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<(), AuthError> {
        match self.provider.sign_in_with_password(email, password).await {
            Ok(response) => {
                ::metrics::counter!(keys::AUTH_SIGN_IN).increment(1);
                // The push channel delivers the session too; apply it now
                // when the response already carries it.
                if let Some(session) = response.session {
                    self.establish(session).await;
                }
                Ok(())
            },
            Err(e) => {
                ::metrics::counter!(keys::AUTH_FAILURE).increment(1);
                warn!(code = ?e.code, "Sign in rejected: {e}");
                Err(e.into())
            },
        }
    }

    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<SignUpOutcome, AuthError> {
        let metadata = UserMetadata {
            full_name: Some(full_name.to_string()),
            avatar_url: None,
        };
        let response = self
            .provider
            .sign_up(email, password, &metadata)
            .await
            .map_err(|e| {
                ::metrics::counter!(keys::AUTH_FAILURE).increment(1);
                warn!(code = ?e.code, "Sign up rejected: {e}");
                AuthError::from(e)
            })?;
        ::metrics::counter!(keys::AUTH_SIGN_UP).increment(1);

        if let Some(session) = response.session {
            self.establish(session).await;
            return Ok(SignUpOutcome {
                needs_verification: false,
            });
        }

        // No identities on the returned user means the address was already
        // registered and the provider hid that fact.
        let needs_verification = response.user.as_ref().is_none_or(|u| u.identity_count != 0);
        if needs_verification {
            let email = email.to_string();
            self.state.send_if_modified(|s| {
                if s.status == SessionStatus::Active {
                    return false;
                }
                s.status = SessionStatus::PendingVerification { email };
                true
            });
            info!("Sign up awaiting email confirmation");
        }
        Ok(SignUpOutcome { needs_verification })
    }

    /// Revoke the session with the provider and clear local state
    ///
    /// Local state is cleared even when the provider call fails; that
    /// failure is returned for the caller to record but is not fatal.
    pub async fn sign_out(&self) -> Option<AuthError> {
        let result = self.provider.sign_out().await;
        self.clear();
        ::metrics::counter!(keys::AUTH_SIGN_OUT).increment(1);
        match result {
            Ok(()) => None,
            Err(e) => {
                warn!("Provider sign out failed, local session cleared anyway: {e}");
                Some(e.into())
            },
        }
    }

    /// Request a password reset email
    ///
    /// Succeeds for unknown addresses too so the caller can always show
    /// [`RESET_EMAIL_SENT_MESSAGE`].
    pub async fn reset_password(&self, email: &str) -> Result<(), AuthError> {
        let result = self
            .provider
            .send_password_reset_email(email, &self.config.password_reset_redirect)
            .await;
        hide_unknown_account(result)
    }

    /// Send the signup confirmation email again
    pub async fn resend_verification_email(&self, email: &str) -> Result<(), AuthError> {
        hide_unknown_account(self.provider.resend_verification_email(email).await)
    }

    pub async fn update_password(&self, new_password: &str) -> Result<(), AuthError> {
        let subject = self.active_subject()?;
        let attributes = UserAttributes {
            password: Some(new_password.to_string()),
        };
        let user = self.provider.update_current_user(&attributes).await?;
        self.state.send_if_modified(|s| {
            if s.subject_id() != Some(subject.as_str()) {
                return false;
            }
            if let Some(session) = s.session.as_mut() {
                session.user = user.clone();
            }
            s.user = Some(user);
            true
        });
        info!(subject = %subject, "Password updated");
        Ok(())
    }

    /// Merge `update` into the profile and return the stored record
    ///
    /// Local state only changes after the provider confirms the write.
    pub async fn update_profile(&self, update: ProfileUpdate) -> Result<Profile, AuthError> {
        let subject = self.active_subject()?;
        if update.is_empty() {
            if let Some(profile) = self.snapshot().profile {
                return Ok(profile);
            }
            return self.fetch_profile(&subject).await;
        }

        let record = self
            .provider
            .upsert_profile_record(&subject, &update, Utc::now())
            .await
            .map_err(|e| {
                ::metrics::counter!(keys::PROFILE_SYNC_FAILED).increment(1);
                error!(subject = %subject, "Profile update failed: {e}");
                AuthError::ProfileSync(e)
            })?;
        ::metrics::counter!(keys::PROFILE_UPDATED).increment(1);

        if !self.apply_profile(&subject, record.clone()) {
            debug!(subject = %subject, "Session changed while updating, profile result discarded");
        }
        Ok(record)
    }

    /// Re-fetch the profile of the active subject; clears it when signed out
    pub async fn refresh_profile(&self) -> Result<(), AuthError> {
        let Some(subject) = self.snapshot().subject_id().map(str::to_string) else {
            self.state.send_if_modified(|s| s.profile.take().is_some());
            return Ok(());
        };
        self.fetch_profile(&subject).await.map(|_| ())
    }

    /// Store a new avatar image and point the profile at it
    pub async fn upload_avatar(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<Profile, AuthError> {
        let subject = self.active_subject()?;
        validate_avatar(content_type, bytes.len() as u64)?;

        let extension = file_name
            .rsplit_once('.')
            .map_or(file_name, |(_, ext)| ext)
            .to_lowercase();
        let path = format!("{}/{subject}/avatar.{extension}", self.config.avatar_bucket);
        let public_url = self
            .provider
            .upload_binary(&path, bytes, UploadOptions { overwrite: true })
            .await?;
        debug!(subject = %subject, path = %path, "Avatar uploaded");

        self.update_profile(ProfileUpdate {
            avatar_url: Some(Some(public_url)),
            ..ProfileUpdate::default()
        })
        .await
    }

    /// Delete every stored avatar of the active subject and clear the URL
    pub async fn delete_avatar(&self) -> Result<Profile, AuthError> {
        let subject = self.active_subject()?;
        let prefix = format!("{}/{subject}/", self.config.avatar_bucket);
        let files = self.provider.list_files(&prefix).await?;
        if !files.is_empty() {
            self.provider.delete_files(&files).await?;
        }
        self.update_profile(ProfileUpdate {
            avatar_url: Some(None),
            ..ProfileUpdate::default()
        })
        .await
    }

    /// Theme to render, `system` following the host preference
    pub fn resolved_theme(&self, system_prefers_dark: bool) -> ResolvedTheme {
        self.snapshot()
            .profile
            .map_or(ThemePreference::System, |p| p.theme_preference)
            .resolve(system_prefers_dark)
    }

    /// Notification preferences with defaults for unset categories
    pub fn email_notification_preferences(&self) -> NotificationPreferences {
        let mut preferences = default_email_notifications();
        if let Some(profile) = self.snapshot().profile {
            preferences.extend(profile.email_notifications);
        }
        preferences
    }

    fn active_subject(&self) -> Result<String, AuthError> {
        let state = self.state.borrow();
        match (&state.session, state.subject_id()) {
            (Some(_), Some(subject)) => Ok(subject.to_string()),
            _ => Err(AuthError::NoActiveSession),
        }
    }

    /// Reconcile with the provider's current session
    async fn resync(&self) {
        match self.provider.get_session().await {
            Ok(Some(session)) => self.establish(session).await,
            Ok(None) => self.clear(),
            Err(e) => error!("Failed to load session: {e}"),
        }
    }

    async fn establish(&self, session: Session) {
        let subject = session.user.id.clone();
        self.state.send_modify(|s| {
            if s.subject_id() != Some(subject.as_str()) {
                s.profile = None;
            }
            s.user = Some(session.user.clone());
            s.session = Some(session);
            s.status = SessionStatus::Active;
        });
        debug!(subject = %subject, "Session active");

        if let Err(e) = self.fetch_profile(&subject).await {
            warn!(subject = %subject, "Profile unavailable after sign in: {e}");
        }
    }

    fn clear(&self) {
        self.state.send_if_modified(|s| {
            let changed = s.session.is_some()
                || s.user.is_some()
                || s.profile.is_some()
                || s.status != SessionStatus::Anonymous;
            s.user = None;
            s.profile = None;
            s.session = None;
            s.status = SessionStatus::Anonymous;
            changed
        });
    }

    async fn fetch_profile(&self, subject: &str) -> Result<Profile, AuthError> {
        let profile = self
            .provider
            .get_profile_record(subject)
            .await
            .map_err(|e| {
                ::metrics::counter!(keys::PROFILE_SYNC_FAILED).increment(1);
                AuthError::ProfileSync(e)
            })?;
        self.apply_profile(subject, profile.clone());
        Ok(profile)
    }

    /// Store `profile` if `subject` is still the active identity
    fn apply_profile(&self, subject: &str, profile: Profile) -> bool {
        self.state.send_if_modified(|s| {
            if s.session.is_none() || s.subject_id() != Some(subject) {
                return false;
            }
            s.profile = Some(profile);
            true
        })
    }
}

/// Unknown-account failures look like success to the caller
fn hide_unknown_account(result: Result<(), crate::error::ProviderError>) -> Result<(), AuthError> {
    match result {
        Ok(()) => Ok(()),
        Err(e) if e.has_code("user_not_found") => {
            debug!("Suppressed unknown account error");
            Ok(())
        },
        Err(e) => Err(e.into()),
    }
}
