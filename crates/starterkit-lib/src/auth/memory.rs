// ============================
// crates/starterkit-lib/src/auth/memory.rs
// ============================
//! In-process identity & storage provider.
//!
//! Behaves like the hosted service closely enough to drive the controller
//! in tests and in the CLI demo: accounts with scrypt hashes, bearer
//! sessions, a profile table, an object store and the auth push channel.
use super::password::{hash_password_secure, verify_password};
use super::provider::{
    IdentityProvider, SignInResponse, SignUpResponse, UploadOptions, UserAttributes,
};
use super::tokens::issue_session;
use crate::error::ProviderError;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::{mapref::entry::Entry, DashMap};
use starterkit_common::{
    AuthEvent, AuthStateChange, Profile, ProfileUpdate, Session, User, UserMetadata,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex, OwnedRwLockWriteGuard, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

/// Capacity of the auth state push channel
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Default access token lifetime (1 hour)
pub const DEFAULT_SESSION_TTL_SECS: i64 = 60 * 60;

/// Behaviour switches for [`InMemoryProvider`]
#[derive(Debug, Clone)]
pub struct MemoryProviderConfig {
    /// New accounts get no session until their email is confirmed
    pub require_email_confirmation: bool,
    /// Answer sign-up for a known address with an identity-less user
    /// instead of an error
    pub obfuscate_existing_accounts: bool,
    pub session_ttl: Duration,
    /// Prefix of public object URLs
    pub public_base_url: String,
}

impl Default for MemoryProviderConfig {
    fn default() -> Self {
        Self {
            require_email_confirmation: false,
            obfuscate_existing_accounts: false,
            session_ttl: Duration::seconds(DEFAULT_SESSION_TTL_SECS),
            public_base_url: "http://localhost:54321".to_string(),
        }
    }
}

/// Provider calls that can be made to fail on demand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderOp {
    GetSession,
    SignIn,
    SignUp,
    SignOut,
    SendPasswordReset,
    ResendVerification,
    UpdateUser,
    GetProfile,
    UpsertProfile,
    Upload,
    ListFiles,
    DeleteFiles,
}

/// Kind of email the provider would have sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboxKind {
    Verification,
    PasswordReset { redirect_url: String },
}

/// An email the provider would have sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboxMessage {
    pub email: String,
    pub kind: OutboxKind,
}

struct Account {
    user: User,
    password_hash: String,
}

/// Identity & storage provider kept entirely in memory
pub struct InMemoryProvider {
    config: MemoryProviderConfig,
    /// Accounts keyed by lowercased email
    accounts: DashMap<String, Account>,
    profiles: DashMap<String, Profile>,
    objects: DashMap<String, Vec<u8>>,
    current: RwLock<Option<Session>>,
    outbox: Mutex<Vec<OutboxMessage>>,
    failures: DashMap<ProviderOp, ProviderError>,
    events: broadcast::Sender<AuthStateChange>,
    profile_gate: Arc<RwLock<()>>,
    waiting_profile_writes: AtomicUsize,
}

impl Default for InMemoryProvider {
    fn default() -> Self {
        Self::new(MemoryProviderConfig::default())
    }
}

impl InMemoryProvider {
    pub fn new(config: MemoryProviderConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            config,
            accounts: DashMap::new(),
            profiles: DashMap::new(),
            objects: DashMap::new(),
            current: RwLock::new(None),
            outbox: Mutex::new(Vec::new()),
            failures: DashMap::new(),
            events,
            profile_gate: Arc::new(RwLock::new(())),
            waiting_profile_writes: AtomicUsize::new(0),
        }
    }

    /// Make the next call of `op` fail with `error`
    pub fn fail_next(&self, op: ProviderOp, error: ProviderError) {
        self.failures.insert(op, error);
    }

    /// Block profile writes until the returned guard is dropped
    pub async fn hold_profile_writes(&self) -> OwnedRwLockWriteGuard<()> {
        Arc::clone(&self.profile_gate).write_owned().await
    }

    /// Profile writes currently blocked by [`Self::hold_profile_writes`]
    pub fn pending_profile_writes(&self) -> usize {
        self.waiting_profile_writes.load(Ordering::SeqCst)
    }

    /// Confirm an address as if the user clicked the emailed link,
    /// which signs them in
    pub async fn confirm_email(&self, email: &str) -> Result<Session, ProviderError> {
        let user = {
            let mut account = self
                .accounts
                .get_mut(&email.to_lowercase())
                .ok_or_else(|| ProviderError::with_code("User not found", "user_not_found"))?;
            account.user.email_confirmed_at = Some(Utc::now());
            account.user.clone()
        };
        self.start_session(user, AuthEvent::SignedIn).await
    }

    /// Open the emailed reset link, which signs the user in for recovery
    pub async fn open_recovery_link(&self, email: &str) -> Result<Session, ProviderError> {
        let user = self
            .accounts
            .get(&email.to_lowercase())
            .map(|a| a.user.clone())
            .ok_or_else(|| ProviderError::with_code("User not found", "user_not_found"))?;
        self.start_session(user, AuthEvent::PasswordRecovery).await
    }

    /// End the current session as if its refresh token lapsed
    pub async fn expire_session(&self) {
        if self.current.write().await.take().is_some() {
            info!("Session expired");
            self.emit(AuthEvent::SignedOut, None);
        }
    }

    /// Rotate the current session's tokens
    pub async fn refresh_session(&self) -> Result<Session, ProviderError> {
        let user = self.current_user().await?;
        self.start_session(user, AuthEvent::TokenRefreshed).await
    }

    /// Emails "sent" so far
    pub async fn outbox(&self) -> Vec<OutboxMessage> {
        self.outbox.lock().await.clone()
    }

    /// Stored profile row, bypassing failure injection
    pub fn stored_profile(&self, subject_id: &str) -> Option<Profile> {
        self.profiles.get(subject_id).map(|p| p.clone())
    }

    /// Overwrite a stored profile row, as another client would
    pub fn put_profile(&self, profile: Profile) {
        self.profiles.insert(profile.id.clone(), profile);
    }

    /// Stored object bytes
    pub fn object(&self, path: &str) -> Option<Vec<u8>> {
        self.objects.get(path).map(|o| o.clone())
    }

    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    fn take_failure(&self, op: ProviderOp) -> Result<(), ProviderError> {
        match self.failures.remove(&op) {
            Some((_, error)) => Err(error),
            None => Ok(()),
        }
    }

    fn emit(&self, event: AuthEvent, session: Option<Session>) {
        // no subscribers is fine
        let _ = self.events.send(AuthStateChange { event, session });
    }

    async fn start_session(&self, user: User, event: AuthEvent) -> Result<Session, ProviderError> {
        let session = issue_session(user, self.config.session_ttl, Utc::now())?;
        *self.current.write().await = Some(session.clone());
        debug!(subject = %session.user.id, ?event, "Session issued");
        self.emit(event, Some(session.clone()));
        Ok(session)
    }

    async fn current_user(&self) -> Result<User, ProviderError> {
        self.current
            .read()
            .await
            .as_ref()
            .map(|s| s.user.clone())
            .ok_or_else(|| ProviderError::with_code("Auth session missing!", "session_not_found"))
    }

    fn public_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{path}",
            self.config.public_base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl IdentityProvider for InMemoryProvider {
    async fn get_session(&self) -> Result<Option<Session>, ProviderError> {
        self.take_failure(ProviderOp::GetSession)?;
        let mut current = self.current.write().await;
        if current.as_ref().is_some_and(|s| s.is_expired_at(Utc::now())) {
            *current = None;
        }
        Ok(current.clone())
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<SignInResponse, ProviderError> {
        self.take_failure(ProviderOp::SignIn)?;
        let user = {
            let account = self.accounts.get(&email.to_lowercase());
            match account {
                Some(a) if verify_password(&a.password_hash, password) => a.user.clone(),
                _ => {
                    return Err(ProviderError::with_code(
                        "Invalid login credentials",
                        "invalid_credentials",
                    ))
                },
            }
        };
        if user.email_confirmed_at.is_none() {
            return Err(ProviderError::with_code(
                "Email not confirmed",
                "email_not_confirmed",
            ));
        }
        let session = self.start_session(user, AuthEvent::SignedIn).await?;
        Ok(SignInResponse {
            session: Some(session),
        })
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &UserMetadata,
    ) -> Result<SignUpResponse, ProviderError> {
        self.take_failure(ProviderOp::SignUp)?;
        let key = email.to_lowercase();
        let now = Utc::now();

        // hash before reserving the key so no shard lock is held meanwhile
        let mut plain = password.to_string();
        let password_hash = hash_password_secure(&mut plain)?;
        let confirmed = !self.config.require_email_confirmation;
        let user = User {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            email_confirmed_at: confirmed.then_some(now),
            created_at: now,
            user_metadata: metadata.clone(),
            identity_count: 1,
        };

        match self.accounts.entry(key) {
            Entry::Occupied(_) if self.config.obfuscate_existing_accounts => {
                let decoy = User {
                    identity_count: 0,
                    email_confirmed_at: None,
                    ..user
                };
                return Ok(SignUpResponse {
                    user: Some(decoy),
                    session: None,
                });
            },
            Entry::Occupied(_) => {
                return Err(ProviderError::with_code(
                    "User already registered",
                    "user_already_exists",
                ));
            },
            Entry::Vacant(slot) => {
                slot.insert(Account {
                    user: user.clone(),
                    password_hash,
                });
            },
        }
        let full_name = metadata.full_name.clone().unwrap_or_default();
        self.profiles
            .insert(user.id.clone(), Profile::new(user.id.clone(), full_name, now));
        info!(subject = %user.id, confirmed, "Account created");

        if !confirmed {
            self.outbox.lock().await.push(OutboxMessage {
                email: email.to_string(),
                kind: OutboxKind::Verification,
            });
            return Ok(SignUpResponse {
                user: Some(user),
                session: None,
            });
        }

        let session = self.start_session(user.clone(), AuthEvent::SignedIn).await?;
        Ok(SignUpResponse {
            user: Some(user),
            session: Some(session),
        })
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        self.take_failure(ProviderOp::SignOut)?;
        self.current.write().await.take();
        self.emit(AuthEvent::SignedOut, None);
        Ok(())
    }

    async fn send_password_reset_email(
        &self,
        email: &str,
        redirect_url: &str,
    ) -> Result<(), ProviderError> {
        self.take_failure(ProviderOp::SendPasswordReset)?;
        // unknown addresses get the same answer
        if self.accounts.contains_key(&email.to_lowercase()) {
            self.outbox.lock().await.push(OutboxMessage {
                email: email.to_string(),
                kind: OutboxKind::PasswordReset {
                    redirect_url: redirect_url.to_string(),
                },
            });
        }
        Ok(())
    }

    async fn resend_verification_email(&self, email: &str) -> Result<(), ProviderError> {
        self.take_failure(ProviderOp::ResendVerification)?;
        let unconfirmed = self
            .accounts
            .get(&email.to_lowercase())
            .is_some_and(|a| a.user.email_confirmed_at.is_none());
        if unconfirmed {
            self.outbox.lock().await.push(OutboxMessage {
                email: email.to_string(),
                kind: OutboxKind::Verification,
            });
        }
        Ok(())
    }

    async fn update_current_user(
        &self,
        attributes: &UserAttributes,
    ) -> Result<User, ProviderError> {
        self.take_failure(ProviderOp::UpdateUser)?;
        let subject_id = self.current_user().await?.id;
        let password_hash = match &attributes.password {
            Some(password) => {
                let mut plain = password.clone();
                Some(hash_password_secure(&mut plain)?)
            },
            None => None,
        };

        let user = {
            let mut account = self
                .accounts
                .iter_mut()
                .find(|entry| entry.user.id == subject_id)
                .ok_or_else(|| ProviderError::with_code("User not found", "user_not_found"))?;
            if let Some(hash) = password_hash {
                account.password_hash = hash;
            }
            account.user.clone()
        };

        let session = {
            let mut current = self.current.write().await;
            if let Some(session) = current.as_mut() {
                session.user = user.clone();
            }
            current.clone()
        };
        self.emit(AuthEvent::UserUpdated, session);
        Ok(user)
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthStateChange> {
        self.events.subscribe()
    }

    async fn get_profile_record(&self, subject_id: &str) -> Result<Profile, ProviderError> {
        self.take_failure(ProviderOp::GetProfile)?;
        self.profiles
            .get(subject_id)
            .map(|p| p.clone())
            .ok_or_else(|| ProviderError::with_code("Profile not found", "PGRST116"))
    }

    async fn upsert_profile_record(
        &self,
        subject_id: &str,
        fields: &ProfileUpdate,
        updated_at: DateTime<Utc>,
    ) -> Result<Profile, ProviderError> {
        self.take_failure(ProviderOp::UpsertProfile)?;

        self.waiting_profile_writes.fetch_add(1, Ordering::SeqCst);
        let _gate = self.profile_gate.read().await;
        self.waiting_profile_writes.fetch_sub(1, Ordering::SeqCst);

        let mut entry = self.profiles.entry(subject_id.to_string()).or_insert_with(|| {
            Profile::new(
                subject_id,
                fields.full_name.clone().unwrap_or_default(),
                updated_at,
            )
        });
        fields.apply_to(&mut entry);
        entry.updated_at = updated_at;
        Ok(entry.clone())
    }

    async fn upload_binary(
        &self,
        path: &str,
        bytes: Vec<u8>,
        options: UploadOptions,
    ) -> Result<String, ProviderError> {
        self.take_failure(ProviderOp::Upload)?;
        if !options.overwrite && self.objects.contains_key(path) {
            return Err(ProviderError::with_code(
                "The resource already exists",
                "Duplicate",
            ));
        }
        self.objects.insert(path.to_string(), bytes);
        Ok(self.public_url(path))
    }

    async fn list_files(&self, prefix: &str) -> Result<Vec<String>, ProviderError> {
        self.take_failure(ProviderOp::ListFiles)?;
        let mut paths: Vec<String> = self
            .objects
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .map(|entry| entry.key().clone())
            .collect();
        paths.sort();
        Ok(paths)
    }

    async fn delete_files(&self, paths: &[String]) -> Result<(), ProviderError> {
        self.take_failure(ProviderOp::DeleteFiles)?;
        for path in paths {
            self.objects.remove(path);
        }
        Ok(())
    }
}
