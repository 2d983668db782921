// ================
// common/src/lib.rs
// ================
//! Common types and structures
//! shared between the validation engine, the auth session controller and
//! every identity provider implementation.
//! Field names follow the provider's wire format (snake_case records).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Opaque identifier of an authenticated subject
pub type SubjectId = String;

/// Email notification preferences, keyed by category
pub type NotificationPreferences = BTreeMap<String, bool>;

/// Notification category keys and their default opt-in state
pub const DEFAULT_EMAIL_NOTIFICATIONS: [(&str, bool); 4] = [
    ("accountUpdates", true),
    ("securityAlerts", true),
    ("newsletter", false),
    ("productUpdates", true),
];

/// Build the default notification preferences map
pub fn default_email_notifications() -> NotificationPreferences {
    DEFAULT_EMAIL_NOTIFICATIONS
        .iter()
        .map(|(key, enabled)| ((*key).to_string(), *enabled))
        .collect()
}

/// Password strength classification shown next to "new password" inputs
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PasswordStrength {
    Weak,
    Medium,
    Strong,
}

impl PasswordStrength {
    pub fn as_str(self) -> &'static str {
        match self {
            PasswordStrength::Weak => "weak",
            PasswordStrength::Medium => "medium",
            PasswordStrength::Strong => "strong",
        }
    }
}

impl fmt::Display for PasswordStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Theme chosen by the user
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ThemePreference {
    Light,
    Dark,
    #[default]
    System,
}

/// Theme actually applied after resolving `system`
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResolvedTheme {
    Light,
    Dark,
}

impl ThemePreference {
    /// Resolve against the host's colour-scheme preference
    pub fn resolve(self, system_prefers_dark: bool) -> ResolvedTheme {
        match self {
            ThemePreference::Light => ResolvedTheme::Light,
            ThemePreference::Dark => ResolvedTheme::Dark,
            ThemePreference::System if system_prefers_dark => ResolvedTheme::Dark,
            ThemePreference::System => ResolvedTheme::Light,
        }
    }
}

/// Metadata attached to an identity at sign-up
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct UserMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// Subject identity as reported by the identity provider
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Stable opaque identifier
    pub id: SubjectId,
    pub email: String,
    /// Set once the address has been confirmed
    pub email_confirmed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub user_metadata: UserMetadata,
    /// Number of linked login identities. Zero marks an obfuscated
    /// response for an address that is already registered.
    #[serde(default)]
    pub identity_count: usize,
}

/// Time-bounded proof of authentication
///
/// Token material is opaque to the core and only forwarded back to the
/// provider, so `Debug` redacts it.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

impl Session {
    /// Whether the session is past its expiry at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn subject_id(&self) -> &str {
        &self.user.id
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .field("user", &self.user)
            .finish()
    }
}

/// Events pushed by the provider's auth state channel
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthEvent {
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
    PasswordRecovery,
}

/// A single push notification
/// # Fields
/// * `event` - What happened on the provider side
/// * `session` - The session after the event, `None` once signed out
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AuthStateChange {
    pub event: AuthEvent,
    pub session: Option<Session>,
}

/// Mutable record owned 1:1 by a subject identity
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub id: SubjectId,
    pub full_name: String,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    #[serde(default)]
    pub theme_preference: ThemePreference,
    #[serde(default)]
    pub sidebar_collapsed: bool,
    #[serde(default)]
    pub email_notifications: NotificationPreferences,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// Fresh record for a newly registered subject
    pub fn new(id: impl Into<SubjectId>, full_name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            full_name: full_name.into(),
            avatar_url: None,
            bio: None,
            location: None,
            website: None,
            theme_preference: ThemePreference::default(),
            sidebar_collapsed: false,
            email_notifications: NotificationPreferences::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial profile update
///
/// Outer `None` leaves a field untouched. For nullable columns the inner
/// `None` clears the stored value (`null` on the wire).
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub bio: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub location: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub website: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme_preference: Option<ThemePreference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sidebar_collapsed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_notifications: Option<NotificationPreferences>,
}

/// A present key always yields `Some`, so an explicit `null` becomes `Some(None)`
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl ProfileUpdate {
    /// True when applying this update would change nothing
    pub fn is_empty(&self) -> bool {
        self == &ProfileUpdate::default()
    }

    /// Merge into `profile`; `updated_at` is left to the caller
    pub fn apply_to(&self, profile: &mut Profile) {
        if let Some(full_name) = &self.full_name {
            profile.full_name = full_name.clone();
        }
        if let Some(avatar_url) = &self.avatar_url {
            profile.avatar_url = avatar_url.clone();
        }
        if let Some(bio) = &self.bio {
            profile.bio = bio.clone();
        }
        if let Some(location) = &self.location {
            profile.location = location.clone();
        }
        if let Some(website) = &self.website {
            profile.website = website.clone();
        }
        if let Some(theme) = self.theme_preference {
            profile.theme_preference = theme;
        }
        if let Some(collapsed) = self.sidebar_collapsed {
            profile.sidebar_collapsed = collapsed;
        }
        if let Some(notifications) = &self.email_notifications {
            profile.email_notifications = notifications.clone();
        }
    }
}
