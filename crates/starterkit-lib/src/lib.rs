// ============================
// starterkit-lib/src/lib.rs
// ============================
//! Form validation and auth session core of the starter kit.

pub mod auth;
pub mod config;
pub mod error;
pub mod metrics;
pub mod validation;

use crate::auth::{
    AuthController, AuthControllerConfig, AuthStateReader, IdentityProvider, InMemoryProvider,
    MemoryProviderConfig,
};
use crate::config::Settings;
use std::sync::Arc;

/// Application state built once by the composition root
#[derive(Clone)]
pub struct AppState {
    /// Auth session controller
    pub auth: Arc<AuthController>,
    /// Settings the state was built from
    pub settings: Arc<Settings>,
}

impl AppState {
    /// Create the application state around `provider`
    pub fn new(provider: Arc<dyn IdentityProvider>, settings: Settings) -> Self {
        let auth = Arc::new(AuthController::new(
            provider,
            AuthControllerConfig::from(&settings),
        ));
        Self {
            auth,
            settings: Arc::new(settings),
        }
    }

    /// Create the application state backed by an in-memory provider,
    /// returning the provider too so callers can drive its test hooks
    pub fn with_memory_provider(settings: Settings) -> (Self, Arc<InMemoryProvider>) {
        let provider = Arc::new(InMemoryProvider::new(MemoryProviderConfig::from(
            &settings.memory_provider,
        )));
        let state = Self::new(provider.clone(), settings);
        (state, provider)
    }

    /// Read-only view of the auth state for UI components
    pub fn auth_reader(&self) -> Arc<dyn AuthStateReader> {
        self.auth.clone()
    }
}
