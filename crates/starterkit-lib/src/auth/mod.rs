// ============================
// crates/starterkit-lib/src/auth/mod.rs
// ============================
//! Authentication module.

pub mod controller;
pub mod memory;
pub mod password;
pub mod provider;
mod tokens;

pub use controller::{
    AuthController, AuthControllerConfig, AuthState, AuthStateReader, AuthSubscription,
    SessionStatus, SignUpOutcome, RESET_EMAIL_SENT_MESSAGE,
};
pub use memory::{InMemoryProvider, MemoryProviderConfig, OutboxKind, OutboxMessage, ProviderOp};
pub use provider::{IdentityProvider, SignInResponse, SignUpResponse, UploadOptions, UserAttributes};
