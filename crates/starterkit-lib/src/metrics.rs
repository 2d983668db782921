// ==============
// crates/starterkit-lib/src/metrics.rs

//! Central place for metric keys
pub const AUTH_SIGN_IN: &str = "auth.sign_in";
pub const AUTH_SIGN_UP: &str = "auth.sign_up";
pub const AUTH_SIGN_OUT: &str = "auth.sign_out";
pub const AUTH_FAILURE: &str = "auth.failure";
pub const PROFILE_UPDATED: &str = "profile.updated";
pub const PROFILE_SYNC_FAILED: &str = "profile.sync_failed";
