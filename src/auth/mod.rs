//! Authentication split into logical submodules
//!
//! - provider: identity provider seam and the Firebase REST implementation
//! - google: Google OAuth consent flow used for Google sign-in
//! - store: keyring persistence of the refresh token
//! - session: the session manager and its auth-state subscription

pub mod google;
pub mod provider;
pub mod session;
pub mod store;

pub use google::{DisabledGoogleFlow, GoogleFlow, InstalledGoogleFlow};
pub use provider::{FirebaseAuth, Identity, IdentityProvider, ProviderSession};
pub use session::{AuthState, AuthSubscription, SessionManager};
pub use store::{KeyringEntry, KEYRING_SERVICE_NAME, KEYRING_USERNAME};
