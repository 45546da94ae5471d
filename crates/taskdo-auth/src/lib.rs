//! Google account authentication for taskdo.
//!
//! Drives the interactive OAuth flow, exchanges and refreshes tokens through
//! the token relay, and keeps the account list in the synced store.

pub mod account;
pub mod error;
pub mod google;
pub mod identity;
pub mod service;

pub use account::{AccountStore, UserAccount};
pub use error::AuthError;
pub use google::{AuthorizationRequest, Profile, RelayClient, TokenResponse};
pub use identity::{BrowserOpener, IdentityFlow, LoopbackIdentityFlow};
pub use service::{AuthService, AuthSettings, TokenRefresher};
