//! Token-exchange relay.
//!
//! The desktop client never holds the OAuth client secret. It posts the
//! authorization code or refresh token here, and the relay adds the client
//! credentials and forwards the grant to Google's token endpoint.

pub mod relay;
pub mod routes;
pub mod settings;

pub use relay::{ExchangeRequest, RefreshRequest, TokenRelay};
pub use routes::routes;
pub use settings::RelaySettings;
