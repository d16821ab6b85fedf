// paydesk-api: Async Rust client for the paydesk payments API (REST + realtime)

pub mod auth;
pub mod client;
pub mod error;
pub mod error_body;
pub mod realtime;
pub mod transport;

pub use auth::{ACCESS_TOKEN_KEY, AccessToken};
pub use client::{ApiClient, PhoneNumberQuery};
pub use error::Error;
pub use realtime::{ConnectionState, InboundMessage, RealtimeHandle, ReconnectConfig};
pub use transport::{TlsMode, TransportConfig};
