// ── Runtime connection configuration ──
//
// These types describe *how* to reach the payments backend. They carry
// the bearer token and connection tuning, but never touch disk: the CLI
// resolves a profile and hands a `ClientConfig` in.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification (staging backends with self-signed certs).
    DangerAcceptInvalid,
}

/// Configuration for talking to one backend.
///
/// Built by the CLI, passed to [`Dashboard`](crate::Dashboard); core never
/// reads config files or the keyring.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend base URL (e.g. `https://pay.example.com`).
    pub url: Url,
    /// Realtime endpoint. Derived from `url` when `None`.
    pub realtime_url: Option<Url>,
    /// Bearer token. Absent means unauthenticated requests.
    pub token: Option<SecretString>,
    pub tls: TlsVerification,
    pub timeout: Duration,
    /// Connect the realtime channel for live views.
    pub realtime_enabled: bool,
    /// Page size for server-paginated listings.
    pub page_size: u32,
}

impl ClientConfig {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            realtime_url: None,
            token: None,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            realtime_enabled: true,
            page_size: 100,
        }
    }

    pub fn with_token(mut self, token: SecretString) -> Self {
        self.token = Some(token);
        self
    }
}
