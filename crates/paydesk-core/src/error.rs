// ── Core error types ──
//
// User-facing errors from paydesk-core. Consumers never see raw HTTP
// plumbing: the `From<paydesk_api::Error>` impl translates transport
// failures into domain variants, and `user_message()` renders the text
// a list view shows in its error panel.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach backend at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {}", joined(.messages, "access denied"))]
    AuthenticationFailed {
        /// Messages extracted from the backend's error body.
        messages: Vec<String>,
    },

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Not found: {resource} {identifier}")]
    NotFound {
        resource: String,
        identifier: String,
        /// Messages extracted from the backend's error body.
        messages: Vec<String>,
    },

    #[error("Unexpected response: {message}")]
    InvalidResponse { message: String },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("View closed")]
    ViewClosed,

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {}", .messages.join("; "))]
    Api {
        /// Messages extracted from the backend's error body.
        messages: Vec<String>,
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// Text for the error panel. Backend-provided messages win;
    /// otherwise `fallback` (e.g. "Failed to load devices").
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Api { messages, .. }
            | Self::AuthenticationFailed { messages }
            | Self::NotFound { messages, .. }
                if !messages.is_empty() =>
            {
                messages.join("\n")
            }
            Self::ValidationFailed { message } => message.clone(),
            Self::NotFound { .. } | Self::Timeout { .. } | Self::ConnectionFailed { .. } => {
                format!("{fallback}: {self}")
            }
            _ => fallback.to_owned(),
        }
    }
}

fn joined(messages: &[String], empty: &str) -> String {
    if messages.is_empty() {
        empty.to_owned()
    } else {
        messages.join("; ")
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<paydesk_api::Error> for CoreError {
    fn from(err: paydesk_api::Error) -> Self {
        match err {
            paydesk_api::Error::Unauthorized { messages }
            | paydesk_api::Error::Api {
                status: 403,
                messages,
            } => CoreError::AuthenticationFailed { messages },
            paydesk_api::Error::InvalidToken(reason) => CoreError::AuthenticationFailed {
                messages: vec![format!("Invalid access token: {reason}")],
            },
            // Timeouts arrive as `Error::Timeout`, mapped by the client.
            paydesk_api::Error::Transport(ref e) => {
                if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        messages: vec![e.to_string()],
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            paydesk_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            paydesk_api::Error::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            paydesk_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            paydesk_api::Error::Api {
                status: 404,
                messages,
            } => CoreError::NotFound {
                resource: "resource".into(),
                identifier: "(HTTP 404)".into(),
                messages,
            },
            paydesk_api::Error::Api { status, messages } => CoreError::Api {
                messages,
                status: Some(status),
            },
            paydesk_api::Error::WebSocketConnect(reason) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("realtime connection failed: {reason}"),
            },
            paydesk_api::Error::WebSocketClosed { code, reason } => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("realtime channel closed (code {code}): {reason}"),
            },
            paydesk_api::Error::Deserialization { message, body: _ } => {
                CoreError::InvalidResponse { message }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_messages_win_over_fallback() {
        let err = CoreError::from(paydesk_api::Error::Api {
            status: 400,
            messages: vec!["code: required".into(), "nom: too long".into()],
        });
        assert_eq!(
            err.user_message("Failed to save"),
            "code: required\nnom: too long"
        );
    }

    #[test]
    fn empty_api_messages_use_fallback() {
        let err = CoreError::from(paydesk_api::Error::Api {
            status: 500,
            messages: vec![],
        });
        assert_eq!(err.user_message("Failed to load devices"), "Failed to load devices");
    }

    #[test]
    fn unauthorized_maps_to_auth_failure() {
        let err = CoreError::from(paydesk_api::Error::Unauthorized {
            messages: vec!["Token expired".into()],
        });
        assert!(matches!(err, CoreError::AuthenticationFailed { .. }));
        assert_eq!(err.user_message("Failed"), "Token expired");
    }

    #[test]
    fn forbidden_keeps_every_message() {
        let err = CoreError::from(paydesk_api::Error::Api {
            status: 403,
            messages: vec!["a: x".into(), "b: y".into()],
        });
        assert!(matches!(err, CoreError::AuthenticationFailed { .. }));
        assert_eq!(err.user_message("Failed to load devices"), "a: x\nb: y");

        let bare = CoreError::from(paydesk_api::Error::Unauthorized { messages: vec![] });
        assert_eq!(bare.user_message("Failed to load devices"), "Failed to load devices");
        assert_eq!(bare.to_string(), "Authentication failed: access denied");
    }

    #[test]
    fn not_found_body_wins_over_status() {
        let err = CoreError::from(paydesk_api::Error::Api {
            status: 404,
            messages: vec!["Network error".into()],
        });
        assert!(matches!(err, CoreError::NotFound { .. }));
        assert_eq!(err.user_message("Failed to load devices"), "Network error");
    }

    #[test]
    fn not_found_and_timeout_mention_fallback() {
        let err = CoreError::from(paydesk_api::Error::Api {
            status: 404,
            messages: vec![],
        });
        assert!(matches!(err, CoreError::NotFound { .. }));
        assert!(
            err.user_message("Failed to load country")
                .starts_with("Failed to load country: ")
        );

        let err = CoreError::from(paydesk_api::Error::Timeout { timeout_secs: 5 });
        assert_eq!(
            err.user_message("Failed to load devices"),
            "Failed to load devices: Request timed out after 5s"
        );
    }

    #[test]
    fn bad_json_is_invalid_response() {
        let err = CoreError::from(paydesk_api::Error::Deserialization {
            message: "expected value".into(),
            body: "<html>".into(),
        });
        assert!(matches!(err, CoreError::InvalidResponse { .. }));
        assert_eq!(
            err.user_message("Failed to load networks"),
            "Failed to load networks"
        );
    }
}
