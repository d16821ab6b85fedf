//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors with
//! actionable help text and a process exit code.

use miette::Diagnostic;
use thiserror::Error;

use paydesk_config::ConfigError;
use paydesk_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the backend at {url}")]
    #[diagnostic(
        code(paydesk::connection_failed),
        help(
            "Check that the backend is running and reachable.\n\
             Reason: {reason}\n\
             Self-signed certificate? Try --insecure (-k) or set ca_cert in your profile."
        )
    )]
    ConnectionFailed { url: String, reason: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(paydesk::auth_failed),
        help(
            "Verify your access token.\n\
             Store a new one with: paydesk config set-token\n\
             Or pass --token / set PAYDESK_TOKEN."
        )
    )]
    AuthFailed { message: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(paydesk::not_found),
        help("Run: paydesk {list_command} to see what exists")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    // ── API ──────────────────────────────────────────────────────────
    #[error("{message}")]
    #[diagnostic(code(paydesk::api_error))]
    ApiError { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(paydesk::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(paydesk::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: paydesk config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No backend configured")]
    #[diagnostic(
        code(paydesk::no_config),
        help(
            "Create a profile with: paydesk config init\n\
             Or pass --api-url. Expected config at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error("Configuration error: {message}")]
    #[diagnostic(code(paydesk::config))]
    Config { message: String },

    // ── Timeout ──────────────────────────────────────────────────────
    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(paydesk::timeout),
        help("Increase timeout with --timeout or check backend responsiveness.")
    )]
    Timeout { seconds: u64 },

    // ── IO / Serialization ────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::NoConfig { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    /// API failure rendered with a form's fallback text, so an empty or
    /// unreadable error body still says what failed.
    pub fn with_fallback(err: CoreError, fallback: &str) -> Self {
        match err {
            CoreError::Api { .. } | CoreError::InvalidResponse { .. } => Self::ApiError {
                message: err.user_message(fallback),
            },
            other => other.into(),
        }
    }
}

/// Subcommand that lists `resource` (as named by `ResourceKind::label`).
fn list_command(resource: &str) -> String {
    match resource {
        "phone numbers" => "numbers list".into(),
        "devices" | "countries" | "networks" => format!("{resource} list"),
        _ => "--help".into(),
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => {
                CliError::ConnectionFailed { url, reason }
            }

            CoreError::AuthenticationFailed { messages } => CliError::AuthFailed {
                message: if messages.is_empty() {
                    "the backend rejected the request".into()
                } else {
                    messages.join("\n")
                },
            },

            CoreError::Timeout { timeout_secs } => CliError::Timeout {
                seconds: timeout_secs,
            },

            CoreError::NotFound {
                resource,
                identifier,
                ..
            } => CliError::NotFound {
                list_command: list_command(&resource),
                resource_type: resource,
                identifier,
            },

            CoreError::ValidationFailed { message } => CliError::Validation {
                field: "input".into(),
                reason: message,
            },

            CoreError::Api { messages, status } => CliError::ApiError {
                message: if messages.is_empty() {
                    match status {
                        Some(code) => format!("Request failed with status {code}"),
                        None => "Request failed".into(),
                    }
                } else {
                    messages.join("\n")
                },
            },

            CoreError::InvalidResponse { message } => CliError::ApiError {
                message: format!("Unexpected response: {message}"),
            },

            CoreError::ViewClosed => CliError::ApiError {
                message: "View closed".into(),
            },

            CoreError::Config { message } => CliError::Config { message },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::UnknownProfile { name } => CliError::ProfileNotFound {
                name,
                available: "(see: paydesk config profiles)".into(),
            },
            ConfigError::Io(e) => CliError::Io(e),
            other => CliError::Config {
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_error_class() {
        let not_found = CliError::from(CoreError::NotFound {
            resource: "phone numbers".into(),
            identifier: "7".into(),
            messages: vec![],
        });
        assert_eq!(not_found.exit_code(), exit_code::NOT_FOUND);
        assert!(matches!(
            not_found,
            CliError::NotFound { ref list_command, .. } if list_command == "numbers list"
        ));

        let auth = CliError::from(CoreError::AuthenticationFailed {
            messages: vec!["Token expired".into(), "Log in again".into()],
        });
        assert_eq!(auth.exit_code(), exit_code::AUTH);
        assert_eq!(
            auth.to_string(),
            "Authentication failed: Token expired\nLog in again"
        );

        let timeout = CliError::from(CoreError::Timeout { timeout_secs: 5 });
        assert_eq!(timeout.exit_code(), exit_code::TIMEOUT);

        let invalid = CliError::from(CoreError::ValidationFailed {
            message: "nom is required".into(),
        });
        assert_eq!(invalid.exit_code(), exit_code::USAGE);
    }

    #[test]
    fn api_messages_become_the_error_text() {
        let err = CliError::from(CoreError::Api {
            messages: vec!["code: country with this code already exists.".into()],
            status: Some(400),
        });
        assert_eq!(err.to_string(), "code: country with this code already exists.");
        assert_eq!(err.exit_code(), exit_code::GENERAL);
    }

    #[test]
    fn fallback_covers_empty_bodies() {
        let err = CliError::with_fallback(
            CoreError::Api {
                messages: vec![],
                status: Some(500),
            },
            "Failed to create country",
        );
        assert_eq!(err.to_string(), "Failed to create country");

        let passthrough = CliError::with_fallback(
            CoreError::Timeout { timeout_secs: 3 },
            "Failed to create country",
        );
        assert_eq!(passthrough.exit_code(), exit_code::TIMEOUT);
    }
}
