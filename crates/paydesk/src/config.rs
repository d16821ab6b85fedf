//! CLI configuration: thin wrapper around `paydesk_config` shared types.
//!
//! Re-exports the shared types and adds CLI-specific resolution that
//! respects `GlobalOpts` flag overrides (--api-url, --token, etc.).

use secrecy::SecretString;

use paydesk_core::{ClientConfig, TlsVerification};

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use paydesk_config::{
    Config, Defaults, Profile, clear_token, config_path, load_config_or_default, resolve_token,
    save_config, store_token,
};

// ── CLI-specific helpers ────────────────────────────────────────────

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    config.active_profile_name(global.profile.as_deref())
}

/// Translate a `Profile` + global flags into a `ClientConfig`.
///
/// CLI flag overrides take priority over profile values, which take
/// priority over `[defaults]`.
pub fn resolve_profile(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
    global: &GlobalOpts,
) -> Result<ClientConfig, CliError> {
    let mut effective = profile.clone();
    if let Some(ref url) = global.api_url {
        effective.api_url.clone_from(url);
    }
    if global.insecure {
        effective.insecure = Some(true);
    } else if effective.insecure.is_none() {
        effective.insecure = Some(defaults.insecure);
    }
    effective.timeout = global.timeout.or(effective.timeout).or(Some(defaults.timeout));

    let mut config = paydesk_config::profile_to_client_config(&effective, profile_name)?;
    if let Some(ref token) = global.token {
        config.token = Some(SecretString::from(token.clone()));
    }
    Ok(config)
}

/// Build a `ClientConfig` from the config file, profile, and CLI overrides.
///
/// Without a matching profile, `--api-url` alone is enough; the token then
/// comes only from `--token`.
pub fn build_client_config(global: &GlobalOpts) -> Result<ClientConfig, CliError> {
    let cfg = load_config_or_default();
    let profile_name = active_profile_name(global, &cfg);

    if let Some(profile) = cfg.profiles.get(&profile_name) {
        return resolve_profile(profile, &profile_name, &cfg.defaults, global);
    }

    if global.profile.is_some() {
        let names = cfg.profile_names();
        return Err(CliError::ProfileNotFound {
            name: profile_name,
            available: if names.is_empty() {
                "(none)".into()
            } else {
                names.join(", ")
            },
        });
    }

    let url_str = global.api_url.as_deref().ok_or_else(|| CliError::NoConfig {
        path: config_path().display().to_string(),
    })?;
    let url: url::Url = url_str.parse().map_err(|_| CliError::Validation {
        field: "api-url".into(),
        reason: format!("invalid URL: {url_str}"),
    })?;

    let mut config = ClientConfig::new(url);
    config.token = global.token.clone().map(SecretString::from);
    config.tls = if global.insecure {
        TlsVerification::DangerAcceptInvalid
    } else {
        TlsVerification::SystemDefaults
    };
    config.timeout = std::time::Duration::from_secs(global.timeout.unwrap_or(cfg.defaults.timeout));
    Ok(config)
}
