use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};

use crate::Error;

/// Name under which the bearer token lives in persistent storage.
pub const ACCESS_TOKEN_KEY: &str = "accessToken";

/// Bearer token attached to every REST request and to the realtime
/// connection.
///
/// Wraps a [`SecretString`] so the raw value never shows up in `Debug`
/// output or logs.
#[derive(Clone)]
pub struct AccessToken(SecretString);

impl AccessToken {
    pub fn new(token: SecretString) -> Self {
        Self(token)
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    /// `Authorization: Bearer …` header map, with the value marked sensitive.
    pub fn headers(&self) -> Result<HeaderMap, Error> {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", self.expose()))
            .map_err(|e| Error::InvalidToken(e.to_string()))?;
        value.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, value);
        Ok(headers)
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

impl From<String> for AccessToken {
    fn from(raw: String) -> Self {
        Self(SecretString::from(raw))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn bearer_header_is_sensitive() {
        let token = AccessToken::from("abc.def".to_owned());
        let headers = token.headers().unwrap();
        let value = headers.get(AUTHORIZATION).unwrap();
        assert_eq!(value.to_str().unwrap(), "Bearer abc.def");
        assert!(value.is_sensitive());
    }

    #[test]
    fn debug_redacts_token() {
        let token = AccessToken::from("super-secret".to_owned());
        assert_eq!(format!("{token:?}"), "AccessToken(***)");
    }

    #[test]
    fn newline_in_token_is_rejected() {
        let token = AccessToken::from("bad\ntoken".to_owned());
        assert!(matches!(token.headers(), Err(Error::InvalidToken(_))));
    }
}
