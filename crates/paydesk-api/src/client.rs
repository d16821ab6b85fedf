// Async HTTP client for the payments REST API.
//
// Base path: /api/payments/
// Auth: `Authorization: Bearer <accessToken>` (optional)
//
// Payloads are schema-less: list endpoints return either a bare JSON array
// or a `{results: [...]}` wrapper, and single resources are plain objects.
// The client hands back `serde_json::Value` and leaves shape normalization
// to `paydesk-core`.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::auth::AccessToken;
use crate::error_body;
use crate::transport::TransportConfig;
use crate::Error;

// ── Resource paths ───────────────────────────────────────────────────

const API_PREFIX: &str = "/api/payments";

pub const COUNTRIES: &str = "countries/";
pub const NETWORKS: &str = "networks/";
pub const PHONE_NUMBERS: &str = "numeros/";
pub const DEVICE_STATS: &str = "stats/devices/";
pub const TRANSACTIONS: &str = "transactions/";
pub const TRANSACTION_LOGS: &str = "transaction-logs/";

// ── Phone number query ───────────────────────────────────────────────

/// Server-side query parameters for the phone number listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhoneNumberQuery {
    pub page: u32,
    pub page_size: u32,
    pub search: Option<String>,
    pub network: Option<String>,
    /// `field` (ascending) or `-field` (descending).
    pub ordering: Option<String>,
}

impl Default for PhoneNumberQuery {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 100,
            search: None,
            network: None,
            ordering: None,
        }
    }
}

impl PhoneNumberQuery {
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("page", self.page.to_string()),
            ("page_size", self.page_size.to_string()),
        ];
        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            params.push(("search", search.to_owned()));
        }
        if let Some(network) = self.network.as_deref().filter(|s| !s.is_empty()) {
            params.push(("network", network.to_owned()));
        }
        if let Some(ordering) = self.ordering.as_deref().filter(|s| !s.is_empty()) {
            params.push(("ordering", ordering.to_owned()));
        }
        params
    }
}

// ── Client ───────────────────────────────────────────────────────────

/// Async client for the payments REST API.
///
/// Cheap to share behind an `Arc`; the inner `reqwest::Client` pools
/// connections.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    timeout_secs: u64,
}

impl ApiClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build from a base URL, an optional bearer token, and transport config.
    ///
    /// A missing token is not an error: requests go out unauthenticated and
    /// the backend decides.
    pub fn new(
        base_url: &str,
        token: Option<&AccessToken>,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let headers = match token {
            Some(token) => token.headers()?,
            None => reqwest::header::HeaderMap::new(),
        };
        let http = transport.build_client_with_headers(headers)?;
        Ok(Self {
            http,
            base_url: Self::normalize_base_url(base_url)?,
            // Rounded up so sub-second timeouts never report "0s".
            timeout_secs: transport.timeout.as_secs()
                + u64::from(transport.timeout.subsec_nanos() > 0),
        })
    }

    /// Wrap an existing `reqwest::Client` (caller manages auth headers).
    pub fn with_client(http: reqwest::Client, base_url: &str) -> Result<Self, Error> {
        Ok(Self {
            http,
            base_url: Self::normalize_base_url(base_url)?,
            timeout_secs: 30,
        })
    }

    /// Append `/api/payments/` unless the caller already pointed at it.
    fn normalize_base_url(raw: &str) -> Result<Url, Error> {
        let mut url = Url::parse(raw)?;
        let path = url.path().trim_end_matches('/').to_owned();

        if path.ends_with(API_PREFIX) {
            url.set_path(&format!("{path}/"));
        } else {
            url.set_path(&format!("{path}{API_PREFIX}/"));
        }
        Ok(url)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    fn detail_path(collection: &str, id: &str) -> String {
        format!("{collection}{}/", id.trim_matches('/'))
    }

    // ── HTTP verbs ───────────────────────────────────────────────────

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("GET {url}");

        let resp = self.http.get(url).send().await.map_err(|e| self.send_error(e))?;
        self.handle_response(resp).await
    }

    async fn get_with_params<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("GET {url} params={params:?}");

        let resp = self
            .http
            .get(url)
            .query(params)
            .send()
            .await
            .map_err(|e| self.send_error(e))?;
        self.handle_response(resp).await
    }

    async fn post<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("POST {url}");

        let resp = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.send_error(e))?;
        self.handle_response(resp).await
    }

    async fn patch<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("PATCH {url}");

        let resp = self
            .http
            .patch(url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.send_error(e))?;
        self.handle_response(resp).await
    }

    // ── Response handling ────────────────────────────────────────────

    fn send_error(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout {
                timeout_secs: self.timeout_secs,
            }
        } else {
            Error::Transport(err)
        }
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, Error> {
        let status = resp.status();
        if status.is_success() {
            let body = resp.text().await.map_err(|e| self.send_error(e))?;
            // 204 and friends: treat an empty body as JSON null.
            let text = if body.trim().is_empty() { "null" } else { body.as_str() };
            serde_json::from_str(text).map_err(|e| {
                let preview: String = body.chars().take(200).collect();
                Error::Deserialization {
                    message: format!("{e} (body preview: {preview:?})"),
                    body,
                }
            })
        } else {
            Err(Self::parse_error(status, resp).await)
        }
    }

    async fn parse_error(status: reqwest::StatusCode, resp: reqwest::Response) -> Error {
        let raw = resp.text().await.unwrap_or_default();
        let messages = error_body::extract_messages(&raw);

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Error::Unauthorized { messages };
        }

        Error::Api {
            status: status.as_u16(),
            messages,
        }
    }

    // ━━ Public API ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    // ── Generic resource access ──────────────────────────────────────

    /// Fetch a list endpoint and return the raw payload (bare array or
    /// `{results: [...]}` wrapper).
    pub async fn list(&self, collection: &str, params: &[(&str, String)]) -> Result<Value, Error> {
        if params.is_empty() {
            self.get(collection).await
        } else {
            self.get_with_params(collection, params).await
        }
    }

    pub async fn fetch(&self, collection: &str, id: &str) -> Result<Value, Error> {
        self.get(&Self::detail_path(collection, id)).await
    }

    pub async fn create(&self, collection: &str, body: &Value) -> Result<Value, Error> {
        self.post(collection, body).await
    }

    pub async fn update(&self, collection: &str, id: &str, body: &Value) -> Result<Value, Error> {
        self.patch(&Self::detail_path(collection, id), body).await
    }

    // ── Countries ────────────────────────────────────────────────────

    pub async fn list_countries(&self) -> Result<Value, Error> {
        self.list(COUNTRIES, &[]).await
    }

    pub async fn get_country(&self, id: &str) -> Result<Value, Error> {
        self.fetch(COUNTRIES, id).await
    }

    pub async fn create_country(&self, body: &Value) -> Result<Value, Error> {
        self.create(COUNTRIES, body).await
    }

    pub async fn update_country(&self, id: &str, body: &Value) -> Result<Value, Error> {
        self.update(COUNTRIES, id, body).await
    }

    // ── Networks ─────────────────────────────────────────────────────

    pub async fn list_networks(&self) -> Result<Value, Error> {
        self.list(NETWORKS, &[]).await
    }

    pub async fn get_network(&self, id: &str) -> Result<Value, Error> {
        self.fetch(NETWORKS, id).await
    }

    pub async fn create_network(&self, body: &Value) -> Result<Value, Error> {
        self.create(NETWORKS, body).await
    }

    pub async fn update_network(&self, id: &str, body: &Value) -> Result<Value, Error> {
        self.update(NETWORKS, id, body).await
    }

    // ── Phone numbers ────────────────────────────────────────────────

    pub async fn list_phone_numbers(&self, query: &PhoneNumberQuery) -> Result<Value, Error> {
        self.list(PHONE_NUMBERS, &query.to_params()).await
    }

    // ── Devices ──────────────────────────────────────────────────────

    pub async fn list_device_stats(&self) -> Result<Value, Error> {
        self.list(DEVICE_STATS, &[]).await
    }

    // ── Transactions ─────────────────────────────────────────────────

    pub async fn get_transaction(&self, uid: &str) -> Result<Value, Error> {
        self.fetch(TRANSACTIONS, uid).await
    }

    pub async fn update_transaction(&self, uid: &str, body: &Value) -> Result<Value, Error> {
        self.update(TRANSACTIONS, uid, body).await
    }

    pub async fn list_transaction_logs(&self, uid: &str) -> Result<Value, Error> {
        self.list(TRANSACTION_LOGS, &[("transaction", uid.to_owned())])
            .await
    }
}
