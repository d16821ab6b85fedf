// ── Dashboard facade ──
//
// Owns the REST client and the (lazily connected) realtime channel for
// one backend. List views are opened as `ListSession`s; one-shot reads
// and form submissions go straight to the API.

use std::sync::Arc;
use std::time::Duration;

use paydesk_api::realtime::{self, Latest};
use paydesk_api::{
    AccessToken, ApiClient, ConnectionState, RealtimeHandle, ReconnectConfig, TlsMode,
    TransportConfig,
};
use tokio::sync::{Mutex, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{ClientConfig, TlsVerification};
use crate::error::CoreError;
use crate::forms::{CountryForm, NetworkForm, TransactionEditor};
use crate::model::entity::scalar_text;
use crate::model::{Entity, LogEntry, ResourceKind};
use crate::session::{ListSession, SessionOptions, fetch_list, phone_number_query};
use crate::store::{Collection, ListQuery, normalize_list, project};

/// Entry point for everything the console does against one backend.
///
/// Cheaply cloneable via `Arc<DashboardInner>`.
#[derive(Clone)]
pub struct Dashboard {
    inner: Arc<DashboardInner>,
}

struct DashboardInner {
    config: ClientConfig,
    api: Arc<ApiClient>,
    token: Option<AccessToken>,
    cancel: CancellationToken,
    realtime: Mutex<Option<RealtimeHandle>>,
}

impl Dashboard {
    /// Build the REST client. No network traffic happens here.
    pub fn new(config: ClientConfig) -> Result<Self, CoreError> {
        let token = config.token.clone().map(AccessToken::new);
        let transport = build_transport(&config);
        let api = ApiClient::new(config.url.as_str(), token.as_ref(), &transport)?;
        debug!(base = %api.base_url(), authenticated = token.is_some(), "dashboard ready");

        Ok(Self {
            inner: Arc::new(DashboardInner {
                config,
                api: Arc::new(api),
                token,
                cancel: CancellationToken::new(),
                realtime: Mutex::new(None),
            }),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn api(&self) -> &Arc<ApiClient> {
        &self.inner.api
    }

    // ── Realtime ─────────────────────────────────────────────────────

    /// Latest-message reader for the realtime channel, connecting on first
    /// use. `None` when realtime is disabled for this backend.
    pub async fn realtime(&self) -> Result<Option<Latest>, CoreError> {
        if !self.inner.config.realtime_enabled {
            return Ok(None);
        }

        let mut guard = self.inner.realtime.lock().await;
        if let Some(handle) = guard.as_ref() {
            return Ok(Some(handle.subscribe()));
        }

        let url = match &self.inner.config.realtime_url {
            Some(url) => url.clone(),
            None => realtime::derive_url(&self.inner.config.url)?,
        };
        if matches!(self.inner.config.tls, TlsVerification::DangerAcceptInvalid) {
            warn!("certificate checks are not relaxed for the realtime channel");
        }

        let handle = RealtimeHandle::connect(
            url.clone(),
            self.inner.token.as_ref(),
            ReconnectConfig::default(),
            self.inner.cancel.child_token(),
        )
        .await?;
        info!(url = %url, "realtime channel spawned");

        let latest = handle.subscribe();
        *guard = Some(handle);
        Ok(Some(latest))
    }

    /// Connection state of the realtime channel, once connected.
    pub async fn connection_state(&self) -> Option<watch::Receiver<ConnectionState>> {
        self.inner.realtime.lock().await.as_ref().map(RealtimeHandle::state)
    }

    // ── Lists ────────────────────────────────────────────────────────

    /// Open a live list. Resources with a realtime feed get patched as
    /// messages arrive; the rest only change on refresh.
    pub async fn open_list(
        &self,
        resource: ResourceKind,
        query: &ListQuery,
        refresh_every: Option<Duration>,
    ) -> Result<ListSession, CoreError> {
        let latest = if resource.spec().realtime {
            self.realtime().await?
        } else {
            None
        };

        let options = SessionOptions {
            phone_query: phone_number_query(query, self.inner.config.page_size),
            refresh_every,
        };
        Ok(ListSession::open(
            Arc::clone(&self.inner.api),
            resource,
            latest,
            options,
            self.inner.cancel.child_token(),
        ))
    }

    /// Fetch once and return the visible rows under `query`.
    pub async fn list(
        &self,
        resource: ResourceKind,
        query: &ListQuery,
    ) -> Result<Vec<Arc<Entity>>, CoreError> {
        let collection = self.fetch_collection(resource, query).await?;
        Ok(project(&collection, resource.spec(), query))
    }

    async fn fetch_collection(
        &self,
        resource: ResourceKind,
        query: &ListQuery,
    ) -> Result<Collection, CoreError> {
        let phone_query = phone_number_query(query, self.inner.config.page_size);
        let payload = fetch_list(&self.inner.api, resource, &phone_query).await?;
        Ok(Collection::new(normalize_list(payload)))
    }

    /// One record by identity. Countries and networks have a detail
    /// endpoint; devices and phone numbers are looked up in the list.
    pub async fn get(&self, resource: ResourceKind, id: &str) -> Result<Entity, CoreError> {
        let not_found = || CoreError::NotFound {
            resource: resource.label().to_owned(),
            identifier: id.to_owned(),
            messages: Vec::new(),
        };

        let result = match resource {
            ResourceKind::Countries => self.inner.api.get_country(id).await,
            ResourceKind::Networks => self.inner.api.get_network(id).await,
            ResourceKind::Devices | ResourceKind::PhoneNumbers => {
                let collection = self.fetch_collection(resource, &ListQuery::default()).await?;
                let fallbacks = resource.spec().identity_fallbacks;
                return collection
                    .iter()
                    .find(|e| {
                        e.identity(fallbacks)
                            .and_then(scalar_text)
                            .is_some_and(|key| key == id)
                    })
                    .cloned()
                    .ok_or_else(not_found);
            }
        };

        match result {
            Ok(payload) => entity(payload),
            Err(e) if e.is_not_found() => Err(not_found()),
            Err(e) => Err(e.into()),
        }
    }

    // ── Forms ────────────────────────────────────────────────────────

    pub async fn create_country(&self, form: &CountryForm) -> Result<Entity, CoreError> {
        form.validate()?;
        let created = self.inner.api.create_country(&form.to_body()).await?;
        info!(nom = %form.nom, "country created");
        entity_or_echo(created, form.to_body())
    }

    pub async fn update_country(&self, id: &str, form: &CountryForm) -> Result<Entity, CoreError> {
        form.validate()?;
        let updated = self.inner.api.update_country(id, &form.to_body()).await?;
        info!(id, "country updated");
        entity_or_echo(updated, form.to_body())
    }

    pub async fn create_network(&self, form: &NetworkForm) -> Result<Entity, CoreError> {
        form.validate()?;
        let created = self.inner.api.create_network(&form.to_body()).await?;
        info!(nom = %form.nom, "network created");
        entity_or_echo(created, form.to_body())
    }

    pub async fn update_network(&self, id: &str, form: &NetworkForm) -> Result<Entity, CoreError> {
        form.validate()?;
        let updated = self.inner.api.update_network(id, &form.to_body()).await?;
        info!(id, "network updated");
        entity_or_echo(updated, form.to_body())
    }

    // ── Transactions ─────────────────────────────────────────────────

    /// Open the editor: the transaction and its logs load concurrently
    /// and fail independently.
    pub async fn open_transaction(&self, uid: &str) -> TransactionEditor {
        let mut editor = TransactionEditor::new(uid);
        let (transaction, logs) = tokio::join!(
            self.inner.api.get_transaction(uid),
            self.inner.api.list_transaction_logs(uid),
        );
        editor.apply_loaded(transaction.map_err(CoreError::from));
        editor.apply_logs(logs.map_err(CoreError::from));
        editor
    }

    /// PATCH the editor's form. Returns `true` on success; failures land
    /// in the editor's error panel.
    pub async fn save_transaction(&self, editor: &mut TransactionEditor) -> bool {
        let body = editor.form.to_body();
        let result = self
            .inner
            .api
            .update_transaction(editor.uid(), &body)
            .await
            .map_err(CoreError::from);
        let saved = editor.apply_saved(result);
        if saved {
            info!(uid = editor.uid(), "transaction updated");
        }
        saved
    }

    /// Retry just the log panel.
    pub async fn reload_logs(&self, editor: &mut TransactionEditor) {
        let result = self.inner.api.list_transaction_logs(editor.uid()).await;
        editor.apply_logs(result.map_err(CoreError::from));
    }

    pub async fn transaction_logs(&self, uid: &str) -> Result<Vec<LogEntry>, CoreError> {
        let payload = self.inner.api.list_transaction_logs(uid).await?;
        Ok(normalize_list(payload).iter().map(LogEntry::from_entity).collect())
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Stop the realtime channel and every session opened from here.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        if let Some(handle) = self.inner.realtime.lock().await.take() {
            handle.shutdown();
        }
        debug!("dashboard shut down");
    }
}

// ── Helpers ──────────────────────────────────────────────────────────

fn entity(payload: serde_json::Value) -> Result<Entity, CoreError> {
    Entity::from_value(payload).ok_or_else(|| CoreError::InvalidResponse {
        message: "expected a JSON object".into(),
    })
}

/// Write endpoints may answer 204; fall back to what was sent.
fn entity_or_echo(
    payload: serde_json::Value,
    sent: serde_json::Value,
) -> Result<Entity, CoreError> {
    if payload.is_null() {
        entity(sent)
    } else {
        entity(payload)
    }
}

fn build_transport(config: &ClientConfig) -> TransportConfig {
    TransportConfig {
        tls: tls_to_transport(&config.tls),
        timeout: config.timeout,
    }
}

fn tls_to_transport(tls: &TlsVerification) -> TlsMode {
    match tls {
        TlsVerification::SystemDefaults => TlsMode::System,
        TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
        TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
    }
}
