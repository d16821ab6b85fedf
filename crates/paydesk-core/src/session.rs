// ── List session driver ──
//
// One background task per open list. The task owns the `ListView`
// exclusively and multiplexes its inputs with `select!`: cancellation,
// refresh commands, fetch completions, realtime messages and an optional
// refresh ticker. Observers read `Arc<ViewSnapshot>`s from a watch channel.

use std::sync::Arc;
use std::time::Duration;

use paydesk_api::realtime::Latest;
use paydesk_api::{ApiClient, InboundMessage, PhoneNumberQuery};
use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tokio::time::Interval;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use crate::error::CoreError;
use crate::model::ResourceKind;
use crate::store::ListQuery;
use crate::view::{ListView, LoadKind, MessageOutcome, ViewSnapshot};

const COMMAND_CHANNEL_SIZE: usize = 16;

/// How a session fetches and keeps its list fresh.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Server-side parameters for the phone-number listing.
    pub phone_query: PhoneNumberQuery,
    /// Issue an ordinary refresh on this period. Off by default.
    pub refresh_every: Option<Duration>,
}

enum SessionCommand {
    Refresh,
}

/// Handle to a running list session.
///
/// Dropping the handle does not stop the task; call [`close`](Self::close)
/// or cancel the token the session was opened with. The task also ends
/// once every observer is gone.
pub struct ListSession {
    snapshot_rx: watch::Receiver<Arc<ViewSnapshot>>,
    command_tx: mpsc::Sender<SessionCommand>,
    cancel: CancellationToken,
}

impl ListSession {
    /// Mount a view for `resource` and start its initial load.
    ///
    /// `realtime` is the latest-message mailbox; pass `None` for resources
    /// without a live feed. Only messages arriving after this call are
    /// applied.
    pub fn open(
        api: Arc<ApiClient>,
        resource: ResourceKind,
        realtime: Option<Latest>,
        options: SessionOptions,
        cancel: CancellationToken,
    ) -> Self {
        let view = ListView::mount(resource);
        let (snapshot_tx, snapshot_rx) = watch::channel(Arc::new(view.snapshot()));
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);

        let driver = Driver {
            api,
            view,
            options,
            snapshot_tx,
        };
        tokio::spawn(driver.run(realtime, command_rx, cancel.clone()));

        Self {
            snapshot_rx,
            command_tx,
            cancel,
        }
    }

    /// Re-issue the list fetch. The previous collection stays visible
    /// until the new one arrives.
    pub async fn refresh(&self) -> Result<(), CoreError> {
        self.command_tx
            .send(SessionCommand::Refresh)
            .await
            .map_err(|_| CoreError::ViewClosed)
    }

    /// Latest published snapshot.
    pub fn latest(&self) -> Arc<ViewSnapshot> {
        self.snapshot_rx.borrow().clone()
    }

    /// Wait for the next state change. `None` once the session has ended.
    pub async fn changed(&mut self) -> Option<Arc<ViewSnapshot>> {
        self.snapshot_rx.changed().await.ok()?;
        Some(self.snapshot_rx.borrow_and_update().clone())
    }

    /// Wait until no fetch is in flight and return that snapshot.
    pub async fn settled(&mut self) -> Option<Arc<ViewSnapshot>> {
        loop {
            let snap = self.snapshot_rx.borrow_and_update().clone();
            if !snap.loading && snap.revision > 0 {
                return Some(snap);
            }
            self.snapshot_rx.changed().await.ok()?;
        }
    }

    /// Extra observer. It keeps the session alive after the handle is
    /// dropped.
    pub fn subscribe(&self) -> watch::Receiver<Arc<ViewSnapshot>> {
        self.snapshot_rx.clone()
    }

    /// Unmount the view. Pending fetches are aborted and their results
    /// discarded.
    pub fn close(&self) {
        self.cancel.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

// ── Driver task ──────────────────────────────────────────────────────

struct Driver {
    api: Arc<ApiClient>,
    view: ListView,
    options: SessionOptions,
    snapshot_tx: watch::Sender<Arc<ViewSnapshot>>,
}

type FetchResult = (LoadKind, Result<Value, CoreError>);

impl Driver {
    async fn run(
        mut self,
        mut realtime: Option<Latest>,
        mut commands: mpsc::Receiver<SessionCommand>,
        cancel: CancellationToken,
    ) {
        let resource = self.view.resource();
        let mut fetches: JoinSet<FetchResult> = JoinSet::new();
        let mut ticker = self.options.refresh_every.map(|period| {
            let start = tokio::time::Instant::now() + period;
            let mut interval = tokio::time::interval_at(start, period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            interval
        });
        if ticker.is_some() {
            info!(
                resource = %resource,
                every = ?self.options.refresh_every,
                "periodic refresh enabled"
            );
        }

        self.start_fetch(&mut fetches, LoadKind::Initial);

        // The handle may be dropped while `subscribe` receivers remain; the
        // session then lives until cancelled.
        let mut commands_open = true;

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                () = self.snapshot_tx.closed() => break,
                Some(joined) = fetches.join_next(), if !fetches.is_empty() => {
                    match joined {
                        Ok((kind, result)) => {
                            self.view.finish_load(kind, result);
                        }
                        Err(e) => {
                            debug!(resource = %resource, error = %e, "fetch task ended abnormally");
                            self.view.finish_load(
                                LoadKind::Refresh,
                                Err(CoreError::InvalidResponse { message: e.to_string() }),
                            );
                        }
                    }
                    self.publish();
                }
                command = commands.recv(), if commands_open => {
                    match command {
                        Some(SessionCommand::Refresh) => {
                            self.start_fetch(&mut fetches, LoadKind::Refresh);
                        }
                        None => commands_open = false,
                    }
                }
                message = next_message(&mut realtime) => {
                    match message {
                        Ok(Some(message)) => {
                            trace!(resource = %resource, seq = message.seq, "realtime message");
                            let outcome = self.view.apply_message(&message.text);
                            if let MessageOutcome::Applied { .. } = outcome {
                                self.publish();
                            }
                        }
                        Ok(None) => {}
                        Err(()) => {
                            debug!(resource = %resource, "realtime mailbox closed");
                            realtime = None;
                        }
                    }
                }
                () = next_tick(&mut ticker) => self.start_fetch(&mut fetches, LoadKind::Refresh),
            }
        }

        self.view.unmount();
        fetches.abort_all();
        debug!(resource = %resource, "list session ended");
    }

    fn start_fetch(&mut self, fetches: &mut JoinSet<FetchResult>, kind: LoadKind) {
        if !self.view.begin_load() {
            return;
        }
        self.publish();

        let api = Arc::clone(&self.api);
        let resource = self.view.resource();
        let phone_query = self.options.phone_query.clone();
        debug!(resource = %resource, ?kind, "fetching list");
        fetches.spawn(async move { (kind, fetch_list(&api, resource, &phone_query).await) });
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(Arc::new(self.view.snapshot()));
    }
}

/// Wait for the next realtime message. Pends forever without a mailbox;
/// `Err` once the sender is gone.
async fn next_message(latest: &mut Option<Latest>) -> Result<Option<Arc<InboundMessage>>, ()> {
    match latest {
        Some(rx) => {
            rx.changed().await.map_err(|_| ())?;
            Ok(rx.borrow_and_update().clone())
        }
        None => std::future::pending().await,
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

// ── Fetching ─────────────────────────────────────────────────────────

/// Fetch the raw list payload for `resource`.
pub async fn fetch_list(
    api: &ApiClient,
    resource: ResourceKind,
    phone_query: &PhoneNumberQuery,
) -> Result<Value, CoreError> {
    let payload = match resource {
        ResourceKind::PhoneNumbers => api.list_phone_numbers(phone_query).await?,
        other => api.list(other.spec().endpoint, &[]).await?,
    };
    Ok(payload)
}

/// Server-side phone-number parameters mirroring a list query.
pub fn phone_number_query(query: &ListQuery, page_size: u32) -> PhoneNumberQuery {
    let search = query.search.trim();
    PhoneNumberQuery {
        page: 1,
        page_size,
        search: (!search.is_empty()).then(|| search.to_owned()),
        network: query.dimension.clone(),
        ordering: query.sort.as_ref().map(crate::store::SortSpec::ordering_param),
    }
}
