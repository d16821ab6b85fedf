//! Realtime channel with auto-reconnect.
//!
//! Connects to the backend WebSocket and publishes every inbound text
//! frame into a single-slot mailbox (a [`tokio::sync::watch`] channel).
//! Consumers only ever see the most recent message: if two frames arrive
//! before a consumer wakes up, the first one is overwritten. Parsing is the
//! consumer's job; this layer only transports text.
//!
//! # Example
//!
//! ```rust,ignore
//! use paydesk_api::realtime::{RealtimeHandle, ReconnectConfig};
//! use tokio_util::sync::CancellationToken;
//! use url::Url;
//!
//! let cancel = CancellationToken::new();
//! let url = Url::parse("wss://pay.example.com/ws/devices/")?;
//!
//! let handle =
//!     RealtimeHandle::connect(url, None, ReconnectConfig::default(), cancel.clone()).await?;
//! let mut rx = handle.subscribe();
//!
//! while rx.changed().await.is_ok() {
//!     if let Some(msg) = rx.borrow_and_update().clone() {
//!         println!("#{} {}", msg.seq, msg.text);
//!     }
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use tokio::sync::watch;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::{self, ClientRequestBuilder};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::auth::AccessToken;
use crate::error::Error;

/// Path of the device status feed relative to the API host.
pub const DEFAULT_REALTIME_PATH: &str = "/ws/devices/";

// ── InboundMessage ───────────────────────────────────────────────────

/// One raw text frame as received from the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Monotonic per-mailbox sequence number, starting at 1.
    pub seq: u64,
    pub text: String,
    pub received_at: DateTime<Utc>,
}

// ── Mailbox ──────────────────────────────────────────────────────────

pub type Latest = watch::Receiver<Option<Arc<InboundMessage>>>;

/// Write side of the single-slot mailbox.
///
/// The socket loop owns one; tests and local tools can create their own
/// with [`mailbox`] to feed messages without a server.
#[derive(Debug, Clone)]
pub struct Mailbox {
    tx: watch::Sender<Option<Arc<InboundMessage>>>,
}

/// Create an empty mailbox and its first reader.
pub fn mailbox() -> (Mailbox, Latest) {
    let (tx, rx) = watch::channel(None);
    (Mailbox { tx }, rx)
}

impl Mailbox {
    /// Overwrite the slot with `text`. Never blocks, never fails.
    pub fn publish(&self, text: impl Into<String>) -> u64 {
        let text = text.into();
        let mut seq = 0;
        self.tx.send_modify(|slot| {
            seq = slot.as_ref().map_or(1, |prev| prev.seq + 1);
            *slot = Some(Arc::new(InboundMessage {
                seq,
                text,
                received_at: Utc::now(),
            }));
        });
        seq
    }

    pub fn subscribe(&self) -> Latest {
        self.tx.subscribe()
    }
}

// ── ConnectionState ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting { attempt: u32 },
    Failed,
}

// ── ReconnectConfig ──────────────────────────────────────────────────

/// Exponential backoff configuration for channel reconnection.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt. Default: 1s.
    pub initial_delay: Duration,

    /// Upper bound on backoff delay. Default: 30s.
    pub max_delay: Duration,

    /// Maximum reconnection attempts before giving up.
    /// `None` means retry forever.
    pub max_retries: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_retries: None,
        }
    }
}

// ── RealtimeHandle ───────────────────────────────────────────────────

/// Handle to a running realtime channel.
///
/// Call [`shutdown`](Self::shutdown) (or cancel the token passed to
/// [`connect`](Self::connect)) to tear down the background task.
pub struct RealtimeHandle {
    mailbox: Mailbox,
    state_rx: watch::Receiver<ConnectionState>,
    cancel: CancellationToken,
}

impl RealtimeHandle {
    /// Spawn the reconnection loop against `url`.
    ///
    /// Returns immediately once the background task is spawned. The token,
    /// when present, travels as the `token` query parameter of the upgrade
    /// request.
    pub async fn connect(
        url: Url,
        token: Option<&AccessToken>,
        reconnect: ReconnectConfig,
        cancel: CancellationToken,
    ) -> Result<Self, Error> {
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(Error::WebSocketConnect(format!(
                "unsupported scheme '{}', expected ws or wss",
                url.scheme()
            )));
        }

        let target = authenticated_url(&url, token);
        let (mailbox, _) = mailbox();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);

        let task_mailbox = mailbox.clone();
        let task_cancel = cancel.clone();
        tokio::spawn(async move {
            realtime_loop(url, target, task_mailbox, state_tx, reconnect, task_cancel).await;
        });

        Ok(Self {
            mailbox,
            state_rx,
            cancel,
        })
    }

    /// Reader for the latest-message mailbox.
    pub fn subscribe(&self) -> Latest {
        self.mailbox.subscribe()
    }

    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    /// Signal the background task to shut down gracefully.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

/// Derive the realtime URL from the REST base: same host, `ws`/`wss`
/// scheme, [`DEFAULT_REALTIME_PATH`].
pub fn derive_url(api_base: &Url) -> Result<Url, Error> {
    let scheme = match api_base.scheme() {
        "https" | "wss" => "wss",
        "http" | "ws" => "ws",
        other => {
            return Err(Error::WebSocketConnect(format!(
                "cannot derive realtime URL from scheme '{other}'"
            )));
        }
    };

    let mut url = api_base.clone();
    url.set_path(DEFAULT_REALTIME_PATH);
    url.set_query(None);
    url.set_scheme(scheme)
        .map_err(|()| Error::WebSocketConnect(format!("cannot switch {api_base} to {scheme}")))?;
    Ok(url)
}

fn authenticated_url(url: &Url, token: Option<&AccessToken>) -> Url {
    let mut target = url.clone();
    if let Some(token) = token {
        target.query_pairs_mut().append_pair("token", token.expose());
    }
    target
}

// ── Background reconnection loop ─────────────────────────────────────

/// Main loop: connect → read → on error, backoff → reconnect.
///
/// `display_url` is logged; `target` may carry the token and never is.
async fn realtime_loop(
    display_url: Url,
    target: Url,
    mailbox: Mailbox,
    state_tx: watch::Sender<ConnectionState>,
    reconnect: ReconnectConfig,
    cancel: CancellationToken,
) {
    let mut attempt: u32 = 0;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            result = connect_and_read(&display_url, &target, &mailbox, &state_tx, &cancel) => {
                match result {
                    // Clean disconnect: reset the counter and reconnect immediately.
                    Ok(()) => {
                        if cancel.is_cancelled() {
                            break;
                        }
                        tracing::info!("realtime channel closed cleanly, reconnecting");
                        attempt = 0;
                        state_tx.send_replace(ConnectionState::Reconnecting { attempt });
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, attempt, "realtime channel error");

                        if let Some(max) = reconnect.max_retries {
                            if attempt >= max {
                                tracing::error!(
                                    max_retries = max,
                                    "realtime reconnection limit reached, giving up"
                                );
                                state_tx.send_replace(ConnectionState::Failed);
                                return;
                            }
                        }

                        let delay = calculate_backoff(attempt, &reconnect);
                        tracing::info!(
                            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                            attempt,
                            "waiting before reconnect"
                        );
                        attempt += 1;
                        state_tx.send_replace(ConnectionState::Reconnecting { attempt });

                        tokio::select! {
                            biased;
                            () = cancel.cancelled() => break,
                            () = tokio::time::sleep(delay) => {}
                        }
                    }
                }
            }
        }
    }

    state_tx.send_replace(ConnectionState::Disconnected);
    tracing::debug!("realtime loop exiting");
}

// ── Single connection lifecycle ──────────────────────────────────────

async fn connect_and_read(
    display_url: &Url,
    target: &Url,
    mailbox: &Mailbox,
    state_tx: &watch::Sender<ConnectionState>,
    cancel: &CancellationToken,
) -> Result<(), Error> {
    tracing::info!(url = %display_url, "connecting to realtime channel");

    let uri: tungstenite::http::Uri = target
        .as_str()
        .parse()
        .map_err(|e: tungstenite::http::uri::InvalidUri| Error::WebSocketConnect(e.to_string()))?;

    let (ws_stream, _response) = tokio_tungstenite::connect_async(ClientRequestBuilder::new(uri))
        .await
        .map_err(|e| Error::WebSocketConnect(e.to_string()))?;

    tracing::info!("realtime channel connected");
    state_tx.send_replace(ConnectionState::Connected);

    let (_write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => return Ok(()),
            frame = read.next() => {
                match frame {
                    Some(Ok(tungstenite::Message::Text(text))) => {
                        let seq = mailbox.publish(text.as_str());
                        tracing::trace!(seq, "realtime message");
                    }
                    Some(Ok(tungstenite::Message::Close(frame))) => return close_outcome(frame),
                    Some(Err(e)) => return Err(Error::WebSocketConnect(e.to_string())),
                    None => {
                        tracing::info!("realtime stream ended");
                        return Ok(());
                    }
                    // Ping is answered by tungstenite; binary frames carry nothing for us.
                    Some(Ok(_)) => {}
                }
            }
        }
    }
}

/// A normal or going-away close reconnects right away; any other close
/// code counts as a failure and goes through backoff.
fn close_outcome(frame: Option<CloseFrame>) -> Result<(), Error> {
    let Some(frame) = frame else {
        tracing::info!("realtime close frame received (no payload)");
        return Ok(());
    };
    tracing::info!(code = %frame.code, reason = %frame.reason, "realtime close frame received");
    match frame.code {
        CloseCode::Normal | CloseCode::Away => Ok(()),
        code => Err(Error::WebSocketClosed {
            code: code.into(),
            reason: frame.reason.to_string(),
        }),
    }
}

// ── Backoff calculation ──────────────────────────────────────────────

/// Exponential backoff with jitter.
///
/// `delay = min(initial * 2^attempt, max) * (1 ± 0.25)`
fn calculate_backoff(attempt: u32, config: &ReconnectConfig) -> Duration {
    let exp = i32::try_from(attempt).unwrap_or(i32::MAX);
    let base = config.initial_delay.as_secs_f64() * 2.0_f64.powi(exp);
    let capped = base.min(config.max_delay.as_secs_f64());

    // Deterministic jitter seeded from the attempt number.
    let jitter_factor = 1.0 + 0.25 * (f64::from(attempt) * 7.3).sin();
    let with_jitter = (capped * jitter_factor).max(0.0);

    Duration::from_secs_f64(with_jitter)
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_reconnect_config() {
        let config = ReconnectConfig::default();
        assert_eq!(config.initial_delay, Duration::from_secs(1));
        assert_eq!(config.max_delay, Duration::from_secs(30));
        assert!(config.max_retries.is_none());
    }

    #[test]
    fn backoff_increases_exponentially() {
        let config = ReconnectConfig::default();

        let d0 = calculate_backoff(0, &config);
        let d1 = calculate_backoff(1, &config);
        let d2 = calculate_backoff(2, &config);

        assert!(d1 > d0, "d1 ({d1:?}) should be greater than d0 ({d0:?})");
        assert!(d2 > d1, "d2 ({d2:?}) should be greater than d1 ({d1:?})");
    }

    #[test]
    fn backoff_caps_at_max_delay() {
        let config = ReconnectConfig {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            max_retries: None,
        };

        let d10 = calculate_backoff(10, &config);
        assert!(
            d10 <= Duration::from_secs(13),
            "delay at attempt 10 ({d10:?}) should be capped near max_delay"
        );
    }

    #[test]
    fn abnormal_close_is_an_error() {
        assert!(close_outcome(None).is_ok());
        assert!(
            close_outcome(Some(CloseFrame {
                code: CloseCode::Away,
                reason: tungstenite::Utf8Bytes::from_static("restart"),
            }))
            .is_ok()
        );

        let err = close_outcome(Some(CloseFrame {
            code: CloseCode::Again,
            reason: tungstenite::Utf8Bytes::from_static("overloaded"),
        }))
        .unwrap_err();
        assert!(matches!(
            err,
            Error::WebSocketClosed { code: 1013, ref reason } if reason == "overloaded"
        ));
    }

    #[test]
    fn mailbox_keeps_only_latest() {
        let (mailbox, mut rx) = mailbox();
        assert!(rx.borrow().is_none());

        mailbox.publish("first");
        mailbox.publish("second");

        assert!(rx.has_changed().unwrap());
        let latest = rx.borrow_and_update().clone().unwrap();
        assert_eq!(latest.text, "second");
        assert_eq!(latest.seq, 2);
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn mailbox_publishes_without_readers() {
        let (mailbox, rx) = mailbox();
        drop(rx);
        assert_eq!(mailbox.publish("nobody listening"), 1);

        let late = mailbox.subscribe();
        assert_eq!(late.borrow().as_ref().unwrap().text, "nobody listening");
    }

    #[test]
    fn derive_url_switches_scheme_and_path() {
        let api = Url::parse("https://pay.example.com/api/payments/").unwrap();
        assert_eq!(
            derive_url(&api).unwrap().as_str(),
            "wss://pay.example.com/ws/devices/"
        );

        let api = Url::parse("http://localhost:8000").unwrap();
        assert_eq!(
            derive_url(&api).unwrap().as_str(),
            "ws://localhost:8000/ws/devices/"
        );
    }

    #[test]
    fn token_goes_into_query() {
        let url = Url::parse("wss://pay.example.com/ws/devices/").unwrap();
        let token = AccessToken::from("t0k".to_owned());
        let target = authenticated_url(&url, Some(&token));
        assert_eq!(target.as_str(), "wss://pay.example.com/ws/devices/?token=t0k");
        assert_eq!(authenticated_url(&url, None), url);
    }

    #[tokio::test]
    async fn rejects_http_scheme() {
        let url = Url::parse("https://pay.example.com/ws/").unwrap();
        let result =
            RealtimeHandle::connect(url, None, ReconnectConfig::default(), CancellationToken::new())
                .await;
        assert!(matches!(result, Err(Error::WebSocketConnect(_))));
    }
}
