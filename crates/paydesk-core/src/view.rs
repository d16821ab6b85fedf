// ── List view state machine ──
//
// One `ListView` backs one open list. It owns the collection and the
// loading/error flags, and is the only thing allowed to change them.
// Every input (load started, load finished, realtime message) is a
// method call; after `unmount()` every input is refused.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, trace, warn};

use crate::error::CoreError;
use crate::model::{Entity, RealtimeEvent, ResourceKind};
use crate::store::{Collection, ListQuery, normalize_list, project};

/// Which fetch a load result belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadKind {
    /// First fetch after mount. Failure leaves the collection empty unless
    /// another fetch has already loaded it.
    Initial,
    /// Any later fetch. Failure keeps the previous collection.
    Refresh,
}

/// What happened to an inbound realtime message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOutcome {
    /// Recognized event for this resource; `matched` entities patched.
    Applied { matched: usize },
    /// Valid message that does not concern this view.
    Ignored,
    /// Could not be parsed; dropped.
    Malformed,
    /// View already unmounted.
    Closed,
}

/// Immutable picture of a view, published to observers.
#[derive(Debug, Clone)]
pub struct ViewSnapshot {
    pub resource: ResourceKind,
    pub collection: Arc<Collection>,
    pub loading: bool,
    pub error: Option<String>,
    /// Bumped on every state change.
    pub revision: u64,
}

impl ViewSnapshot {
    pub fn project(&self, query: &ListQuery) -> Vec<Arc<Entity>> {
        project(&self.collection, self.resource.spec(), query)
    }
}

#[derive(Debug)]
pub struct ListView {
    resource: ResourceKind,
    collection: Arc<Collection>,
    in_flight: usize,
    /// Set once any fetch has succeeded.
    loaded: bool,
    error: Option<String>,
    mounted: bool,
    revision: u64,
}

impl ListView {
    /// Open a view with an empty collection.
    pub fn mount(resource: ResourceKind) -> Self {
        debug!(resource = %resource, "list view mounted");
        Self {
            resource,
            collection: Arc::new(Collection::default()),
            in_flight: 0,
            loaded: false,
            error: None,
            mounted: true,
            revision: 0,
        }
    }

    pub fn resource(&self) -> ResourceKind {
        self.resource
    }

    pub fn collection(&self) -> &Arc<Collection> {
        &self.collection
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight > 0
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    // ── Loading ──────────────────────────────────────────────────────

    /// A fetch is about to start. Clears the error panel.
    pub fn begin_load(&mut self) -> bool {
        if !self.mounted {
            return false;
        }
        self.in_flight += 1;
        self.error = None;
        self.touch();
        true
    }

    /// Apply a fetch result. Results resolve in any order; the last one
    /// applied wins. Returns `false` if the view is gone.
    pub fn finish_load(&mut self, kind: LoadKind, result: Result<Value, CoreError>) -> bool {
        if !self.mounted {
            debug!(resource = %self.resource, "dropping load result for unmounted view");
            return false;
        }
        self.in_flight = self.in_flight.saturating_sub(1);

        match result {
            Ok(payload) => {
                let entities = normalize_list(payload);
                info!(
                    resource = %self.resource,
                    count = entities.len(),
                    "{} loaded",
                    self.resource.label()
                );
                self.collection = Arc::new(Collection::new(entities));
                self.loaded = true;
                self.error = None;
            }
            Err(err) => {
                let message = err.user_message(self.resource.spec().load_failure);
                warn!(resource = %self.resource, error = %err, ?kind, "load failed");
                if kind == LoadKind::Initial && !self.loaded {
                    self.collection = Arc::new(Collection::default());
                }
                self.error = Some(message);
            }
        }
        self.touch();
        true
    }

    // ── Realtime ─────────────────────────────────────────────────────

    /// Handle one raw realtime message. Malformed payloads are logged and
    /// dropped; they never reach the error panel.
    pub fn apply_message(&mut self, text: &str) -> MessageOutcome {
        if !self.mounted {
            return MessageOutcome::Closed;
        }
        match RealtimeEvent::parse(text) {
            Ok(event) => self.apply_event(&event),
            Err(e) => {
                warn!(
                    resource = %self.resource,
                    error = %e,
                    "dropping malformed realtime message"
                );
                MessageOutcome::Malformed
            }
        }
    }

    pub fn apply_event(&mut self, event: &RealtimeEvent) -> MessageOutcome {
        if !self.mounted {
            return MessageOutcome::Closed;
        }
        let Some(patch) = event.patch_for(self.resource) else {
            trace!(resource = %self.resource, kind = event.kind(), "ignoring realtime event");
            return MessageOutcome::Ignored;
        };

        let fallbacks = self.resource.spec().identity_fallbacks;
        let (next, matched) = self.collection.patched(&patch, fallbacks);
        debug!(
            resource = %self.resource,
            identity = %patch.identity(),
            matched,
            "applied realtime patch"
        );
        self.collection = Arc::new(next);
        self.touch();
        MessageOutcome::Applied { matched }
    }

    // ── Derived state ────────────────────────────────────────────────

    pub fn project(&self, query: &ListQuery) -> Vec<Arc<Entity>> {
        project(&self.collection, self.resource.spec(), query)
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        ViewSnapshot {
            resource: self.resource,
            collection: Arc::clone(&self.collection),
            loading: self.is_loading(),
            error: self.error.clone(),
            revision: self.revision,
        }
    }

    /// Close the view. Later inputs are refused.
    pub fn unmount(&mut self) {
        if self.mounted {
            debug!(resource = %self.resource, "list view unmounted");
        }
        self.mounted = false;
        self.in_flight = 0;
    }

    fn touch(&mut self) {
        self.revision += 1;
    }
}
