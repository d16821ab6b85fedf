//! Reactive data layer between `paydesk-api` and the `paydesk` CLI.
//!
//! This crate owns the console's business logic:
//!
//! - **[`Dashboard`]**: Facade over one backend. Builds the REST client,
//!   connects the realtime channel on demand, opens list sessions, and runs
//!   one-shot reads and form submissions.
//!
//! - **[`ListSession`]**: One background task per open list. Owns a
//!   [`ListView`] and feeds it fetch results and realtime messages, then
//!   publishes [`ViewSnapshot`]s through a `watch` channel.
//!
//! - **[`ListView`]**: The synchronous state machine behind a list:
//!   collection, loading flag and error panel. A failed fetch never drops
//!   rows that an earlier fetch loaded.
//!
//! - **Store** ([`store`]): Immutable [`Collection`]s, identity-matched
//!   [`Patch`]es, payload normalization, and the filter/sort [`project`]ion.
//!
//! - **Domain model** ([`model`]): Schema-less [`Entity`] records, the
//!   [`ResourceKind`] catalogue, realtime events, and device/transaction
//!   presentation helpers.

pub mod config;
pub mod dashboard;
pub mod error;
pub mod forms;
pub mod model;
pub mod session;
pub mod store;
pub mod view;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{ClientConfig, TlsVerification};
pub use dashboard::Dashboard;
pub use error::CoreError;
pub use forms::{CountryForm, FormAction, NetworkForm, TransactionEditor};
pub use session::{ListSession, SessionOptions};
pub use store::{
    Collection, ListQuery, Patch, SortDirection, SortSpec, StatusFilter, normalize_list, project,
};
pub use view::{ListView, LoadKind, MessageOutcome, ViewSnapshot};

pub use model::{
    DetailLine, DeviceStatusUpdate, DeviceSummary, Entity, EntityKey, LogEntry, RealtimeEvent,
    ResourceKind, ResourceSpec, TransactionForm, TransactionStatus, describe_device,
};
