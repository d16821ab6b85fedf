// ── Domain model ──
//
// Schema-less records plus the typed views the console derives from them.

pub mod device;
pub mod entity;
pub mod event;
pub mod resource;
pub mod transaction;

pub use device::{DetailLine, DeviceSummary, describe_device};
pub use entity::{Entity, EntityKey, PLACEHOLDER};
pub use event::{DeviceStatusUpdate, EventParseError, RealtimeEvent};
pub use resource::{ResourceKind, ResourceSpec, SearchFields};
pub use transaction::{LogEntry, TransactionForm, TransactionStatus};
