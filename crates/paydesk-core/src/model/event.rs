// ── Realtime events ──
//
// Inbound channel messages are JSON objects discriminated by `type`.
// Only `device_status_update` is understood today; every other type
// parses to `Unknown` and is ignored by consumers.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::model::resource::ResourceKind;
use crate::store::Patch;

pub const DEVICE_STATUS_UPDATE: &str = "device_status_update";

/// Why an inbound message could not be turned into an event.
#[derive(Debug, Error)]
pub enum EventParseError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("payload is not a JSON object")]
    NotAnObject,

    #[error("payload has no string `type` field")]
    MissingType,

    #[error("`{event}` is missing required field `{field}`")]
    MissingField {
        event: &'static str,
        field: &'static str,
    },

    #[error("`{event}` field `{field}` has the wrong type")]
    InvalidField {
        event: &'static str,
        field: &'static str,
    },
}

/// Device online/offline transition.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceStatusUpdate {
    pub device_id: Value,
    pub is_online: bool,
    /// `None` when the key was absent; `Some(Value::Null)` when the
    /// backend explicitly cleared it.
    pub last_seen: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RealtimeEvent {
    DeviceStatus(DeviceStatusUpdate),
    Unknown { kind: String },
}

impl RealtimeEvent {
    pub fn parse(text: &str) -> Result<Self, EventParseError> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &Value) -> Result<Self, EventParseError> {
        let obj = value.as_object().ok_or(EventParseError::NotAnObject)?;
        let kind = obj
            .get("type")
            .and_then(Value::as_str)
            .ok_or(EventParseError::MissingType)?;

        match kind {
            DEVICE_STATUS_UPDATE => parse_device_status(obj).map(Self::DeviceStatus),
            other => Ok(Self::Unknown {
                kind: other.to_owned(),
            }),
        }
    }

    /// Event type as sent on the wire.
    pub fn kind(&self) -> &str {
        match self {
            Self::DeviceStatus(_) => DEVICE_STATUS_UPDATE,
            Self::Unknown { kind } => kind,
        }
    }

    /// Patch this event implies for a collection of `resource`, if any.
    pub fn patch_for(&self, resource: ResourceKind) -> Option<Patch> {
        match (self, resource) {
            (Self::DeviceStatus(update), ResourceKind::Devices) => Some(update.to_patch()),
            _ => None,
        }
    }
}

impl DeviceStatusUpdate {
    pub fn to_patch(&self) -> Patch {
        let mut fields = Map::new();
        fields.insert("is_online".into(), Value::Bool(self.is_online));
        if let Some(last_seen) = &self.last_seen {
            fields.insert("last_seen".into(), last_seen.clone());
        }
        Patch::new(self.device_id.clone(), fields)
    }
}

fn parse_device_status(obj: &Map<String, Value>) -> Result<DeviceStatusUpdate, EventParseError> {
    let device_id = match obj.get("device_id") {
        None | Some(Value::Null) => {
            return Err(EventParseError::MissingField {
                event: DEVICE_STATUS_UPDATE,
                field: "device_id",
            });
        }
        Some(v @ (Value::String(_) | Value::Number(_))) => v.clone(),
        Some(_) => {
            return Err(EventParseError::InvalidField {
                event: DEVICE_STATUS_UPDATE,
                field: "device_id",
            });
        }
    };

    let is_online = match obj.get("is_online") {
        None | Some(Value::Null) => {
            return Err(EventParseError::MissingField {
                event: DEVICE_STATUS_UPDATE,
                field: "is_online",
            });
        }
        Some(v) => v.as_bool().ok_or(EventParseError::InvalidField {
            event: DEVICE_STATUS_UPDATE,
            field: "is_online",
        })?,
    };

    Ok(DeviceStatusUpdate {
        device_id,
        is_online,
        last_seen: obj.get("last_seen").cloned(),
    })
}
