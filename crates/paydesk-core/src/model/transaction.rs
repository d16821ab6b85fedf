// ── Transactions ──
//
// The transaction editor only ever touches five free-text fields; the
// rest of the record is read-only context. Logs are loosely shaped and
// read through fallback chains.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::model::Entity;

// ── Status ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Completed,
    Pending,
    Failed,
    Cancelled,
    #[serde(untagged)]
    Other(String),
}

impl TransactionStatus {
    /// Read `status` from a transaction. A missing status reads as `Pending`.
    pub fn of(transaction: &Entity) -> Self {
        match transaction.str("status") {
            Some(raw) => Self::from_raw(raw),
            None => Self::Pending,
        }
    }

    pub fn from_raw(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "completed" | "success" => Self::Completed,
            "pending" => Self::Pending,
            "failed" => Self::Failed,
            "cancelled" | "canceled" => Self::Cancelled,
            _ => Self::Other(raw.to_owned()),
        }
    }

    pub fn is_final(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => f.write_str("completed"),
            Self::Pending => f.write_str("pending"),
            Self::Failed => f.write_str("failed"),
            Self::Cancelled => f.write_str("cancelled"),
            Self::Other(raw) => f.write_str(raw),
        }
    }
}

// ── Edit form ────────────────────────────────────────────────────────

/// Editable fields of a transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionForm {
    pub recipient_name: String,
    pub objet: String,
    pub external_transaction_id: String,
    pub raw_sms: String,
    pub processed_by_phone: String,
}

impl TransactionForm {
    /// Pre-fill from a loaded transaction. `recipient_name` falls back to
    /// the backend's computed `display_recipient_name`.
    pub fn from_transaction(transaction: &Entity) -> Self {
        let field = |name: &str| transaction.text(name).unwrap_or_default();
        Self {
            recipient_name: transaction
                .first_text(&["recipient_name", "display_recipient_name"])
                .unwrap_or_default(),
            objet: field("objet"),
            external_transaction_id: field("external_transaction_id"),
            raw_sms: field("raw_sms"),
            processed_by_phone: field("processed_by_phone"),
        }
    }

    /// PATCH body carrying exactly the five editable fields.
    pub fn to_body(&self) -> Value {
        let mut body = Map::new();
        body.insert("recipient_name".into(), self.recipient_name.clone().into());
        body.insert("objet".into(), self.objet.clone().into());
        body.insert(
            "external_transaction_id".into(),
            self.external_transaction_id.clone().into(),
        );
        body.insert("raw_sms".into(), self.raw_sms.clone().into());
        body.insert(
            "processed_by_phone".into(),
            self.processed_by_phone.clone().into(),
        );
        Value::Object(body)
    }

    /// Set one field by name. Returns `false` for unknown names.
    pub fn set(&mut self, name: &str, value: String) -> bool {
        let slot = match name {
            "recipient_name" => &mut self.recipient_name,
            "objet" => &mut self.objet,
            "external_transaction_id" => &mut self.external_transaction_id,
            "raw_sms" => &mut self.raw_sms,
            "processed_by_phone" => &mut self.processed_by_phone,
            _ => return false,
        };
        *slot = value;
        true
    }
}

// ── Logs ─────────────────────────────────────────────────────────────

/// One entry of a transaction's processing log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    pub timestamp: Option<String>,
    pub kind: String,
    pub message: Option<String>,
    pub data: Option<Value>,
}

impl LogEntry {
    pub fn from_entity(entry: &Entity) -> Self {
        Self {
            timestamp: entry.first_text(&["created_at", "timestamp"]),
            kind: entry
                .first_text(&["type", "event", "status"])
                .unwrap_or_else(|| "event".to_owned()),
            message: entry.text("message"),
            data: ["data", "payload", "meta"]
                .iter()
                .find_map(|k| entry.get(k))
                .cloned(),
        }
    }
}
