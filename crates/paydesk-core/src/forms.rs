// ── Form controllers ──
//
// Create/edit forms for countries and networks, and the transaction
// editor with its log panel. Forms validate locally before any request;
// the async half lives on `Dashboard`, which feeds results back in here.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::model::entity::scalar_text;
use crate::model::{Entity, LogEntry, TransactionForm, TransactionStatus};
use crate::store::normalize_list;

/// What a form submission did, for error fallbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormAction {
    Load,
    Create,
    Update,
}

fn require(field: &str, value: &str) -> Result<(), CoreError> {
    if value.trim().is_empty() {
        return Err(CoreError::ValidationFailed {
            message: format!("{field} is required"),
        });
    }
    Ok(())
}

// ── Country ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryForm {
    pub nom: String,
    pub code: String,
    pub is_active: bool,
}

impl Default for CountryForm {
    fn default() -> Self {
        Self {
            nom: String::new(),
            code: String::new(),
            is_active: true,
        }
    }
}

impl CountryForm {
    pub fn from_entity(country: &Entity) -> Self {
        Self {
            nom: country.text("nom").unwrap_or_default(),
            code: country.text("code").unwrap_or_default(),
            is_active: country.bool("is_active").unwrap_or(true),
        }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        require("nom", &self.nom)?;
        require("code", &self.code)
    }

    pub fn to_body(&self) -> Value {
        let mut body = Map::new();
        body.insert("nom".into(), self.nom.trim().into());
        body.insert("code".into(), self.code.trim().into());
        body.insert("is_active".into(), self.is_active.into());
        Value::Object(body)
    }

    pub fn failure_message(action: FormAction) -> &'static str {
        match action {
            FormAction::Load => "Failed to load country",
            FormAction::Create => "Failed to create country",
            FormAction::Update => "Failed to update country",
        }
    }
}

// ── Network ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkForm {
    pub nom: String,
    pub code: String,
    /// Country reference as entered; numeric ids go out as numbers.
    pub country: String,
    pub is_active: bool,
}

impl Default for NetworkForm {
    fn default() -> Self {
        Self {
            nom: String::new(),
            code: String::new(),
            country: String::new(),
            is_active: true,
        }
    }
}

impl NetworkForm {
    /// Pre-fill from a loaded network. A nested `country` object
    /// contributes its id.
    pub fn from_entity(network: &Entity) -> Self {
        let country = network
            .get("country")
            .and_then(crate::store::projection::dimension_key)
            .unwrap_or_default();
        Self {
            nom: network.text("nom").unwrap_or_default(),
            code: network.text("code").unwrap_or_default(),
            country,
            is_active: network.bool("is_active").unwrap_or(true),
        }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        require("nom", &self.nom)?;
        require("code", &self.code)?;
        require("country", &self.country)
    }

    pub fn to_body(&self) -> Value {
        let country = self.country.trim();
        let country = country
            .parse::<i64>()
            .map_or_else(|_| Value::from(country), Value::from);

        let mut body = Map::new();
        body.insert("nom".into(), self.nom.trim().into());
        body.insert("code".into(), self.code.trim().into());
        body.insert("country".into(), country);
        body.insert("is_active".into(), self.is_active.into());
        Value::Object(body)
    }

    pub fn failure_message(action: FormAction) -> &'static str {
        match action {
            FormAction::Load => "Failed to load network",
            FormAction::Create => "Failed to create network",
            FormAction::Update => "Failed to update network",
        }
    }
}

// ── Transaction editor ───────────────────────────────────────────────

pub const TRANSACTION_LOAD_FAILED: &str = "Failed to load transaction";
pub const TRANSACTION_UPDATE_FAILED: &str = "Failed to update transaction";
pub const LOGS_LOAD_FAILED: &str = "Failed to load transaction logs";

/// State of the transaction edit screen.
///
/// The transaction and its logs load independently: a log failure never
/// touches the main error panel, and either can be retried alone.
#[derive(Debug, Clone, Default)]
pub struct TransactionEditor {
    uid: String,
    transaction: Option<Arc<Entity>>,
    pub form: TransactionForm,
    error: Option<String>,
    logs: Vec<LogEntry>,
    logs_error: Option<String>,
}

impl TransactionEditor {
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            ..Self::default()
        }
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn transaction(&self) -> Option<&Arc<Entity>> {
        self.transaction.as_ref()
    }

    pub fn status(&self) -> Option<TransactionStatus> {
        self.transaction.as_deref().map(TransactionStatus::of)
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn logs(&self) -> &[LogEntry] {
        &self.logs
    }

    pub fn logs_error(&self) -> Option<&str> {
        self.logs_error.as_deref()
    }

    /// Apply the transaction fetch. Success pre-fills the form.
    pub fn apply_loaded(&mut self, result: Result<Value, CoreError>) {
        match result.and_then(|payload| {
            Entity::from_value(payload).ok_or_else(|| CoreError::InvalidResponse {
                message: "transaction is not an object".into(),
            })
        }) {
            Ok(transaction) => {
                debug!(uid = %self.uid, "transaction loaded");
                self.form = TransactionForm::from_transaction(&transaction);
                self.transaction = Some(Arc::new(transaction));
                self.error = None;
            }
            Err(e) => {
                warn!(uid = %self.uid, error = %e, "transaction load failed");
                self.error = Some(e.user_message(TRANSACTION_LOAD_FAILED));
            }
        }
    }

    /// Apply the save response. Returns `true` on success.
    pub fn apply_saved(&mut self, result: Result<Value, CoreError>) -> bool {
        match result {
            Ok(payload) => {
                if let Some(updated) = Entity::from_value(payload) {
                    self.transaction = Some(Arc::new(updated));
                }
                self.error = None;
                true
            }
            Err(e) => {
                warn!(uid = %self.uid, error = %e, "transaction update failed");
                self.error = Some(e.user_message(TRANSACTION_UPDATE_FAILED));
                false
            }
        }
    }

    /// Apply the log fetch. A failure keeps the previous entries.
    pub fn apply_logs(&mut self, result: Result<Value, CoreError>) {
        match result {
            Ok(payload) => {
                self.logs = normalize_list(payload)
                    .iter()
                    .map(LogEntry::from_entity)
                    .collect();
                self.logs_error = None;
            }
            Err(e) => {
                warn!(uid = %self.uid, error = %e, "transaction logs failed");
                self.logs_error = Some(e.user_message(LOGS_LOAD_FAILED));
            }
        }
    }

    /// Reference number shown in the header, if any.
    pub fn reference(&self) -> Option<String> {
        self.transaction
            .as_deref()
            .and_then(|t| t.get("reference"))
            .and_then(scalar_text)
    }
}
