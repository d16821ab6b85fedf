//! Transaction command handlers.

use std::sync::Arc;

use serde::Serialize;
use tabled::Tabled;

use paydesk_core::{Dashboard, Entity, LogEntry, TransactionEditor, TransactionForm};

use crate::cli::{GlobalOpts, TransactionsArgs, TransactionsCommand};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct LogRow {
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Message")]
    message: String,
}

impl From<&LogEntry> for LogRow {
    fn from(entry: &LogEntry) -> Self {
        Self {
            time: entry.timestamp.clone().unwrap_or_else(|| "-".into()),
            kind: entry.kind.clone(),
            message: entry.message.clone().unwrap_or_default(),
        }
    }
}

/// Everything the edit screen shows, for structured output.
#[derive(Serialize)]
struct TransactionView<'a> {
    uid: &'a str,
    status: Option<String>,
    transaction: Option<&'a Arc<Entity>>,
    form: &'a TransactionForm,
    logs: &'a [LogEntry],
    logs_error: Option<&'a str>,
}

impl<'a> From<&'a TransactionEditor> for TransactionView<'a> {
    fn from(editor: &'a TransactionEditor) -> Self {
        Self {
            uid: editor.uid(),
            status: editor.status().map(|s| s.to_string()),
            transaction: editor.transaction(),
            form: &editor.form,
            logs: editor.logs(),
            logs_error: editor.logs_error(),
        }
    }
}

fn detail(view: &TransactionView<'_>) -> String {
    let mut sections = Vec::new();
    if let Some(transaction) = view.transaction {
        sections.push(util::entity_detail(transaction));
    }

    let form = view.form;
    sections.push(format!(
        "Editable fields\n{}",
        output::detail_lines([
            ("recipient_name", form.recipient_name.clone()),
            ("objet", form.objet.clone()),
            ("external_transaction_id", form.external_transaction_id.clone()),
            ("raw_sms", form.raw_sms.clone()),
            ("processed_by_phone", form.processed_by_phone.clone()),
        ])
    ));

    match view.logs_error {
        Some(message) => sections.push(format!("Logs\n{message}")),
        None if view.logs.is_empty() => sections.push("Logs\n(no entries)".into()),
        None => sections.push(format!("Logs\n{}", log_lines(view.logs))),
    }
    sections.join("\n\n")
}

fn log_lines(logs: &[LogEntry]) -> String {
    logs.iter()
        .map(|entry| {
            let time = entry.timestamp.as_deref().unwrap_or("-");
            match entry.message {
                Some(ref message) => format!("{time}  {}  {message}", entry.kind),
                None => format!("{time}  {}", entry.kind),
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Load the editor; a failed transaction load is fatal, a failed log
/// load is only reported.
async fn open(dashboard: &Dashboard, uid: &str) -> Result<TransactionEditor, CliError> {
    let editor = dashboard.open_transaction(uid).await;
    if editor.transaction().is_none() {
        return Err(CliError::ApiError {
            message: editor
                .error()
                .unwrap_or(paydesk_core::forms::TRANSACTION_LOAD_FAILED)
                .to_owned(),
        });
    }
    Ok(editor)
}

fn print_editor(editor: &TransactionEditor, global: &GlobalOpts) {
    let view = TransactionView::from(editor);
    let out = output::render_single(&global.output, &view, detail, |v| v.uid.to_owned());
    output::print_output(&out, global.quiet);
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    dashboard: &Dashboard,
    args: TransactionsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        TransactionsCommand::Get { uid } => {
            let editor = open(dashboard, &uid).await?;
            print_editor(&editor, global);
            Ok(())
        }

        TransactionsCommand::Update {
            uid,
            recipient_name,
            objet,
            external_transaction_id,
            raw_sms,
            processed_by_phone,
        } => {
            let changes: Vec<(&str, String)> = [
                ("recipient_name", recipient_name),
                ("objet", objet),
                ("external_transaction_id", external_transaction_id),
                ("raw_sms", raw_sms),
                ("processed_by_phone", processed_by_phone),
            ]
            .into_iter()
            .filter_map(|(name, value)| value.map(|v| (name, v)))
            .collect();

            if changes.is_empty() {
                return Err(CliError::Validation {
                    field: "fields".into(),
                    reason: "nothing to update; pass at least one field flag".into(),
                });
            }

            let mut editor = open(dashboard, &uid).await?;
            for (name, value) in changes {
                editor.form.set(name, value);
            }

            if !dashboard.save_transaction(&mut editor).await {
                return Err(CliError::ApiError {
                    message: editor
                        .error()
                        .unwrap_or(paydesk_core::forms::TRANSACTION_UPDATE_FAILED)
                        .to_owned(),
                });
            }
            if !global.quiet {
                eprintln!("✓ Transaction {uid} updated");
            }
            print_editor(&editor, global);
            Ok(())
        }

        TransactionsCommand::Logs { uid } => {
            let logs = dashboard
                .transaction_logs(&uid)
                .await
                .map_err(|e| CliError::with_fallback(e, paydesk_core::forms::LOGS_LOAD_FAILED))?;
            let out = output::render_list(
                &global.output,
                &logs,
                |_, entry| LogRow::from(entry),
                |_, entry| entry.kind.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_lines_skip_missing_messages() {
        let logs = vec![
            LogEntry {
                timestamp: Some("2024-01-01T10:00:00Z".into()),
                kind: "received".into(),
                message: Some("SMS parsed".into()),
                data: None,
            },
            LogEntry {
                timestamp: None,
                kind: "event".into(),
                message: None,
                data: None,
            },
        ];
        assert_eq!(
            log_lines(&logs),
            "2024-01-01T10:00:00Z  received  SMS parsed\n-  event"
        );
    }

    #[test]
    fn detail_reports_log_failure_separately() {
        let form = TransactionForm {
            objet: "Loyer".into(),
            ..TransactionForm::default()
        };
        let view = TransactionView {
            uid: "tx-1",
            status: None,
            transaction: None,
            form: &form,
            logs: &[],
            logs_error: Some("Failed to load transaction logs"),
        };
        let text = detail(&view);
        assert!(text.contains("objet:"));
        assert!(text.contains("Loyer"));
        assert!(text.ends_with("Logs\nFailed to load transaction logs"));
    }
}
