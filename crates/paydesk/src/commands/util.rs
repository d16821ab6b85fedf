//! Shared helpers for command handlers.

use std::io::IsTerminal;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use paydesk_core::{Entity, ListQuery, SortDirection, SortSpec};

use crate::cli::{GlobalOpts, ListArgs, OutputFormat};
use crate::output;

/// Translate list flags into the projection query.
pub fn list_query(args: &ListArgs, dimension: Option<String>) -> ListQuery {
    let direction = if args.asc {
        SortDirection::Ascending
    } else {
        SortDirection::Descending
    };
    ListQuery {
        search: args.search.clone().unwrap_or_default(),
        status: args.status,
        dimension,
        sort: args.sort.as_deref().map(|field| SortSpec::new(field, direction)),
    }
}

/// Every field of a schema-less record as aligned `key: value` lines.
pub fn entity_detail(entity: &Entity) -> String {
    output::detail_lines(
        entity
            .fields()
            .keys()
            .map(|key| (key.as_str(), entity.display(key))),
    )
}

/// Loading spinner on stderr. Hidden for quiet runs, scripted output
/// formats, and non-terminal stderr.
pub fn spinner(global: &GlobalOpts, message: &str) -> ProgressBar {
    let interactive = std::io::stderr().is_terminal();
    if global.quiet || !interactive || !matches!(global.output, OutputFormat::Table) {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    bar.set_style(style);
    bar.set_message(message.to_owned());
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

/// Map a dialoguer / interactive I/O failure into CliError.
pub fn prompt_err(e: impl std::fmt::Display) -> crate::error::CliError {
    crate::error::CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use paydesk_core::StatusFilter;
    use serde_json::json;

    use super::*;

    fn args(sort: Option<&str>, asc: bool) -> ListArgs {
        ListArgs {
            search: Some("  kiosk ".into()),
            status: StatusFilter::Inactive,
            sort: sort.map(str::to_owned),
            asc,
        }
    }

    #[test]
    fn sort_defaults_to_descending() {
        let query = list_query(&args(Some("name"), false), None);
        assert_eq!(query.sort, Some(SortSpec::new("name", SortDirection::Descending)));
        assert_eq!(query.status, StatusFilter::Inactive);
        assert_eq!(query.search, "  kiosk ");

        let query = list_query(&args(Some("name"), true), Some("3".into()));
        assert_eq!(query.sort, Some(SortSpec::new("name", SortDirection::Ascending)));
        assert_eq!(query.dimension.as_deref(), Some("3"));
    }

    #[test]
    fn detail_lists_fields_in_order() {
        let value = json!({ "id": 4, "nom": "Mali", "code": null });
        let Some(entity) = Entity::from_value(value) else {
            panic!("object expected");
        };
        assert_eq!(entity_detail(&entity), "id:   4\nnom:  Mali\ncode: N/A");
    }
}
