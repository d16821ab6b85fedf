//! Phone-number command handlers.

use tabled::Tabled;

use paydesk_core::{Dashboard, Entity, ResourceKind};

use crate::cli::{GlobalOpts, NumbersArgs, NumbersCommand};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct NumberRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Number")]
    number: String,
    #[tabled(rename = "Network")]
    network: String,
    #[tabled(rename = "Description")]
    description: String,
}

impl From<&Entity> for NumberRow {
    fn from(n: &Entity) -> Self {
        Self {
            id: n.display("id"),
            number: n
                .first_text(&["phone_number", "number"])
                .unwrap_or_else(|| n.display("phone_number")),
            network: n
                .first_text(&["network_name", "network.nom", "network.code", "network"])
                .unwrap_or_else(|| n.display("network")),
            description: n.text("description").unwrap_or_default(),
        }
    }
}

pub async fn handle(
    dashboard: &Dashboard,
    args: NumbersArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        NumbersCommand::List { list, network } => {
            let query = util::list_query(&list, network);
            let rows = dashboard.list(ResourceKind::PhoneNumbers, &query).await?;
            let out = output::render_list(
                &global.output,
                &rows,
                |_, n| NumberRow::from(n.as_ref()),
                |_, n| n.first_text(&["phone_number", "number", "id"]).unwrap_or_default(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
