//! Network command handlers.

use tabled::Tabled;

use paydesk_core::{CoreError, Dashboard, Entity, FormAction, NetworkForm, ResourceKind};

use crate::cli::{GlobalOpts, NetworkFields, NetworksArgs, NetworksCommand};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct NetworkRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    nom: String,
    #[tabled(rename = "Code")]
    code: String,
    #[tabled(rename = "Country")]
    country: String,
    #[tabled(rename = "Active")]
    active: String,
}

/// `country` may be a bare id or an embedded object.
fn country_label(network: &Entity) -> String {
    network
        .first_text(&["country_name", "country.nom", "country.code", "country.id", "country"])
        .unwrap_or_else(|| network.display("country"))
}

fn row(network: &Entity, color: bool) -> NetworkRow {
    NetworkRow {
        id: network.display("id"),
        nom: network.display("nom"),
        code: network.display("code"),
        country: country_label(network),
        active: output::yes_no(network.truthy("is_active"), color),
    }
}

fn apply_fields(form: &mut NetworkForm, fields: NetworkFields) {
    if let Some(nom) = fields.nom {
        form.nom = nom;
    }
    if let Some(code) = fields.code {
        form.code = code;
    }
    if let Some(country) = fields.country {
        form.country = country;
    }
    if let Some(active) = fields.active {
        form.is_active = active;
    }
}

fn print_entity(entity: &Entity, global: &GlobalOpts) {
    let out = output::render_single(&global.output, entity, util::entity_detail, |n| {
        n.display("id")
    });
    output::print_output(&out, global.quiet);
}

/// Error mapper that falls back to the form's failure text.
fn failed(action: FormAction) -> impl FnOnce(CoreError) -> CliError {
    move |e| CliError::with_fallback(e, NetworkForm::failure_message(action))
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    dashboard: &Dashboard,
    args: NetworksArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        NetworksCommand::List { list, country } => {
            let query = util::list_query(&list, country);
            let rows = dashboard.list(ResourceKind::Networks, &query).await?;
            let color = output::should_color(&global.color);
            let out = output::render_list(
                &global.output,
                &rows,
                |_, n| row(n, color),
                |_, n| n.display("id"),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        NetworksCommand::Get { id } => {
            let network = dashboard
                .get(ResourceKind::Networks, &id)
                .await
                .map_err(failed(FormAction::Load))?;
            print_entity(&network, global);
            Ok(())
        }

        NetworksCommand::Create(fields) => {
            let mut form = NetworkForm::default();
            apply_fields(&mut form, fields);
            let created = dashboard
                .create_network(&form)
                .await
                .map_err(failed(FormAction::Create))?;
            if !global.quiet {
                eprintln!("✓ Network '{}' created", form.nom.trim());
            }
            print_entity(&created, global);
            Ok(())
        }

        NetworksCommand::Update { id, fields } => {
            let current = dashboard
                .get(ResourceKind::Networks, &id)
                .await
                .map_err(failed(FormAction::Load))?;
            let mut form = NetworkForm::from_entity(&current);
            apply_fields(&mut form, fields);
            let updated = dashboard
                .update_network(&id, &form)
                .await
                .map_err(failed(FormAction::Update))?;
            if !global.quiet {
                eprintln!("✓ Network {id} updated");
            }
            print_entity(&updated, global);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn network(value: serde_json::Value) -> Entity {
        Entity::from_value(value).unwrap_or_default()
    }

    #[test]
    fn country_label_reads_embedded_objects() {
        let embedded = network(json!({ "id": 1, "country": { "id": 3, "nom": "Senegal" } }));
        assert_eq!(country_label(&embedded), "Senegal");

        let bare = network(json!({ "id": 1, "country": 3 }));
        assert_eq!(country_label(&bare), "3");

        let missing = network(json!({ "id": 1 }));
        assert_eq!(country_label(&missing), "N/A");
    }
}
