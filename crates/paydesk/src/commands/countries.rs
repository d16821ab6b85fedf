//! Country command handlers.

use std::sync::Arc;

use tabled::Tabled;

use paydesk_core::{CoreError, CountryForm, Dashboard, Entity, FormAction, ResourceKind};

use crate::cli::{CountriesArgs, CountriesCommand, CountryFields, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct CountryRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    nom: String,
    #[tabled(rename = "Code")]
    code: String,
    #[tabled(rename = "Active")]
    active: String,
}

fn row(country: &Entity, color: bool) -> CountryRow {
    CountryRow {
        id: country.display("id"),
        nom: country.display("nom"),
        code: country.display("code"),
        active: output::yes_no(country.truthy("is_active"), color),
    }
}

fn apply_fields(form: &mut CountryForm, fields: CountryFields) {
    if let Some(nom) = fields.nom {
        form.nom = nom;
    }
    if let Some(code) = fields.code {
        form.code = code;
    }
    if let Some(active) = fields.active {
        form.is_active = active;
    }
}

fn print_entity(entity: &Entity, global: &GlobalOpts) {
    let out = output::render_single(&global.output, entity, util::entity_detail, |c| {
        c.display("id")
    });
    output::print_output(&out, global.quiet);
}

/// Error mapper that falls back to the form's failure text.
fn failed(action: FormAction) -> impl FnOnce(CoreError) -> CliError {
    move |e| CliError::with_fallback(e, CountryForm::failure_message(action))
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    dashboard: &Dashboard,
    args: CountriesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        CountriesCommand::List(list) => {
            let query = util::list_query(&list, None);
            let rows: Vec<Arc<Entity>> = dashboard.list(ResourceKind::Countries, &query).await?;
            let color = output::should_color(&global.color);
            let out = output::render_list(
                &global.output,
                &rows,
                |_, c| row(c, color),
                |_, c| c.display("id"),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        CountriesCommand::Get { id } => {
            let country = dashboard
                .get(ResourceKind::Countries, &id)
                .await
                .map_err(failed(FormAction::Load))?;
            print_entity(&country, global);
            Ok(())
        }

        CountriesCommand::Create(fields) => {
            let mut form = CountryForm::default();
            apply_fields(&mut form, fields);
            let created = dashboard
                .create_country(&form)
                .await
                .map_err(failed(FormAction::Create))?;
            if !global.quiet {
                eprintln!("✓ Country '{}' created", form.nom.trim());
            }
            print_entity(&created, global);
            Ok(())
        }

        CountriesCommand::Update { id, fields } => {
            let current = dashboard
                .get(ResourceKind::Countries, &id)
                .await
                .map_err(failed(FormAction::Load))?;
            let mut form = CountryForm::from_entity(&current);
            apply_fields(&mut form, fields);
            let updated = dashboard
                .update_country(&id, &form)
                .await
                .map_err(failed(FormAction::Update))?;
            if !global.quiet {
                eprintln!("✓ Country {id} updated");
            }
            print_entity(&updated, global);
            Ok(())
        }
    }
}
