//! Device command handlers.

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use indicatif::ProgressBar;
use tabled::Tabled;
use tokio::sync::watch;
use tracing::{info, warn};

use paydesk_core::model::device::{display_id, display_name};
use paydesk_core::{
    Dashboard, DeviceSummary, Entity, ListQuery, ResourceKind, ViewSnapshot, describe_device,
};

use crate::cli::{DevicesArgs, DevicesCommand, GlobalOpts, ListArgs, OutputFormat};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Battery")]
    battery: String,
    #[tabled(rename = "Last seen")]
    last_seen: String,
}

fn row(index: usize, d: &Entity, color: bool) -> DeviceRow {
    let described = |key: &str| {
        describe_device(d)
            .into_iter()
            .find(|line| line.key == key)
            .map_or_else(|| "-".into(), |line| line.value)
    };
    DeviceRow {
        id: display_id(d, index),
        name: display_name(d, index),
        status: output::online_label(d.truthy("is_online"), color),
        battery: described("battery_level"),
        last_seen: described("last_seen"),
    }
}

fn detail(d: &Entity) -> String {
    let lines = describe_device(d);
    output::detail_lines(lines.iter().map(|l| (l.label.as_str(), l.value.clone())))
}

fn summary_line(rows: &[Arc<Entity>]) -> String {
    let summary = DeviceSummary::of(rows);
    format!(
        "{} devices, {} online, {} offline",
        summary.total,
        summary.online,
        summary.offline()
    )
}

fn render_rows(rows: &[Arc<Entity>], global: &GlobalOpts, color: bool) -> String {
    output::render_list(
        &global.output,
        rows,
        |i, d| row(i, d, color),
        |i, d| display_id(d, i),
    )
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    dashboard: &Dashboard,
    args: DevicesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        DevicesCommand::List(list) => {
            let query = util::list_query(&list, None);
            let rows = dashboard.list(ResourceKind::Devices, &query).await?;
            let color = output::should_color(&global.color);
            output::print_output(&render_rows(&rows, global, color), global.quiet);
            if matches!(global.output, OutputFormat::Table) && !global.quiet {
                eprintln!("{}", summary_line(&rows));
            }
            Ok(())
        }

        DevicesCommand::Get { device } => {
            let found = dashboard.get(ResourceKind::Devices, &device).await?;
            let out = output::render_single(&global.output, &found, detail, |d| display_id(d, 0));
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DevicesCommand::Watch {
            list,
            refresh_every,
        } => watch_devices(dashboard, &list, refresh_every, global).await,
    }
}

// ── Watch ───────────────────────────────────────────────────────────

async fn watch_devices(
    dashboard: &Dashboard,
    list: &ListArgs,
    refresh_every: Option<u64>,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let query = util::list_query(list, None);
    let mut session = dashboard
        .open_list(
            ResourceKind::Devices,
            &query,
            refresh_every.filter(|s| *s > 0).map(Duration::from_secs),
        )
        .await?;
    let mut connection = dashboard.connection_state().await;
    if connection.is_none() {
        warn!("realtime disabled for this profile; the list only changes on refresh");
    }

    let color = output::should_color(&global.color);
    let spinner = util::spinner(global, "Loading devices");
    let mut screen = WatchScreen {
        global,
        query: &query,
        spinner: &spinner,
        color,
        last_error: None,
    };

    loop {
        tokio::select! {
            biased;
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    warn!(error = %e, "could not listen for Ctrl-C");
                }
                break;
            }
            snapshot = session.changed() => {
                let Some(snapshot) = snapshot else { break };
                screen.show(&snapshot);
            }
            state = next_state(&mut connection) => {
                match state {
                    Some(state) => info!(?state, "realtime connection"),
                    None => connection = None,
                }
            }
        }
    }

    spinner.finish_and_clear();
    session.close();
    dashboard.shutdown().await;
    Ok(())
}

struct WatchScreen<'a> {
    global: &'a GlobalOpts,
    query: &'a ListQuery,
    spinner: &'a ProgressBar,
    color: bool,
    last_error: Option<String>,
}

impl WatchScreen<'_> {
    fn show(&mut self, snapshot: &ViewSnapshot) {
        if snapshot.loading {
            self.spinner.set_message("Loading devices");
            return;
        }
        self.spinner.set_message("Watching devices (Ctrl-C to stop)");

        if snapshot.error != self.last_error {
            if let Some(ref message) = snapshot.error {
                let line = output::error_line(message, self.color);
                self.spinner.suspend(|| eprintln!("{line}"));
            }
            self.last_error.clone_from(&snapshot.error);
        }

        let rows = snapshot.project(self.query);
        let body = render_rows(&rows, self.global, self.color);
        if self.global.quiet {
            return;
        }
        let header = matches!(self.global.output, OutputFormat::Table).then(|| {
            format!(
                "── {} · {} ──",
                chrono::Local::now().format("%H:%M:%S"),
                summary_line(&rows)
            )
        });
        self.spinner.suspend(|| {
            if let Some(ref header) = header {
                println!("{header}");
            }
            output::print_output(&body, false);
        });
    }
}

/// Next connection-state change. Pends forever without a channel; `None`
/// once the channel is gone.
async fn next_state<T: Clone + Debug>(rx: &mut Option<watch::Receiver<T>>) -> Option<T> {
    match rx {
        Some(rx) => {
            rx.changed().await.ok()?;
            Some(rx.borrow_and_update().clone())
        }
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn devices() -> Vec<Arc<Entity>> {
        [
            json!({ "id": 1, "name": "Kiosk", "is_online": true, "battery_level": 80 }),
            json!({ "device_id": "ab-12", "is_online": false }),
            json!({ "is_online": false }),
        ]
        .into_iter()
        .filter_map(Entity::from_value)
        .map(Arc::new)
        .collect()
    }

    #[test]
    fn rows_use_display_fallbacks() {
        let rows: Vec<DeviceRow> = devices()
            .iter()
            .enumerate()
            .map(|(i, d)| row(i, d, false))
            .collect();
        assert_eq!(rows[0].name, "Kiosk");
        assert_eq!(rows[0].battery, "80%");
        assert_eq!(rows[0].status, "online");
        assert_eq!(rows[1].id, "ab-12");
        assert_eq!(rows[1].name, "ab-12");
        assert_eq!(rows[1].last_seen, "-");
        assert_eq!(rows[2].id, "2");
        assert_eq!(rows[2].name, "Device 3");
    }

    #[test]
    fn summary_counts_visible_rows() {
        assert_eq!(summary_line(&devices()), "3 devices, 1 online, 2 offline");
    }
}
