// ── Device presentation helpers ──
//
// Devices carry whatever the phone-side agent reports, so everything
// here works off the raw entity: a display name fallback chain, an
// online/total tally, and a key-by-key detail description.

use std::sync::Arc;

use chrono::{DateTime, Local, TimeZone, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::model::Entity;

const NOT_AVAILABLE: &str = "Not available";

/// Labels for well-known device keys. Anything else is title-cased.
const KEY_LABELS: &[(&str, &str)] = &[
    ("id", "Identifier"),
    ("device_id", "Device ID"),
    ("name", "Name"),
    ("device_name", "Device name"),
    ("is_online", "Online"),
    ("device_type", "Device type"),
    ("type", "Type"),
    ("battery_level", "Battery level"),
    ("location", "Location"),
    ("address", "Address"),
    ("last_seen", "Last seen"),
    ("created_at", "Created"),
    ("updated_at", "Updated"),
    ("status", "Status"),
    ("ip_address", "IP address"),
    ("mac_address", "MAC address"),
    ("os_version", "OS version"),
    ("app_version", "App version"),
    ("model", "Model"),
    ("manufacturer", "Manufacturer"),
];

/// `name` → `device_name` → `device_id` → `Device {n}` (1-based).
pub fn display_name(device: &Entity, index: usize) -> String {
    device
        .first_text(&["name", "device_name", "device_id"])
        .unwrap_or_else(|| format!("Device {}", index + 1))
}

/// `id` → `device_id` → position.
pub fn display_id(device: &Entity, index: usize) -> String {
    device
        .first_text(&["id", "device_id"])
        .unwrap_or_else(|| index.to_string())
}

/// Online / total counts over a set of visible rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeviceSummary {
    pub total: usize,
    pub online: usize,
}

impl DeviceSummary {
    pub fn of(rows: &[Arc<Entity>]) -> Self {
        Self {
            total: rows.len(),
            online: rows.iter().filter(|d| d.truthy("is_online")).count(),
        }
    }

    pub fn offline(&self) -> usize {
        self.total - self.online
    }
}

// ── Detail description ───────────────────────────────────────────────

/// One row of the device detail view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetailLine {
    pub key: String,
    pub label: String,
    pub value: String,
}

/// Describe every field of `device`, in field order, with local times.
pub fn describe_device(device: &Entity) -> Vec<DetailLine> {
    describe_device_in(device, &Local)
}

/// [`describe_device`] with an explicit timezone for date fields.
pub fn describe_device_in<Tz>(device: &Entity, tz: &Tz) -> Vec<DetailLine>
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    device
        .fields()
        .iter()
        .map(|(key, value)| DetailLine {
            key: key.clone(),
            label: label_for(key),
            value: format_value(key, value, tz),
        })
        .collect()
}

fn label_for(key: &str) -> String {
    KEY_LABELS
        .iter()
        .find(|(k, _)| *k == key)
        .map_or_else(|| title_case(key), |(_, label)| (*label).to_owned())
}

fn title_case(key: &str) -> String {
    key.split('_')
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn format_value<Tz>(key: &str, value: &Value, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    if value.is_null() {
        return NOT_AVAILABLE.to_owned();
    }

    let key = key.to_lowercase();
    if ["date", "time", "seen"].iter().any(|k| key.contains(k)) {
        return format_timestamp(value, tz);
    }

    match value {
        Value::Bool(b) => String::from(if *b { "Yes" } else { "No" }),
        Value::Number(n) => {
            if key.contains("level") || key.contains("battery") {
                format!("{n}%")
            } else if key.contains("amount") || key.contains("price") {
                format!("{} FCFA", group_thousands(&n.to_string()))
            } else {
                group_thousands(&n.to_string())
            }
        }
        Value::String(s) => s.clone(),
        nested => serde_json::to_string_pretty(nested).unwrap_or_else(|_| nested.to_string()),
    }
}

/// RFC 3339 strings and epoch-millisecond numbers, rendered in `tz`.
/// Anything unparseable is shown as-is.
fn format_timestamp<Tz>(value: &Value, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let parsed = match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    };

    match parsed {
        Some(dt) => dt.with_timezone(tz).format("%Y-%m-%d %H:%M:%S").to_string(),
        None => match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        },
    }
}

/// `1234567.5` → `1,234,567.5`.
fn group_thousands(raw: &str) -> String {
    let (sign, rest) = raw.strip_prefix('-').map_or(("", raw), |r| ("-", r));
    let (int, frac) = rest.split_once('.').map_or((rest, None), |(i, f)| (i, Some(f)));

    let mut grouped = String::with_capacity(int.len() + int.len() / 3);
    for (i, ch) in int.chars().enumerate() {
        if i > 0 && (int.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match frac {
        Some(f) => format!("{sign}{grouped}.{f}"),
        None => format!("{sign}{grouped}"),
    }
}
