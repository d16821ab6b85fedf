// ── Resource catalogue ──
//
// Static description of every list the console shows: where it is
// fetched from, how records are identified, and which fields the
// search/status/dimension filters look at.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use paydesk_api::client;

/// Which fields the free-text search looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchFields {
    /// String form of every field value.
    All,
    /// Only these fields (dotted paths allowed).
    Only(&'static [&'static str]),
}

/// Per-resource list configuration.
#[derive(Debug)]
pub struct ResourceSpec {
    pub kind: ResourceKind,
    pub endpoint: &'static str,
    /// Identity fields consulted after `id`.
    pub identity_fallbacks: &'static [&'static str],
    pub search: SearchFields,
    /// Boolean field the active/inactive filter reads. `None` means the
    /// status filter never excludes anything.
    pub status_field: Option<&'static str>,
    /// Field the secondary exact-match filter compares against.
    pub dimension_field: Option<&'static str>,
    /// Fields offered for sorting.
    pub sortable: &'static [&'static str],
    /// Shown when a load fails and the backend gave nothing usable.
    pub load_failure: &'static str,
    /// Whether realtime events patch this collection.
    pub realtime: bool,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, Serialize, Deserialize,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    Devices,
    Countries,
    Networks,
    PhoneNumbers,
}

static DEVICES: ResourceSpec = ResourceSpec {
    kind: ResourceKind::Devices,
    endpoint: client::DEVICE_STATS,
    identity_fallbacks: &["uid", "device_id"],
    search: SearchFields::All,
    status_field: Some("is_online"),
    dimension_field: None,
    sortable: &["name", "is_online", "last_seen", "device_id"],
    load_failure: "Failed to load devices",
    realtime: true,
};

static COUNTRIES: ResourceSpec = ResourceSpec {
    kind: ResourceKind::Countries,
    endpoint: client::COUNTRIES,
    identity_fallbacks: &["uid"],
    search: SearchFields::Only(&["nom", "code"]),
    status_field: Some("is_active"),
    dimension_field: None,
    sortable: &["nom", "code"],
    load_failure: "Failed to load countries",
    realtime: false,
};

static NETWORKS: ResourceSpec = ResourceSpec {
    kind: ResourceKind::Networks,
    endpoint: client::NETWORKS,
    identity_fallbacks: &["uid"],
    search: SearchFields::Only(&["nom", "code", "country"]),
    status_field: Some("is_active"),
    dimension_field: Some("country"),
    sortable: &["nom", "code"],
    load_failure: "Failed to load networks",
    realtime: false,
};

static PHONE_NUMBERS: ResourceSpec = ResourceSpec {
    kind: ResourceKind::PhoneNumbers,
    endpoint: client::PHONE_NUMBERS,
    identity_fallbacks: &["uid"],
    search: SearchFields::Only(&["phone_number", "number", "description"]),
    status_field: None,
    dimension_field: Some("network"),
    sortable: &["phone_number", "network"],
    load_failure: "Failed to load phone numbers",
    realtime: false,
};

impl ResourceKind {
    pub fn spec(self) -> &'static ResourceSpec {
        match self {
            Self::Devices => &DEVICES,
            Self::Countries => &COUNTRIES,
            Self::Networks => &NETWORKS,
            Self::PhoneNumbers => &PHONE_NUMBERS,
        }
    }

    /// Human label used in log lines and messages ("phone numbers").
    pub fn label(self) -> &'static str {
        match self {
            Self::Devices => "devices",
            Self::Countries => "countries",
            Self::Networks => "networks",
            Self::PhoneNumbers => "phone numbers",
        }
    }
}
