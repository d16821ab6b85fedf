// ── Filter / sort projection ──
//
// Pure derivation of the visible rows from a collection. Never mutates
// its input; identical inputs always produce identical output.

use std::cmp::Ordering;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};

use crate::model::entity::{is_truthy, scalar_text};
use crate::model::{Entity, ResourceSpec, SearchFields};
use crate::store::Collection;

// ── StatusFilter ─────────────────────────────────────────────────────

/// Closed set of status filters. `Active` and `Inactive` read the
/// resource's boolean status field (`is_online`, `is_active`).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    #[strum(to_string = "all")]
    All,
    #[strum(to_string = "active", serialize = "online")]
    Active,
    #[strum(to_string = "inactive", serialize = "offline")]
    Inactive,
}

impl StatusFilter {
    pub fn matches(self, entity: &Entity, status_field: Option<&str>) -> bool {
        match (self, status_field) {
            (Self::All, _) | (_, None) => true,
            (Self::Active, Some(field)) => entity.truthy(field),
            (Self::Inactive, Some(field)) => !entity.truthy(field),
        }
    }
}

// ── Sorting ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    /// Wire prefix: `+` ascending, `-` descending.
    pub fn prefix(self) -> char {
        match self {
            Self::Ascending => '+',
            Self::Descending => '-',
        }
    }

    pub fn flipped(self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    /// Parse `+field`, `-field`, or a bare `field` (ascending).
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let (direction, field) = match raw.strip_prefix('-') {
            Some(rest) => (SortDirection::Descending, rest),
            None => (SortDirection::Ascending, raw.strip_prefix('+').unwrap_or(raw)),
        };
        (!field.is_empty()).then(|| Self::new(field, direction))
    }

    /// Column-header toggle: the current field flips direction, a new
    /// field starts descending.
    pub fn toggle(current: Option<&Self>, field: &str) -> Self {
        match current {
            Some(spec) if spec.field == field => Self::new(field, spec.direction.flipped()),
            _ => Self::new(field, SortDirection::Descending),
        }
    }

    /// Server `ordering` parameter: bare field ascending, `-field`
    /// descending.
    pub fn ordering_param(&self) -> String {
        match self.direction {
            SortDirection::Ascending => self.field.clone(),
            SortDirection::Descending => format!("-{}", self.field),
        }
    }
}

impl std::fmt::Display for SortSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.direction.prefix(), self.field)
    }
}

/// Total order over JSON values used for sorting:
/// missing/null < booleans < numbers < strings (case-insensitive).
#[derive(Debug, Clone, PartialEq)]
enum SortKey {
    Missing,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl SortKey {
    fn of(entity: &Entity, field: &str) -> Self {
        match entity.get_path(field) {
            None => Self::Missing,
            Some(Value::Bool(b)) => Self::Bool(*b),
            Some(Value::Number(n)) => n.as_f64().map_or(Self::Missing, Self::Number),
            Some(Value::String(s)) => Self::Text(s.to_lowercase()),
            Some(other) => {
                dimension_key(other).map_or(Self::Missing, |s| Self::Text(s.to_lowercase()))
            }
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Missing => 0,
            Self::Bool(_) => 1,
            Self::Number(_) => 2,
            Self::Text(_) => 3,
        }
    }

    fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Number(a), Self::Number(b)) => a.total_cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

// ── ListQuery ────────────────────────────────────────────────────────

/// Everything the user can tweak about a list's visible rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListQuery {
    pub search: String,
    pub status: StatusFilter,
    /// Exact-match value for the resource's secondary dimension
    /// (country for networks, network for phone numbers).
    pub dimension: Option<String>,
    pub sort: Option<SortSpec>,
}

impl ListQuery {
    pub fn matches(&self, entity: &Entity, spec: &ResourceSpec) -> bool {
        self.matches_search(entity, spec.search)
            && self.status.matches(entity, spec.status_field)
            && self.matches_dimension(entity, spec.dimension_field)
    }

    fn matches_search(&self, entity: &Entity, fields: SearchFields) -> bool {
        let term = self.search.trim().to_lowercase();
        if term.is_empty() {
            return true;
        }

        match fields {
            SearchFields::All => entity
                .fields()
                .values()
                .filter(|v| is_truthy(v))
                .any(|v| searchable_text(v).to_lowercase().contains(&term)),
            SearchFields::Only(fields) => fields
                .iter()
                .filter_map(|f| entity.text(f))
                .any(|text| text.to_lowercase().contains(&term)),
        }
    }

    fn matches_dimension(&self, entity: &Entity, field: Option<&str>) -> bool {
        let (Some(wanted), Some(field)) = (self.dimension.as_deref(), field) else {
            return true;
        };
        entity
            .get(field)
            .and_then(dimension_key)
            .is_some_and(|key| key == wanted)
    }
}

/// Visible rows for `collection` under `query`.
pub fn project(
    collection: &Collection,
    spec: &ResourceSpec,
    query: &ListQuery,
) -> Vec<Arc<Entity>> {
    let mut rows: Vec<Arc<Entity>> = collection
        .entities()
        .iter()
        .filter(|e| query.matches(e, spec))
        .cloned()
        .collect();

    if let Some(sort) = &query.sort {
        // `sort_by` is stable, so equal keys keep collection order.
        let mut keyed: Vec<(SortKey, Arc<Entity>)> = rows
            .into_iter()
            .map(|e| (SortKey::of(&e, &sort.field), e))
            .collect();
        keyed.sort_by(|(a, _), (b, _)| match sort.direction {
            SortDirection::Ascending => a.compare(b),
            SortDirection::Descending => b.compare(a),
        });
        rows = keyed.into_iter().map(|(_, e)| e).collect();
    }

    rows
}

/// Text the all-fields search matches against: strings as-is, other
/// scalars via `Display`, nested values as compact JSON.
fn searchable_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
        other => scalar_text(other).unwrap_or_default(),
    }
}

/// Comparable form of a dimension value: scalar text, or the `id` /
/// `uid` of a nested object.
pub fn dimension_key(value: &Value) -> Option<String> {
    match value {
        Value::Object(map) => ["id", "uid", "code", "nom", "name"]
            .iter()
            .find_map(|k| map.get(*k).and_then(scalar_text)),
        other => scalar_text(other),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::model::ResourceKind;

    fn collection(values: Vec<Value>) -> Collection {
        values.into_iter().filter_map(Entity::from_value).collect()
    }

    fn ids(rows: &[Arc<Entity>]) -> Vec<String> {
        rows.iter().map(|e| e.display("id")).collect()
    }

    fn search(term: &str) -> ListQuery {
        ListQuery {
            search: term.into(),
            ..ListQuery::default()
        }
    }

    fn within(dimension: &str) -> ListQuery {
        ListQuery {
            dimension: Some(dimension.into()),
            ..ListQuery::default()
        }
    }

    #[test]
    fn status_filter_parses_aliases() {
        assert_eq!(StatusFilter::from_str("online").unwrap(), StatusFilter::Active);
        assert_eq!(StatusFilter::from_str("OFFLINE").unwrap(), StatusFilter::Inactive);
        assert_eq!(StatusFilter::from_str("all").unwrap(), StatusFilter::All);
        assert_eq!(StatusFilter::Active.to_string(), "active");
        assert!(StatusFilter::from_str("sometimes").is_err());
    }

    #[test]
    fn sort_spec_parse_and_display() {
        let spec = SortSpec::parse("-created_at").unwrap();
        assert_eq!(spec.direction, SortDirection::Descending);
        assert_eq!(spec.field, "created_at");
        assert_eq!(spec.to_string(), "-created_at");
        assert_eq!(SortSpec::parse("+nom").unwrap().to_string(), "+nom");
        assert_eq!(SortSpec::parse("nom").unwrap().direction, SortDirection::Ascending);
        assert!(SortSpec::parse("-").is_none());
    }

    #[test]
    fn toggle_flips_same_field_and_resets_new_field() {
        let first = SortSpec::toggle(None, "nom");
        assert_eq!(first, SortSpec::new("nom", SortDirection::Descending));

        let second = SortSpec::toggle(Some(&first), "nom");
        assert_eq!(second.direction, SortDirection::Ascending);

        let other = SortSpec::toggle(Some(&second), "code");
        assert_eq!(other, SortSpec::new("code", SortDirection::Descending));
    }

    #[test]
    fn ordering_param_omits_plus() {
        let ascending = SortSpec::new("phone_number", SortDirection::Ascending);
        assert_eq!(ascending.ordering_param(), "phone_number");
        let descending = SortSpec::new("network", SortDirection::Descending);
        assert_eq!(descending.ordering_param(), "-network");
    }

    #[test]
    fn device_search_spans_every_field() {
        let devices = collection(vec![
            json!({ "id": "D1", "name": "Kiosk Dakar", "battery_level": 80 }),
            json!({ "id": "D2", "name": "Kiosk Thies", "meta": { "sim": "Orange" } }),
        ]);
        let spec = ResourceKind::Devices.spec();

        let query = search("80");
        assert_eq!(ids(&project(&devices, spec, &query)), ["D1"]);

        let query = search("orange");
        assert_eq!(ids(&project(&devices, spec, &query)), ["D2"]);
    }

    #[test]
    fn device_search_skips_falsy_values() {
        let devices = collection(vec![json!({ "id": "D1", "is_online": false, "errors": 0 })]);
        let spec = ResourceKind::Devices.spec();

        for term in ["false", "0"] {
            let query = search(term);
            assert!(project(&devices, spec, &query).is_empty(), "term {term}");
        }
    }

    #[test]
    fn country_search_limited_to_name_and_code() {
        let countries = collection(vec![
            json!({ "id": 1, "nom": "Sénégal", "code": "SN", "currency": "XOF" }),
            json!({ "id": 2, "nom": "Mali", "code": "ML", "currency": "XOF" }),
        ]);
        let spec = ResourceKind::Countries.spec();

        let query = search("xof");
        assert!(project(&countries, spec, &query).is_empty());

        let query = search("ml");
        assert_eq!(ids(&project(&countries, spec, &query)), ["2"]);
    }

    #[test]
    fn whitespace_search_includes_everything() {
        let countries = collection(vec![json!({ "id": 1 }), json!({ "id": 2 })]);
        let query = search("   ");
        assert_eq!(project(&countries, ResourceKind::Countries.spec(), &query).len(), 2);
    }

    #[test]
    fn dimension_filter_is_exact() {
        let networks = collection(vec![
            json!({ "id": 1, "nom": "Orange", "country": "SN", "is_active": true }),
            json!({ "id": 2, "nom": "Free", "country": "SN2", "is_active": true }),
            json!({ "id": 3, "nom": "Moov", "is_active": true }),
        ]);
        let query = within("SN");
        assert_eq!(ids(&project(&networks, ResourceKind::Networks.spec(), &query)), ["1"]);
    }

    #[test]
    fn dimension_filter_reads_nested_object_id() {
        let numbers = collection(vec![
            json!({
                "id": 10,
                "phone_number": "770000001",
                "network": { "id": 4, "nom": "Orange" }
            }),
            json!({ "id": 11, "phone_number": "760000001", "network": 5 }),
        ]);
        let spec = ResourceKind::PhoneNumbers.spec();

        let query = within("4");
        assert_eq!(ids(&project(&numbers, spec, &query)), ["10"]);

        let query = within("5");
        assert_eq!(ids(&project(&numbers, spec, &query)), ["11"]);
    }

    #[test]
    fn status_filter_ignored_without_status_field() {
        let numbers = collection(vec![json!({ "id": 1 })]);
        let query = ListQuery {
            status: StatusFilter::Active,
            ..ListQuery::default()
        };
        assert_eq!(project(&numbers, ResourceKind::PhoneNumbers.spec(), &query).len(), 1);
    }

    #[test]
    fn filters_combine_with_and() {
        let networks = collection(vec![
            json!({ "id": 1, "nom": "Orange SN", "country": "SN", "is_active": true }),
            json!({ "id": 2, "nom": "Orange ML", "country": "ML", "is_active": true }),
            json!({ "id": 3, "nom": "Orange SN old", "country": "SN", "is_active": false }),
        ]);
        let query = ListQuery {
            search: "orange".into(),
            status: StatusFilter::Active,
            dimension: Some("SN".into()),
            sort: None,
        };
        assert_eq!(ids(&project(&networks, ResourceKind::Networks.spec(), &query)), ["1"]);
    }

    #[test]
    fn sort_is_stable_in_both_directions() {
        let devices = collection(vec![
            json!({ "id": "a", "is_online": true }),
            json!({ "id": "b", "is_online": false }),
            json!({ "id": "c", "is_online": true }),
            json!({ "id": "d" }),
        ]);
        let spec = ResourceKind::Devices.spec();

        let asc = ListQuery {
            sort: Some(SortSpec::new("is_online", SortDirection::Ascending)),
            ..ListQuery::default()
        };
        assert_eq!(ids(&project(&devices, spec, &asc)), ["d", "b", "a", "c"]);

        let desc = ListQuery {
            sort: Some(SortSpec::new("is_online", SortDirection::Descending)),
            ..ListQuery::default()
        };
        assert_eq!(ids(&project(&devices, spec, &desc)), ["a", "c", "b", "d"]);
    }

    #[test]
    fn text_sort_is_case_insensitive_and_numbers_numeric() {
        let countries = collection(vec![
            json!({ "id": 1, "nom": "mali" }),
            json!({ "id": 2, "nom": "Benin" }),
            json!({ "id": 3, "nom": "Côte d'Ivoire", "rank": 10 }),
            json!({ "id": 4, "nom": "Togo", "rank": 9 }),
        ]);
        let spec = ResourceKind::Countries.spec();

        let by_name = ListQuery {
            sort: Some(SortSpec::new("nom", SortDirection::Ascending)),
            ..ListQuery::default()
        };
        assert_eq!(ids(&project(&countries, spec, &by_name)), ["2", "3", "1", "4"]);

        let by_rank = ListQuery {
            sort: Some(SortSpec::new("rank", SortDirection::Ascending)),
            ..ListQuery::default()
        };
        assert_eq!(ids(&project(&countries, spec, &by_rank)), ["1", "2", "4", "3"]);
    }

    #[test]
    fn projection_leaves_collection_untouched() {
        let devices = collection(vec![json!({ "id": "b" }), json!({ "id": "a" })]);
        let before = devices.clone();
        let query = ListQuery {
            sort: Some(SortSpec::new("id", SortDirection::Ascending)),
            ..ListQuery::default()
        };
        let first = project(&devices, ResourceKind::Devices.spec(), &query);
        let second = project(&devices, ResourceKind::Devices.spec(), &query);
        assert_eq!(devices, before);
        assert_eq!(ids(&first), ids(&second));
    }
}
