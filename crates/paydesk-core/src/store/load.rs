// ── List payload normalization ──
//
// List endpoints answer either with a bare array or with a paginated
// wrapper. Whatever comes back, the view gets a plain `Vec<Entity>`.

use serde_json::Value;

use crate::model::Entity;

/// Wrapper keys that may hold the list, checked in order.
const LIST_KEYS: &[&str] = &["results", "data", "items"];

/// Turn a list payload into entities.
///
/// Bare arrays are taken as-is; objects are searched for a wrapped
/// array; anything else yields an empty list. Non-object elements are
/// dropped.
pub fn normalize_list(payload: Value) -> Vec<Entity> {
    let items = match payload {
        Value::Array(items) => items,
        Value::Object(mut map) => LIST_KEYS
            .iter()
            .find_map(|key| match map.remove(*key) {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            })
            .unwrap_or_default(),
        _ => Vec::new(),
    };

    let total = items.len();
    let entities: Vec<Entity> = items.into_iter().filter_map(Entity::from_value).collect();
    if entities.len() != total {
        tracing::debug!(
            dropped = total - entities.len(),
            "ignoring non-object list elements"
        );
    }
    entities
}
