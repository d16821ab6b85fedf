// ── Ordered entity collection ──
//
// The list a view shows, in backend order. Two mutations only: wholesale
// replacement after a load, and field patches keyed by identity. A patch
// never changes length or order.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::model::Entity;

/// Field-level update addressed to every entity whose identity equals
/// `identity`.
#[derive(Debug, Clone, PartialEq)]
pub struct Patch {
    identity: Value,
    fields: Map<String, Value>,
}

impl Patch {
    pub fn new(identity: Value, fields: Map<String, Value>) -> Self {
        Self { identity, fields }
    }

    pub fn identity(&self) -> &Value {
        &self.identity
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }
}

/// Immutable, cheaply cloneable snapshot of a list.
///
/// Entities sit behind `Arc` so a patch only reallocates the records it
/// touches.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Collection {
    entities: Vec<Arc<Entity>>,
}

impl Collection {
    pub fn new(entities: Vec<Entity>) -> Self {
        Self {
            entities: entities.into_iter().map(Arc::new).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Entity> {
        self.entities.get(index).map(AsRef::as_ref)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter().map(AsRef::as_ref)
    }

    pub fn entities(&self) -> &[Arc<Entity>] {
        &self.entities
    }

    /// First entity whose identity equals `identity`.
    pub fn find(&self, identity: &Value, fallbacks: &[&str]) -> Option<&Entity> {
        self.iter().find(|e| e.identity(fallbacks) == Some(identity))
    }

    /// Apply `patch`, returning the new collection and the number of
    /// entities it touched. Zero matches yields a collection equal to
    /// `self`.
    pub fn patched(&self, patch: &Patch, fallbacks: &[&str]) -> (Self, usize) {
        let mut matched = 0;
        let entities = self
            .entities
            .iter()
            .map(|entity| {
                if entity.identity(fallbacks) == Some(patch.identity()) {
                    matched += 1;
                    Arc::new(entity.merged(patch.fields()))
                } else {
                    Arc::clone(entity)
                }
            })
            .collect();
        (Self { entities }, matched)
    }
}

impl FromIterator<Entity> for Collection {
    fn from_iter<I: IntoIterator<Item = Entity>>(iter: I) -> Self {
        Self {
            entities: iter.into_iter().map(Arc::new).collect(),
        }
    }
}
