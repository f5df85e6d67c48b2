//! Hierarchical index over resource-scoped entities.
//!
//! Entities are grouped by subscription, resource group, resource name and
//! tag. The four levels are flattened into a single composite key; key
//! segments are lower-cased so lookups are case-insensitive. Leaves are
//! insert-if-absent: the first entity stored for a key wins and later
//! duplicates are dropped.

use std::collections::HashMap;

use crate::error::ResourceIdError;
use crate::resource::ResourceId;

/// Identifies one scale set: the first three index levels.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScaleSetKey {
    pub subscription: String,
    pub group: String,
    pub name: String,
}

impl ScaleSetKey {
    pub fn new(subscription: &str, group: &str, name: &str) -> Self {
        Self {
            subscription: subscription.to_lowercase(),
            group: group.to_lowercase(),
            name: name.to_lowercase(),
        }
    }

    pub fn from_resource(resource: &ResourceId) -> Self {
        Self::new(
            resource.subscription_id(),
            resource.resource_group(),
            resource.name(),
        )
    }

    /// Extend to a full leaf key.
    pub fn with_tag(&self, tag: &str) -> IndexKey {
        IndexKey {
            scale_set: self.clone(),
            tag: tag.to_lowercase(),
        }
    }
}

/// Full composite key of an index leaf.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IndexKey {
    pub scale_set: ScaleSetKey,
    pub tag: String,
}

impl IndexKey {
    pub fn new(resource: &ResourceId, tag: &str) -> Self {
        ScaleSetKey::from_resource(resource).with_tag(tag)
    }
}

/// An entity that can be placed in a [`HierarchicalIndex`] by its own
/// resource id and tag.
pub trait Indexed {
    fn resource_id(&self) -> &str;
    fn tag(&self) -> &str;

    fn index_key(&self) -> Result<IndexKey, ResourceIdError> {
        let resource = ResourceId::parse(self.resource_id())?;
        Ok(IndexKey::new(&resource, self.tag()))
    }
}

/// Composite-key index with insert-if-absent leaves.
#[derive(Debug, Clone)]
pub struct HierarchicalIndex<T> {
    entries: HashMap<IndexKey, T>,
}

impl<T> Default for HierarchicalIndex<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> HierarchicalIndex<T> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Build an index using a custom key function.
    ///
    /// Items for which the key function returns `Ok(None)` are left out.
    pub fn build_by<I, F, E>(items: I, mut key_fn: F) -> Result<Self, E>
    where
        I: IntoIterator<Item = T>,
        F: FnMut(&T) -> Result<Option<IndexKey>, E>,
    {
        let mut index = Self::new();
        for item in items {
            if let Some(key) = key_fn(&item)? {
                index.insert(key, item);
            }
        }
        Ok(index)
    }

    /// Store `value` under `key` unless the leaf is already occupied.
    ///
    /// Returns `true` if the value was stored.
    pub fn insert(&mut self, key: IndexKey, value: T) -> bool {
        if self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(key, value);
        true
    }

    pub fn contains(&self, key: &IndexKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &IndexKey) -> Option<&T> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&IndexKey, &T)> {
        self.entries.iter()
    }

    /// Leaves below one scale set.
    pub fn scale_set_entries<'a>(
        &'a self,
        scale_set: &'a ScaleSetKey,
    ) -> impl Iterator<Item = (&'a IndexKey, &'a T)> + 'a {
        self.entries
            .iter()
            .filter(move |(key, _)| &key.scale_set == scale_set)
    }

    /// Visit every leaf.
    pub fn each<F>(&self, mut visitor: F)
    where
        F: FnMut(&IndexKey, &T),
    {
        for (key, value) in &self.entries {
            visitor(key, value);
        }
    }
}

impl<T: Indexed> HierarchicalIndex<T> {
    /// Build an index keyed by each entity's own resource id and tag.
    pub fn build<I>(items: I) -> Result<Self, ResourceIdError>
    where
        I: IntoIterator<Item = T>,
    {
        Self::build_by(items, |item| item.index_key().map(Some))
    }
}

impl<T> IntoIterator for HierarchicalIndex<T> {
    type Item = (IndexKey, T);
    type IntoIter = std::collections::hash_map::IntoIter<IndexKey, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
