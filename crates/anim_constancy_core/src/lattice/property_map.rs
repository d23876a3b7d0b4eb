use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::scene::NodeId;

use super::{PropertyState, PropertyValue};

/// Addresses one scalar property on one scene object.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PropertyKey {
    pub target: NodeId,
    pub property: String,
}

impl PropertyKey {
    pub fn new(target: NodeId, property: impl Into<String>) -> Self {
        Self {
            target,
            property: property.into(),
        }
    }
}

/// Growable map from property key to lattice state, built incrementally during
/// composition. Insertion order is preserved for readability of provenance but
/// never affects the final classification.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PropertyMap {
    entries: IndexMap<PropertyKey, PropertyState>,
}

impl PropertyMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &PropertyKey) -> Option<&PropertyState> {
        self.entries.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PropertyKey, &PropertyState)> {
        self.entries.iter()
    }

    pub fn insert(&mut self, key: PropertyKey, state: PropertyState) {
        self.entries.insert(key, state);
    }

    /// Merge `state` into whatever is already recorded for `key`. An absent
    /// entry behaves as [`PropertyValue::Invalid`], so this degenerates to
    /// insertion for fresh keys.
    pub fn apply(&mut self, key: PropertyKey, state: PropertyState, as_new_layer: bool) {
        match self.entries.get_mut(&key) {
            Some(existing) => *existing = existing.merged_with(&state, as_new_layer),
            None => {
                self.entries.insert(key, state);
            }
        }
    }

    /// Fold `other` on top of this map as an override layer.
    pub fn apply_override(&mut self, other: &PropertyMap) {
        for (key, state) in other.iter() {
            self.apply(key.clone(), state.clone(), true);
        }
    }

    /// Fold `other` on top of this map as an additive layer. Variable
    /// contributions poison the target property; constant deltas cannot be
    /// assumed to have any classifiable effect and are dropped.
    pub fn apply_additive(&mut self, other: &PropertyMap) {
        for (key, state) in other.iter() {
            if !state.value.is_variable() {
                continue;
            }
            match self.entries.get_mut(key) {
                Some(existing) => *existing = existing.merged_with(state, false),
                None => {
                    self.entries.insert(key.clone(), state.clone());
                }
            }
        }
    }

    /// Merge `other` side by side with this map, the two being mutually
    /// exclusive branches whose selection weights sum to 1. A key present on
    /// only one side may be left untouched by the other branch, so it demotes
    /// to partially applied.
    pub fn merge_side_by_side(&mut self, other: &PropertyMap) {
        for (key, state) in self.entries.iter_mut() {
            if !other.entries.contains_key(key) {
                state.partially_applied();
            }
        }
        for (key, state) in other.iter() {
            match self.entries.get_mut(key) {
                Some(existing) => *existing = existing.merged_with(state, false),
                None => {
                    let mut demoted = state.clone();
                    demoted.partially_applied();
                    self.entries.insert(key.clone(), demoted);
                }
            }
        }
    }

    /// Record an additional provenance source on every entry.
    pub fn add_source_all(&mut self, source: super::ModificationSource) {
        for state in self.entries.values_mut() {
            *state = std::mem::take(state).with_source(source.clone());
        }
    }

    /// Demote every entry to partially applied.
    pub fn partially_applied_all(&mut self) {
        for state in self.entries.values_mut() {
            state.partially_applied();
        }
    }

    /// Collapse every entry to variable.
    pub fn force_variable_all(&mut self) {
        for state in self.entries.values_mut() {
            state.force_variable();
        }
    }

    /// The constant the property is guaranteed to hold at runtime, given the
    /// pre-existing scene value it falls back to when untouched. `None` means
    /// the value cannot be known at build time.
    pub fn known_value(&self, key: &PropertyKey, preexisting: f32) -> Option<f32> {
        match self.entries.get(key).map(|s| s.value) {
            None | Some(PropertyValue::Invalid) => Some(preexisting),
            Some(PropertyValue::ConstantAlways(v)) => Some(v),
            Some(PropertyValue::ConstantPartially(v)) => (v == preexisting).then_some(v),
            Some(PropertyValue::Variable) => None,
        }
    }

    /// [`Self::known_value`] for boolean flags animated as 0/1 floats.
    pub fn known_bool(&self, key: &PropertyKey, preexisting: bool) -> Option<bool> {
        self.known_value(key, if preexisting { 1.0 } else { 0.0 })
            .map(|v| v != 0.0)
    }

    /// Take an independent snapshot; later mutation of this map never affects
    /// the snapshot.
    pub fn frozen(&self) -> FrozenPropertyMap {
        FrozenPropertyMap {
            inner: self.clone(),
        }
    }
}

/// Immutable snapshot of a [`PropertyMap`], taken once composition for a scope
/// is finished. Exposes the same read contract.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrozenPropertyMap {
    inner: PropertyMap,
}

impl FrozenPropertyMap {
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn get(&self, key: &PropertyKey) -> Option<&PropertyState> {
        self.inner.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PropertyKey, &PropertyState)> {
        self.inner.iter()
    }

    /// Whether the property is known constant, and if so, what value.
    pub fn constant_value(&self, key: &PropertyKey) -> Option<f32> {
        self.inner.get(key).and_then(|s| s.value.constant_value())
    }

    pub fn known_value(&self, key: &PropertyKey, preexisting: f32) -> Option<f32> {
        self.inner.known_value(key, preexisting)
    }

    pub fn known_bool(&self, key: &PropertyKey, preexisting: bool) -> Option<bool> {
        self.inner.known_bool(key, preexisting)
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Invalid => write!(f, "invalid"),
            PropertyValue::ConstantAlways(v) => write!(f, "always {v}"),
            PropertyValue::ConstantPartially(v) => write!(f, "partially {v}"),
            PropertyValue::Variable => write!(f, "variable"),
        }
    }
}

/// Text rendering for debugging tooling.
impl fmt::Display for FrozenPropertyMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, state) in self.iter() {
            writeln!(
                f,
                "#{} {}: {} ({} sources)",
                key.target.index(),
                key.property,
                state.value,
                state.sources().len()
            )?;
        }
        Ok(())
    }
}
