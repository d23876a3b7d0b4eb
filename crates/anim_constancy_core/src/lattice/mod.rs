pub mod property_map;

use serde::{Deserialize, Serialize};

use crate::animation_clip::ClipId;
use crate::controller::PlayableLayerRole;
use crate::scene::{ComponentId, NodeId};

/// Where a modification of a property was discovered. Diagnostics only; never
/// affects equality or merge outcome.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModificationSource {
    Clip(ClipId),
    Component { node: NodeId, component: ComponentId },
    PlayableLayer(PlayableLayerRole),
    HumanoidRig,
    MutationRegistry { component_type: String },
}

/// How a single scalar property behaves across every code path that can touch
/// it. Constant payloads only exist on the two constant variants, so a
/// variable-with-value state is unrepresentable.
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub enum PropertyValue {
    /// No information; the property is never touched. Merge identity.
    #[default]
    Invalid,
    /// Every path that touches the property sets exactly this value, and no
    /// path leaves it untouched.
    ConstantAlways(f32),
    /// Every path that touches the property sets exactly this value, but some
    /// path leaves it untouched, so the pre-existing scene value may survive.
    ConstantPartially(f32),
    /// The value may differ across paths or across time.
    Variable,
}

impl PropertyValue {
    /// Models "`applied` is layered after `self`". With `as_new_layer`, a
    /// fully constant override wins outright.
    pub fn merged_with(self, applied: PropertyValue, as_new_layer: bool) -> PropertyValue {
        use PropertyValue::*;
        if as_new_layer && matches!(applied, ConstantAlways(_)) {
            return applied;
        }
        match (self, applied) {
            (Invalid, other) | (other, Invalid) => other,
            (Variable, _) | (_, Variable) => Variable,
            (ConstantAlways(a), ConstantAlways(b)) => {
                if a == b {
                    ConstantAlways(a)
                } else {
                    Variable
                }
            }
            (ConstantAlways(a) | ConstantPartially(a), ConstantAlways(b) | ConstantPartially(b)) => {
                if a == b {
                    ConstantPartially(a)
                } else {
                    Variable
                }
            }
        }
    }

    /// Demote for a path where the property may be left untouched.
    pub fn partially_applied(self) -> PropertyValue {
        match self {
            PropertyValue::ConstantAlways(v) => PropertyValue::ConstantPartially(v),
            other => other,
        }
    }

    /// The value the property is guaranteed to hold, if any.
    pub fn constant_value(self) -> Option<f32> {
        match self {
            PropertyValue::ConstantAlways(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_variable(self) -> bool {
        matches!(self, PropertyValue::Variable)
    }
}

/// A lattice element together with its provenance records.
///
/// `sources` is append-only, duplicates allowed; it is unioned on every merge
/// and ignored by equality.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PropertyState {
    pub value: PropertyValue,
    sources: Vec<ModificationSource>,
}

impl PartialEq for PropertyState {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl PropertyState {
    pub const INVALID: PropertyState = PropertyState {
        value: PropertyValue::Invalid,
        sources: Vec::new(),
    };

    pub fn new(value: PropertyValue) -> Self {
        Self {
            value,
            sources: Vec::new(),
        }
    }

    pub fn variable(source: ModificationSource) -> Self {
        Self::new(PropertyValue::Variable).with_source(source)
    }

    pub fn constant_always(value: f32, source: ModificationSource) -> Self {
        Self::new(PropertyValue::ConstantAlways(value)).with_source(source)
    }

    pub fn with_source(mut self, source: ModificationSource) -> Self {
        self.sources.push(source);
        self
    }

    pub fn sources(&self) -> &[ModificationSource] {
        &self.sources
    }

    /// Lattice merge; the result's provenance is the union of both operands'
    /// sources.
    pub fn merged_with(&self, applied: &PropertyState, as_new_layer: bool) -> PropertyState {
        let mut sources = self.sources.clone();
        sources.extend(applied.sources.iter().cloned());
        PropertyState {
            value: self.value.merged_with(applied.value, as_new_layer),
            sources,
        }
    }

    /// Demote to "may be left untouched", preserving provenance.
    pub fn partially_applied(&mut self) {
        self.value = self.value.partially_applied();
    }

    /// Collapse to [`PropertyValue::Variable`], preserving provenance.
    pub fn force_variable(&mut self) {
        self.value = PropertyValue::Variable;
    }
}
