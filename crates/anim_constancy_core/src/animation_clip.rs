use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::scene::NodePath;

/// Identity of an animation clip, stable across controllers and layers.
#[derive(Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct ClipId(Uuid);

impl Hash for ClipId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let (hi, lo) = self.0.as_u64_pair();
        state.write_u64(hi ^ lo);
    }
}

impl ClipId {
    /// Derive a stable id from a clip name.
    pub fn from_name(name: &str) -> Self {
        Self(Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()))
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

/// Which sides of a keyframe use its explicit tangent weights.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TangentWeightMode {
    #[default]
    None,
    In,
    Out,
    Both,
}

impl TangentWeightMode {
    pub fn weights_in(self) -> bool {
        matches!(self, TangentWeightMode::In | TangentWeightMode::Both)
    }

    pub fn weights_out(self) -> bool {
        matches!(self, TangentWeightMode::Out | TangentWeightMode::Both)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    pub time: f32,
    pub value: f32,
    pub in_tangent: f32,
    pub out_tangent: f32,
    pub in_weight: f32,
    pub out_weight: f32,
    pub weight_mode: TangentWeightMode,
}

impl Keyframe {
    pub fn new(time: f32, value: f32) -> Self {
        Self {
            time,
            value,
            in_tangent: 0.0,
            out_tangent: 0.0,
            in_weight: 1.0 / 3.0,
            out_weight: 1.0 / 3.0,
            weight_mode: TangentWeightMode::None,
        }
    }

    pub fn with_tangents(mut self, in_tangent: f32, out_tangent: f32) -> Self {
        self.in_tangent = in_tangent;
        self.out_tangent = out_tangent;
        self
    }

    pub fn with_weights(mut self, mode: TangentWeightMode, in_weight: f32, out_weight: f32) -> Self {
        self.weight_mode = mode;
        self.in_weight = in_weight;
        self.out_weight = out_weight;
        self
    }
}

/// A single scalar curve, keyframes ordered by time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FloatCurve {
    pub keyframes: Vec<Keyframe>,
}

impl FloatCurve {
    pub fn from_keyframes(keyframes: impl IntoIterator<Item = Keyframe>) -> Self {
        Self {
            keyframes: keyframes.into_iter().collect(),
        }
    }

    /// Single-keyframe curve pinning the property to `value`.
    pub fn constant(value: f32) -> Self {
        Self {
            keyframes: vec![Keyframe::new(0.0, value)],
        }
    }
}

/// Where a curve lands: a node (by path relative to the evaluation root) and a
/// property name on that node.
#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurveBinding {
    pub path: NodePath,
    pub property: String,
}

impl CurveBinding {
    pub fn new(path: impl Into<NodePath>, property: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            property: property.into(),
        }
    }

    pub fn at_root(property: impl Into<String>) -> Self {
        Self {
            path: NodePath::default(),
            property: property.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Clip {
    pub name: String,
    curves: IndexMap<CurveBinding, FloatCurve>,
}

impl Clip {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            curves: IndexMap::new(),
        }
    }

    pub fn add_curve(&mut self, binding: CurveBinding, curve: FloatCurve) {
        self.curves.insert(binding, curve);
    }

    pub fn with_curve(mut self, binding: CurveBinding, curve: FloatCurve) -> Self {
        self.add_curve(binding, curve);
        self
    }

    pub fn curves(&self) -> impl Iterator<Item = (&CurveBinding, &FloatCurve)> {
        self.curves.iter()
    }
}

/// Clip lookup by id. A missing id classifies as "no data", not an error.
#[derive(Debug, Clone, Default)]
pub struct ClipLibrary {
    clips: HashMap<ClipId, Clip>,
}

impl ClipLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a clip under the id derived from its name.
    pub fn add(&mut self, clip: Clip) -> ClipId {
        let id = ClipId::from_name(&clip.name);
        self.clips.insert(id, clip);
        id
    }

    pub fn insert(&mut self, id: ClipId, clip: Clip) {
        self.clips.insert(id, clip);
    }

    pub fn get(&self, id: ClipId) -> Option<&Clip> {
        self.clips.get(&id)
    }
}
