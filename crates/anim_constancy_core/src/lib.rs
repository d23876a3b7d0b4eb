//! # Animation Constancy Analysis
//!
//! Given a hierarchical scene of animatable objects and the animation layers
//! attached to it (state machines, blend trees, blended playable layers),
//! this crate computes a conservative classification of every property any
//! layer can touch: a known constant, a constant that only holds part of the
//! time, or a value that must be treated as unpredictable at build time.
//!
//! The classification is the foundation for structural optimizations
//! performed elsewhere (bone merging, mesh merging, blend-shape freezing); a
//! false "known constant" here would corrupt the avatar, so every rule errs
//! on the side of [`PropertyValue::Variable`](lattice::PropertyValue).
//!
//! The analysis never executes the animation system: it never computes the
//! numeric value of a variable property, never simulates time, and never
//! treats runtime controller parameters as known.
//!
//! The top-level entry point is [`aggregator::analyze_avatar`], which walks
//! the scene depth first, folds every animation source into one
//! [`PropertyMap`](lattice::property_map::PropertyMap) and returns a frozen
//! snapshot for downstream consumers.

pub mod aggregator;
pub mod animation_clip;
pub mod blend_tree;
pub mod clip_classifier;
pub mod compositor;
pub mod context;
pub mod controller;
pub mod errors;
pub mod lattice;
pub mod registry;
pub mod scene;
pub mod weight_state;

pub mod prelude {
    use super::*;
    pub use aggregator::{analyze_avatar, Avatar, PlayableLayer};
    pub use animation_clip::{Clip, ClipId, ClipLibrary, CurveBinding, FloatCurve, Keyframe};
    pub use context::AnalysisContext;
    pub use controller::{
        AnimatorController, AnimatorLayer, AnimatorState, BlendTree, BlendTreeKind, ControllerRef,
        LayerBlendKind, Motion, PlayableLayerRole, StateBehavior, StateMachine, WeightTarget,
    };
    pub use errors::{AnalysisError, AnalysisResult};
    pub use lattice::property_map::{FrozenPropertyMap, PropertyKey, PropertyMap};
    pub use lattice::{ModificationSource, PropertyState, PropertyValue};
    pub use registry::ComponentMutationRegistry;
    pub use scene::{ComponentKind, NodeId, NodePath, Scene};
    pub use weight_state::WeightState;
}
