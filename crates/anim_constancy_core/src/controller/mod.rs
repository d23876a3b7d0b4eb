pub mod override_chain;

use std::collections::HashMap;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::animation_clip::ClipId;

/// The named playable layers an avatar mounts at the descriptor level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PlayableLayerRole {
    Base,
    Additive,
    Gesture,
    Action,
    Fx,
}

impl PlayableLayerRole {
    pub const ALL: [PlayableLayerRole; 5] = [
        PlayableLayerRole::Base,
        PlayableLayerRole::Additive,
        PlayableLayerRole::Gesture,
        PlayableLayerRole::Action,
        PlayableLayerRole::Fx,
    ];

    /// Weight the role holds before any weight control runs.
    pub fn default_weight(self) -> f32 {
        match self {
            PlayableLayerRole::Action => 0.0,
            _ => 1.0,
        }
    }

    /// How the role's map folds into the running avatar map.
    pub fn blend_kind(self) -> LayerBlendKind {
        match self {
            PlayableLayerRole::Additive => LayerBlendKind::Additive,
            _ => LayerBlendKind::Override,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LayerBlendKind {
    #[default]
    Override,
    Additive,
}

/// How a blend node mixes its children.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BlendTreeKind {
    #[default]
    Simple1D,
    SimpleDirectional2D,
    FreeformDirectional2D,
    FreeformCartesian2D,
    /// Per-child weights are independent parameters and can sum to anything.
    Direct,
}

impl BlendTreeKind {
    /// Whether the children's blend weights are guaranteed to sum to exactly 1
    /// at all times.
    pub fn weights_sum_to_one(self) -> bool {
        !matches!(self, BlendTreeKind::Direct)
    }
}

#[derive(Clone, Debug)]
pub enum Motion {
    Clip(ClipId),
    BlendTree(BlendTree),
}

/// A blend node. A `None` child is an empty motion slot: when that child is
/// selected nothing is animated.
#[derive(Clone, Debug, Default)]
pub struct BlendTree {
    pub kind: BlendTreeKind,
    pub children: Vec<Option<Motion>>,
}

impl BlendTree {
    pub fn new(kind: BlendTreeKind, children: impl IntoIterator<Item = Option<Motion>>) -> Self {
        Self {
            kind,
            children: children.into_iter().collect(),
        }
    }

    pub fn of_clips(kind: BlendTreeKind, clips: impl IntoIterator<Item = ClipId>) -> Self {
        Self {
            kind,
            children: clips.into_iter().map(|c| Some(Motion::Clip(c))).collect(),
        }
    }
}

/// Which blend weight a [`StateBehavior::LayerWeightControl`] drives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeightTarget {
    /// A single layer of the controller mounted under the given playable role.
    ControllerLayer {
        playable: PlayableLayerRole,
        index: usize,
    },
    /// The whole weight of a playable layer.
    PlayableLayer(PlayableLayerRole),
}

/// Behaviors attached to a state. A closed set: anything the analysis does not
/// understand must grow a new variant rather than pass through unmatched.
#[derive(Clone, Debug)]
pub enum StateBehavior {
    /// Drives a blend weight towards `goal_weight` over `blend_duration`
    /// seconds when the state is entered.
    LayerWeightControl {
        target: WeightTarget,
        goal_weight: f32,
        blend_duration: f32,
    },
    /// Writes a controller parameter. Parameters are runtime input and carry
    /// no constancy information.
    ParameterDrive { parameter: String },
}

/// A leaf state carrying a motion. `motion: None` animates nothing.
#[derive(Clone, Debug, Default)]
pub struct AnimatorState {
    pub name: String,
    pub motion: Option<Motion>,
    pub behaviors: Vec<StateBehavior>,
}

impl AnimatorState {
    pub fn new(name: impl Into<String>, motion: Option<Motion>) -> Self {
        Self {
            name: name.into(),
            motion,
            behaviors: Vec::new(),
        }
    }

    pub fn clip(name: impl Into<String>, clip: ClipId) -> Self {
        Self::new(name, Some(Motion::Clip(clip)))
    }

    pub fn with_behavior(mut self, behavior: StateBehavior) -> Self {
        self.behaviors.push(behavior);
        self
    }
}

/// A state graph with arbitrarily nested sub-graphs.
#[derive(Clone, Debug, Default)]
pub struct StateMachine {
    pub states: Vec<AnimatorState>,
    pub sub_machines: Vec<StateMachine>,
}

impl StateMachine {
    pub fn of_states(states: impl IntoIterator<Item = AnimatorState>) -> Self {
        Self {
            states: states.into_iter().collect(),
            sub_machines: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct AnimatorLayer {
    pub name: String,
    pub default_weight: f32,
    pub blend_kind: LayerBlendKind,
    /// When set, this layer has no graph of its own: it mirrors the target
    /// layer's state graph and substitutes `motion_overrides` per state name.
    pub sync_layer: Option<usize>,
    pub state_machine: StateMachine,
    pub motion_overrides: HashMap<String, Motion>,
}

impl AnimatorLayer {
    pub fn new(name: impl Into<String>, default_weight: f32, state_machine: StateMachine) -> Self {
        Self {
            name: name.into(),
            default_weight,
            blend_kind: LayerBlendKind::Override,
            sync_layer: None,
            state_machine,
            motion_overrides: HashMap::new(),
        }
    }

    pub fn additive(mut self) -> Self {
        self.blend_kind = LayerBlendKind::Additive;
        self
    }

    pub fn synced_to(mut self, target: usize) -> Self {
        self.sync_layer = Some(target);
        self
    }
}

#[derive(Clone, Debug, Default)]
pub struct AnimatorController {
    pub name: String,
    pub layers: Vec<AnimatorLayer>,
}

impl AnimatorController {
    pub fn new(name: impl Into<String>, layers: impl IntoIterator<Item = AnimatorLayer>) -> Self {
        Self {
            name: name.into(),
            layers: layers.into_iter().collect(),
        }
    }
}

/// A controller reference: either a plain controller or a chain of override
/// wrappers, each remapping clips over an inner controller.
#[derive(Clone, Debug)]
pub enum ControllerRef {
    Animator(Rc<AnimatorController>),
    Overrides(Rc<OverrideLayer>),
}

impl ControllerRef {
    pub fn plain(controller: AnimatorController) -> Self {
        ControllerRef::Animator(Rc::new(controller))
    }

    pub fn overridden(
        base: ControllerRef,
        remaps: impl IntoIterator<Item = (ClipId, Option<ClipId>)>,
    ) -> Self {
        ControllerRef::Overrides(Rc::new(OverrideLayer {
            base,
            remaps: remaps.into_iter().collect(),
        }))
    }
}

/// One link in an override chain. A `None` remap target clears the clip and is
/// dropped during resolution.
#[derive(Clone, Debug)]
pub struct OverrideLayer {
    pub base: ControllerRef,
    pub remaps: Vec<(ClipId, Option<ClipId>)>,
}
