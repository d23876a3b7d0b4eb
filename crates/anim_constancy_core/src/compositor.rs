use std::collections::{HashMap, VecDeque};

use tracing::debug;

use crate::animation_clip::ClipId;
use crate::blend_tree::evaluate_motion;
use crate::context::AnalysisContext;
use crate::controller::override_chain::resolve_controller;
use crate::controller::{
    AnimatorController, AnimatorState, ControllerRef, LayerBlendKind, PlayableLayerRole,
    StateBehavior, StateMachine, WeightTarget,
};
use crate::errors::{AnalysisError, AnalysisResult};
use crate::lattice::property_map::PropertyMap;
use crate::scene::NodeId;
use crate::weight_state::WeightState;

/// Flatten a state graph and all nested sub-graphs into its leaf states,
/// breadth first.
pub fn collect_leaf_states(machine: &StateMachine) -> Vec<&AnimatorState> {
    let mut states = Vec::new();
    let mut queue: VecDeque<&StateMachine> = VecDeque::new();
    queue.push_back(machine);
    while let Some(machine) = queue.pop_front() {
        states.extend(machine.states.iter());
        queue.extend(machine.sub_machines.iter());
    }
    states
}

/// Apply a resolved layer weight to the layer's property map.
///
/// `AlwaysZero` layers must have been skipped before this point and
/// `NotChanged` never survives weight resolution; either reaching this stage
/// is an internal-consistency error.
pub fn apply_weight(mut map: PropertyMap, weight: WeightState) -> AnalysisResult<PropertyMap> {
    match weight {
        WeightState::AlwaysOne => Ok(map),
        WeightState::EitherZeroOrOne => {
            map.partially_applied_all();
            Ok(map)
        }
        WeightState::Variable => {
            map.force_variable_all();
            Ok(map)
        }
        WeightState::AlwaysZero | WeightState::NotChanged => {
            Err(AnalysisError::UnresolvedLayerWeight(weight))
        }
    }
}

/// Weight a layer's map and fold it into the accumulated map with the layer's
/// blend kind.
pub fn fold_weighted(
    accumulated: &mut PropertyMap,
    layer_map: PropertyMap,
    weight: WeightState,
    blend_kind: LayerBlendKind,
) -> AnalysisResult<()> {
    let weighted = apply_weight(layer_map, weight)?;
    match blend_kind {
        LayerBlendKind::Override => accumulated.apply_override(&weighted),
        LayerBlendKind::Additive => accumulated.apply_additive(&weighted),
    }
    Ok(())
}

/// Classify a full controller graph mounted at `root`.
///
/// `role` is the playable layer the controller is mounted under, if any; only
/// weight-control behaviors targeting that role can drive this controller's
/// per-layer weights. With `legacy_layer_weights`, layers 1 and 2 of the
/// gesture and FX roles are clamped to `EitherZeroOrOne`.
pub fn composite_controller(
    ctx: &mut AnalysisContext,
    root: NodeId,
    reference: &ControllerRef,
    role: Option<PlayableLayerRole>,
    legacy_layer_weights: bool,
) -> AnalysisResult<PropertyMap> {
    let resolved = resolve_controller(reference);
    let controller = resolved.controller.as_ref();
    let facts = collect_layer_weight_facts(controller, role);

    let mut accumulated = PropertyMap::new();
    for (index, layer) in controller.layers.iter().enumerate() {
        let mut weight = if index == 0 {
            WeightState::AlwaysOne
        } else {
            let mut weight = WeightState::from_literal(layer.default_weight);
            if let Some(fact) = facts.get(&index) {
                weight = weight.merged(*fact);
            }
            weight
        };
        if legacy_layer_weights
            && matches!(role, Some(PlayableLayerRole::Gesture | PlayableLayerRole::Fx))
            && (1..=2).contains(&index)
        {
            weight = WeightState::EitherZeroOrOne;
        }
        if weight == WeightState::AlwaysZero {
            debug!(layer = %layer.name, "skipping layer with weight always zero");
            continue;
        }
        let layer_map = evaluate_layer(ctx, root, controller, index, &resolved.clip_map)?;
        fold_weighted(&mut accumulated, layer_map, weight, layer.blend_kind)?;
    }
    Ok(accumulated)
}

/// Weight facts per layer index, gathered from weight-control behaviors on
/// every state of every layer of the controller.
fn collect_layer_weight_facts(
    controller: &AnimatorController,
    role: Option<PlayableLayerRole>,
) -> HashMap<usize, WeightState> {
    let mut facts: HashMap<usize, WeightState> = HashMap::new();
    let Some(role) = role else {
        return facts;
    };
    for layer in &controller.layers {
        for state in collect_leaf_states(&layer.state_machine) {
            for behavior in &state.behaviors {
                match behavior {
                    StateBehavior::LayerWeightControl {
                        target: WeightTarget::ControllerLayer { playable, index },
                        goal_weight,
                        blend_duration,
                    } if *playable == role => {
                        let fact = WeightState::from_weight_control(*goal_weight, *blend_duration);
                        facts
                            .entry(*index)
                            .and_modify(|existing| *existing = existing.merged(fact))
                            .or_insert(fact);
                    }
                    StateBehavior::LayerWeightControl { .. } => {}
                    StateBehavior::ParameterDrive { .. } => {}
                }
            }
        }
    }
    facts
}

/// Classify one layer: side-by-side merge of every leaf state's motion, since
/// only one state can be live at a time.
///
/// A synced layer defers to the target layer's state graph, substituting its
/// own per-state motion overrides.
fn evaluate_layer(
    ctx: &mut AnalysisContext,
    root: NodeId,
    controller: &AnimatorController,
    index: usize,
    clip_map: &HashMap<ClipId, ClipId>,
) -> AnalysisResult<PropertyMap> {
    let layer = &controller.layers[index];
    let (machine, overrides) = match layer.sync_layer {
        Some(target) => {
            let target_layer = controller.layers.get(target).ok_or(
                AnalysisError::SyncedLayerOutOfBounds {
                    layer: index,
                    target,
                },
            )?;
            (&target_layer.state_machine, Some(&layer.motion_overrides))
        }
        None => (&layer.state_machine, None),
    };

    let mut result: Option<PropertyMap> = None;
    for state in collect_leaf_states(machine) {
        let motion = overrides
            .and_then(|overrides| overrides.get(&state.name))
            .or(state.motion.as_ref());
        let state_map = evaluate_motion(ctx, root, motion, clip_map);
        match result.as_mut() {
            Some(accumulated) => accumulated.merge_side_by_side(&state_map),
            None => result = Some(state_map),
        }
    }
    Ok(result.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation_clip::{Clip, ClipLibrary, CurveBinding, FloatCurve, Keyframe};
    use crate::controller::{AnimatorLayer, Motion};
    use crate::lattice::property_map::PropertyKey;
    use crate::lattice::PropertyValue;
    use crate::scene::Scene;

    struct Fixture {
        scene: Scene,
        clips: ClipLibrary,
        root: NodeId,
    }

    impl Fixture {
        fn new() -> Self {
            let mut scene = Scene::new();
            let root = scene.add_root("root", true);
            Self {
                scene,
                clips: ClipLibrary::new(),
                root,
            }
        }

        fn add_constant_clip(&mut self, name: &str, property: &str, value: f32) -> ClipId {
            self.clips.add(
                Clip::new(name)
                    .with_curve(CurveBinding::at_root(property), FloatCurve::constant(value)),
            )
        }

        fn add_variable_clip(&mut self, name: &str, property: &str) -> ClipId {
            self.clips.add(Clip::new(name).with_curve(
                CurveBinding::at_root(property),
                FloatCurve::from_keyframes([Keyframe::new(0.0, 0.0), Keyframe::new(1.0, 1.0)]),
            ))
        }

        fn composite(
            &mut self,
            controller: AnimatorController,
            role: Option<PlayableLayerRole>,
            legacy: bool,
        ) -> AnalysisResult<PropertyMap> {
            let mut ctx = AnalysisContext::new(&self.scene, &self.clips);
            composite_controller(
                &mut ctx,
                self.root,
                &ControllerRef::plain(controller),
                role,
                legacy,
            )
        }

        fn key(&self, property: &str) -> PropertyKey {
            PropertyKey::new(self.root, property)
        }
    }

    fn single_state_layer(name: &str, weight: f32, clip: ClipId) -> AnimatorLayer {
        AnimatorLayer::new(
            name,
            weight,
            StateMachine::of_states([AnimatorState::clip("state", clip)]),
        )
    }

    #[test]
    fn zero_weight_layer_is_entirely_absent() {
        let mut fixture = Fixture::new();
        let base = fixture.add_constant_clip("base", "smile", 1.0);
        let dead = fixture.add_constant_clip("dead", "frown", 1.0);
        let controller = AnimatorController::new(
            "fx",
            [
                single_state_layer("base", 1.0, base),
                single_state_layer("dead", 0.0, dead),
            ],
        );
        let map = fixture.composite(controller, None, false).unwrap();
        assert!(map.get(&fixture.key("frown")).is_none());
        assert_eq!(
            map.get(&fixture.key("smile")).unwrap().value,
            PropertyValue::ConstantAlways(1.0)
        );
    }

    #[test]
    fn layer_zero_ignores_its_default_weight() {
        let mut fixture = Fixture::new();
        let base = fixture.add_constant_clip("base", "smile", 1.0);
        let controller =
            AnimatorController::new("fx", [single_state_layer("base", 0.0, base)]);
        let map = fixture.composite(controller, None, false).unwrap();
        assert_eq!(
            map.get(&fixture.key("smile")).unwrap().value,
            PropertyValue::ConstantAlways(1.0)
        );
    }

    #[test]
    fn fractional_layer_weight_forces_variable() {
        let mut fixture = Fixture::new();
        let base = fixture.add_constant_clip("base", "smile", 1.0);
        let half = fixture.add_constant_clip("half", "frown", 1.0);
        let controller = AnimatorController::new(
            "fx",
            [
                single_state_layer("base", 1.0, base),
                single_state_layer("half", 0.5, half),
            ],
        );
        let map = fixture.composite(controller, None, false).unwrap();
        assert_eq!(
            map.get(&fixture.key("frown")).unwrap().value,
            PropertyValue::Variable
        );
    }

    #[test]
    fn override_layer_constant_wins_over_variable_base() {
        let mut fixture = Fixture::new();
        let base = fixture.add_variable_clip("base", "smile");
        let top = fixture.add_constant_clip("top", "smile", 1.0);
        let controller = AnimatorController::new(
            "fx",
            [
                single_state_layer("base", 1.0, base),
                single_state_layer("top", 1.0, top),
            ],
        );
        let map = fixture.composite(controller, None, false).unwrap();
        assert_eq!(
            map.get(&fixture.key("smile")).unwrap().value,
            PropertyValue::ConstantAlways(1.0)
        );
    }

    #[test]
    fn additive_layer_forces_variable_and_drops_constants() {
        let mut fixture = Fixture::new();
        let base = fixture.add_constant_clip("base", "smile", 1.0);
        let mut additive_clip = Clip::new("wiggle");
        additive_clip.add_curve(
            CurveBinding::at_root("smile"),
            FloatCurve::from_keyframes([Keyframe::new(0.0, 0.0), Keyframe::new(1.0, 1.0)]),
        );
        additive_clip.add_curve(CurveBinding::at_root("frown"), FloatCurve::constant(0.5));
        let additive = fixture.clips.add(additive_clip);
        let controller = AnimatorController::new(
            "fx",
            [
                single_state_layer("base", 1.0, base),
                single_state_layer("add", 1.0, additive).additive(),
            ],
        );
        let map = fixture.composite(controller, None, false).unwrap();
        assert_eq!(
            map.get(&fixture.key("smile")).unwrap().value,
            PropertyValue::Variable
        );
        // The constant additive delta contributes nothing classifiable.
        assert!(map.get(&fixture.key("frown")).is_none());
    }

    #[test]
    fn multiple_states_merge_side_by_side() {
        let mut fixture = Fixture::new();
        let a = fixture.add_constant_clip("a", "smile", 1.0);
        let b = fixture.add_constant_clip("b", "frown", 1.0);
        let layer = AnimatorLayer::new(
            "base",
            1.0,
            StateMachine::of_states([
                AnimatorState::clip("a", a),
                AnimatorState::clip("b", b),
            ]),
        );
        let controller = AnimatorController::new("fx", [layer]);
        let map = fixture.composite(controller, None, false).unwrap();
        assert_eq!(
            map.get(&fixture.key("smile")).unwrap().value,
            PropertyValue::ConstantPartially(1.0)
        );
    }

    #[test]
    fn nested_sub_machines_are_expanded() {
        let mut fixture = Fixture::new();
        let a = fixture.add_constant_clip("a", "smile", 1.0);
        let b = fixture.add_constant_clip("b", "smile", 1.0);
        let machine = StateMachine {
            states: vec![AnimatorState::clip("a", a)],
            sub_machines: vec![StateMachine {
                states: vec![],
                sub_machines: vec![StateMachine::of_states([AnimatorState::clip("b", b)])],
            }],
        };
        let controller =
            AnimatorController::new("fx", [AnimatorLayer::new("base", 1.0, machine)]);
        let map = fixture.composite(controller, None, false).unwrap();
        assert_eq!(
            map.get(&fixture.key("smile")).unwrap().value,
            PropertyValue::ConstantAlways(1.0)
        );
    }

    #[test]
    fn weight_control_behavior_demotes_targeted_layer() {
        let mut fixture = Fixture::new();
        let base = fixture.add_constant_clip("base", "smile", 1.0);
        let controlled = fixture.add_constant_clip("controlled", "frown", 1.0);
        let base_layer = AnimatorLayer::new(
            "base",
            1.0,
            StateMachine::of_states([AnimatorState::clip("state", base).with_behavior(
                StateBehavior::LayerWeightControl {
                    target: WeightTarget::ControllerLayer {
                        playable: PlayableLayerRole::Fx,
                        index: 1,
                    },
                    goal_weight: 0.0,
                    blend_duration: 0.0,
                },
            )]),
        );
        let controller = AnimatorController::new(
            "fx",
            [base_layer, single_state_layer("controlled", 1.0, controlled)],
        );

        // Default AlwaysOne merged with the AlwaysZero goal gives EitherZeroOrOne.
        let map = fixture
            .composite(controller.clone(), Some(PlayableLayerRole::Fx), false)
            .unwrap();
        assert_eq!(
            map.get(&fixture.key("frown")).unwrap().value,
            PropertyValue::ConstantPartially(1.0)
        );

        // Behaviors only bind when the controller is mounted under their role.
        let map = fixture.composite(controller, None, false).unwrap();
        assert_eq!(
            map.get(&fixture.key("frown")).unwrap().value,
            PropertyValue::ConstantAlways(1.0)
        );
    }

    #[test]
    fn timed_weight_control_makes_layer_variable() {
        let mut fixture = Fixture::new();
        let base = fixture.add_constant_clip("base", "smile", 1.0);
        let controlled = fixture.add_constant_clip("controlled", "frown", 1.0);
        let base_layer = AnimatorLayer::new(
            "base",
            1.0,
            StateMachine::of_states([AnimatorState::clip("state", base).with_behavior(
                StateBehavior::LayerWeightControl {
                    target: WeightTarget::ControllerLayer {
                        playable: PlayableLayerRole::Gesture,
                        index: 1,
                    },
                    goal_weight: 1.0,
                    blend_duration: 0.5,
                },
            )]),
        );
        let controller = AnimatorController::new(
            "gesture",
            [base_layer, single_state_layer("controlled", 1.0, controlled)],
        );
        let map = fixture
            .composite(controller, Some(PlayableLayerRole::Gesture), false)
            .unwrap();
        assert_eq!(
            map.get(&fixture.key("frown")).unwrap().value,
            PropertyValue::Variable
        );
    }

    #[test]
    fn legacy_clamp_demotes_first_two_overlay_layers() {
        let mut fixture = Fixture::new();
        let base = fixture.add_constant_clip("base", "smile", 1.0);
        let one = fixture.add_constant_clip("one", "frown", 1.0);
        let two = fixture.add_constant_clip("two", "wink", 1.0);
        let three = fixture.add_constant_clip("three", "blink", 1.0);
        let controller = AnimatorController::new(
            "gesture",
            [
                single_state_layer("base", 1.0, base),
                single_state_layer("one", 1.0, one),
                single_state_layer("two", 1.0, two),
                single_state_layer("three", 1.0, three),
            ],
        );
        let map = fixture
            .composite(controller.clone(), Some(PlayableLayerRole::Gesture), true)
            .unwrap();
        assert_eq!(
            map.get(&fixture.key("smile")).unwrap().value,
            PropertyValue::ConstantAlways(1.0)
        );
        assert_eq!(
            map.get(&fixture.key("frown")).unwrap().value,
            PropertyValue::ConstantPartially(1.0)
        );
        assert_eq!(
            map.get(&fixture.key("wink")).unwrap().value,
            PropertyValue::ConstantPartially(1.0)
        );
        assert_eq!(
            map.get(&fixture.key("blink")).unwrap().value,
            PropertyValue::ConstantAlways(1.0)
        );

        // The clamp only exists for the legacy compatibility flag.
        let map = fixture
            .composite(controller, Some(PlayableLayerRole::Gesture), false)
            .unwrap();
        assert_eq!(
            map.get(&fixture.key("frown")).unwrap().value,
            PropertyValue::ConstantAlways(1.0)
        );
    }

    #[test]
    fn synced_layer_substitutes_motion_overrides() {
        let mut fixture = Fixture::new();
        let a = fixture.add_constant_clip("a", "smile", 1.0);
        let b = fixture.add_constant_clip("b", "frown", 1.0);
        let replacement = fixture.add_constant_clip("replacement", "wink", 1.0);

        let target_layer = AnimatorLayer::new(
            "target",
            1.0,
            StateMachine::of_states([
                AnimatorState::clip("a", a),
                AnimatorState::clip("b", b),
            ]),
        );
        let mut synced = AnimatorLayer::new("synced", 1.0, StateMachine::default()).synced_to(0);
        synced
            .motion_overrides
            .insert("a".into(), Motion::Clip(replacement));
        let controller = AnimatorController::new("fx", [target_layer, synced]);
        let map = fixture.composite(controller, None, false).unwrap();

        // State "a" plays the replacement; state "b" falls back to the
        // target's motion, so the synced layer re-demotes both.
        assert_eq!(
            map.get(&fixture.key("wink")).unwrap().value,
            PropertyValue::ConstantPartially(1.0)
        );
        assert_eq!(
            map.get(&fixture.key("frown")).unwrap().value,
            PropertyValue::ConstantPartially(1.0)
        );
    }

    #[test]
    fn synced_layer_out_of_bounds_is_fatal() {
        let mut fixture = Fixture::new();
        let layer = AnimatorLayer::new("synced", 1.0, StateMachine::default()).synced_to(7);
        let controller = AnimatorController::new("fx", [layer]);
        assert_eq!(
            fixture.composite(controller, None, false).unwrap_err(),
            AnalysisError::SyncedLayerOutOfBounds { layer: 0, target: 7 }
        );
    }
}
