use std::collections::HashMap;

use tracing::debug;

use crate::animation_clip::{ClipId, ClipLibrary};
use crate::compositor::{collect_leaf_states, composite_controller, fold_weighted};
use crate::context::AnalysisContext;
use crate::controller::override_chain::resolve_controller;
use crate::controller::{
    ControllerRef, LayerBlendKind, PlayableLayerRole, StateBehavior, WeightTarget,
};
use crate::errors::AnalysisResult;
use crate::lattice::property_map::{FrozenPropertyMap, PropertyKey, PropertyMap};
use crate::lattice::{ModificationSource, PropertyState};
use crate::registry::ComponentMutationRegistry;
use crate::scene::{ComponentKind, NodeId, Scene, ACTIVE_PROPERTY};
use crate::weight_state::WeightState;

/// Rotation channels of a humanoid bone. External retargeting can move these
/// regardless of what the animation graphs do.
pub const ROTATION_PROPERTIES: [&str; 4] =
    ["rotation.x", "rotation.y", "rotation.z", "rotation.w"];

/// A controller mounted at the avatar descriptor level under a named role.
#[derive(Clone, Debug)]
pub struct PlayableLayer {
    pub role: PlayableLayerRole,
    pub controller: Option<ControllerRef>,
}

/// Everything the whole-avatar analysis consumes. All of it is read-only.
#[derive(Clone, Debug)]
pub struct Avatar {
    pub scene: Scene,
    pub root: NodeId,
    /// Controller local to the rig root, folded first as the base layer.
    pub rig_controller: Option<ControllerRef>,
    /// Clip set local to the rig root; clips are mutually exclusive playback
    /// alternatives.
    pub rig_clips: Vec<ClipId>,
    pub playable_layers: Vec<PlayableLayer>,
    pub humanoid_bones: Vec<NodeId>,
    /// Compatibility flag for avatars authored against the legacy layer
    /// weight behavior.
    pub legacy_layer_weights: bool,
}

impl Avatar {
    pub fn new(scene: Scene, root: NodeId) -> Self {
        Self {
            scene,
            root,
            rig_controller: None,
            rig_clips: Vec::new(),
            playable_layers: Vec::new(),
            humanoid_bones: Vec::new(),
            legacy_layer_weights: false,
        }
    }
}

/// Classify every property any animation source of `avatar` can touch.
///
/// The returned snapshot is the contract surface for downstream structural
/// optimizers: a property missing from it is never animated, and a property
/// with a known constant may be frozen to that value.
pub fn analyze_avatar(
    avatar: &Avatar,
    clips: &ClipLibrary,
    registry: &ComponentMutationRegistry,
) -> AnalysisResult<FrozenPropertyMap> {
    let mut ctx = AnalysisContext::new(&avatar.scene, clips);
    let mut map = PropertyMap::new();

    // Controller and clip set local to the rig root form the always-on base.
    if let Some(reference) = &avatar.rig_controller {
        let base = composite_controller(&mut ctx, avatar.root, reference, None, false)?;
        fold_weighted(&mut map, base, WeightState::AlwaysOne, LayerBlendKind::Override)?;
    }
    if !avatar.rig_clips.is_empty() {
        let base = evaluate_clip_set(&mut ctx, avatar.root, &avatar.rig_clips);
        fold_weighted(&mut map, base, WeightState::AlwaysOne, LayerBlendKind::Override)?;
    }

    walk_node(&mut ctx, registry, &mut map, avatar.root, true)?;

    let facts = collect_playable_weight_facts(avatar);
    for playable in &avatar.playable_layers {
        let Some(reference) = &playable.controller else {
            continue;
        };
        let mut weight = WeightState::from_literal(playable.role.default_weight());
        if let Some(fact) = facts.get(&playable.role) {
            weight = weight.merged(*fact);
        }
        if weight == WeightState::AlwaysZero {
            debug!(role = ?playable.role, "skipping playable layer with weight always zero");
            continue;
        }
        let mut layer_map = composite_controller(
            &mut ctx,
            avatar.root,
            reference,
            Some(playable.role),
            avatar.legacy_layer_weights,
        )?;
        layer_map.add_source_all(ModificationSource::PlayableLayer(playable.role));
        fold_weighted(&mut map, layer_map, weight, playable.role.blend_kind())?;
    }

    for &bone in &avatar.humanoid_bones {
        for property in ROTATION_PROPERTIES {
            map.apply(
                PropertyKey::new(bone, property),
                PropertyState::variable(ModificationSource::HumanoidRig),
                false,
            );
        }
    }

    Ok(map.frozen())
}

/// Depth-first walk folding in every animation-bearing component, gated by the
/// activeness facts already accumulated in `map`.
///
/// A node animated unconditionally inactive kills its whole subtree; a node
/// whose active flag cannot be pinned down drags `always_active` to false for
/// itself and everything below.
fn walk_node(
    ctx: &mut AnalysisContext,
    registry: &ComponentMutationRegistry,
    map: &mut PropertyMap,
    node: NodeId,
    parent_always_active: bool,
) -> AnalysisResult<()> {
    let scene = ctx.scene;
    let active_key = PropertyKey::new(node, ACTIVE_PROPERTY);
    let always_active = match map.known_bool(&active_key, scene.node(node).active) {
        Some(false) => return Ok(()),
        Some(true) => parent_always_active,
        None => false,
    };

    for component in scene.components(node) {
        // Presence-based mutation facts hold regardless of enabled state.
        if let Some(properties) = registry.forced_properties(component.kind.type_name()) {
            for property in properties {
                map.apply(
                    PropertyKey::new(node, property.clone()),
                    PropertyState::variable(ModificationSource::MutationRegistry {
                        component_type: component.kind.type_name().to_owned(),
                    }),
                    false,
                );
            }
        }

        let enabled_key = PropertyKey::new(node, component.enabled_property());
        let component_always = match map.known_bool(&enabled_key, component.enabled) {
            Some(false) => continue,
            Some(true) => always_active,
            None => false,
        };
        let weight = if component_always {
            WeightState::AlwaysOne
        } else {
            WeightState::EitherZeroOrOne
        };

        match &component.kind {
            ComponentKind::Animator {
                controller: Some(reference),
            } => {
                let mut layer_map = composite_controller(ctx, node, reference, None, false)?;
                layer_map.add_source_all(ModificationSource::Component {
                    node,
                    component: component.id,
                });
                fold_weighted(map, layer_map, weight, LayerBlendKind::Override)?;
            }
            ComponentKind::Animator { controller: None } => {}
            ComponentKind::ClipPlayer { clips } => {
                let mut layer_map = evaluate_clip_set(ctx, node, clips);
                layer_map.add_source_all(ModificationSource::Component {
                    node,
                    component: component.id,
                });
                fold_weighted(map, layer_map, weight, LayerBlendKind::Override)?;
            }
            ComponentKind::Other { .. } => {}
        }
    }

    for &child in scene.children(node) {
        walk_node(ctx, registry, map, child, always_active)?;
    }
    Ok(())
}

/// Side-by-side merge of a set of mutually exclusive clips.
fn evaluate_clip_set(ctx: &mut AnalysisContext, root: NodeId, clips: &[ClipId]) -> PropertyMap {
    let mut result: Option<PropertyMap> = None;
    for &clip in clips {
        let clip_map = (*ctx.clip_properties(root, clip)).clone();
        match result.as_mut() {
            Some(accumulated) => accumulated.merge_side_by_side(&clip_map),
            None => result = Some(clip_map),
        }
    }
    result.unwrap_or_default()
}

/// Weight facts per playable role, gathered from weight-control behaviors
/// across every playable layer's controller.
fn collect_playable_weight_facts(avatar: &Avatar) -> HashMap<PlayableLayerRole, WeightState> {
    let mut facts: HashMap<PlayableLayerRole, WeightState> = HashMap::new();
    for playable in &avatar.playable_layers {
        let Some(reference) = &playable.controller else {
            continue;
        };
        let resolved = resolve_controller(reference);
        for layer in &resolved.controller.layers {
            for state in collect_leaf_states(&layer.state_machine) {
                for behavior in &state.behaviors {
                    if let StateBehavior::LayerWeightControl {
                        target: WeightTarget::PlayableLayer(role),
                        goal_weight,
                        blend_duration,
                    } = behavior
                    {
                        let fact = WeightState::from_weight_control(*goal_weight, *blend_duration);
                        facts
                            .entry(*role)
                            .and_modify(|existing| *existing = existing.merged(fact))
                            .or_insert(fact);
                    }
                }
            }
        }
    }
    facts
}
