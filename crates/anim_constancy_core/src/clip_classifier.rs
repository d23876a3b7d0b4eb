use std::collections::HashMap;
use std::rc::Rc;

use tracing::debug;

use crate::animation_clip::{ClipId, ClipLibrary, FloatCurve, Keyframe};
use crate::lattice::property_map::{PropertyKey, PropertyMap};
use crate::lattice::{ModificationSource, PropertyState, PropertyValue};
use crate::scene::{NodeId, Scene};

/// Classify a single curve. `None` means the curve has no keyframes and
/// carries no information.
pub fn classify_curve(curve: &FloatCurve) -> Option<PropertyValue> {
    let keyframes = &curve.keyframes;
    match keyframes.len() {
        0 => None,
        1 => Some(PropertyValue::ConstantAlways(keyframes[0].value)),
        _ => {
            let value = keyframes[0].value;
            for pair in keyframes.windows(2) {
                if pair[0].value != pair[1].value || !segment_is_flat(&pair[0], &pair[1]) {
                    return Some(PropertyValue::Variable);
                }
            }
            Some(PropertyValue::ConstantAlways(value))
        }
    }
}

/// Whether a segment between two equal-valued keyframes cannot move off the
/// shared value mid-segment.
fn segment_is_flat(left: &Keyframe, right: &Keyframe) -> bool {
    // Step interpolation holds the left value for the whole segment.
    if left.out_tangent.is_infinite() || right.in_tangent.is_infinite() {
        return true;
    }
    if left.out_tangent == 0.0 && right.in_tangent == 0.0 {
        return true;
    }
    // Weighted tangents with zero weight on the relevant side collapse the
    // curve onto the segment endpoints.
    left.weight_mode.weights_out()
        && left.out_weight == 0.0
        && right.weight_mode.weights_in()
        && right.in_weight == 0.0
}

/// Memoizes clip classification per distinct (root, clip) pair within one
/// analysis run. Clips are frequently reused across states and layers.
///
/// Owned by the top-level analysis call; independent runs never share one.
#[derive(Debug, Default)]
pub struct ClipAnalysisCache {
    entries: HashMap<(NodeId, ClipId), Rc<PropertyMap>>,
}

impl ClipAnalysisCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The property map of `clip` evaluated relative to `root`, classifying
    /// each curve and resolving its binding to a scene node.
    pub fn clip_properties(
        &mut self,
        scene: &Scene,
        clips: &ClipLibrary,
        root: NodeId,
        clip: ClipId,
    ) -> Rc<PropertyMap> {
        if let Some(hit) = self.entries.get(&(root, clip)) {
            return hit.clone();
        }
        let map = Rc::new(evaluate_clip(scene, clips, root, clip));
        self.entries.insert((root, clip), map.clone());
        map
    }
}

fn evaluate_clip(scene: &Scene, clips: &ClipLibrary, root: NodeId, clip_id: ClipId) -> PropertyMap {
    let mut map = PropertyMap::new();
    let Some(clip) = clips.get(clip_id) else {
        debug!(?clip_id, "clip not in library, classifying as no data");
        return map;
    };
    for (binding, curve) in clip.curves() {
        let Some(target) = scene.resolve_path(root, &binding.path) else {
            debug!(
                clip = %clip.name,
                path = %binding.path.to_slashed_string(),
                "curve path does not resolve under evaluation root"
            );
            continue;
        };
        let Some(value) = classify_curve(curve) else {
            continue;
        };
        map.insert(
            PropertyKey::new(target, binding.property.clone()),
            PropertyState::new(value).with_source(ModificationSource::Clip(clip_id)),
        );
    }
    map
}
