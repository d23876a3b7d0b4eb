use std::collections::HashMap;
use std::rc::Rc;

use crate::animation_clip::ClipId;

use super::{AnimatorController, ControllerRef};

/// An override chain collapsed to its innermost base controller and one
/// single-valued map from original clip identity to the clip actually used at
/// the outermost layer.
#[derive(Clone, Debug)]
pub struct ResolvedController {
    pub controller: Rc<AnimatorController>,
    pub clip_map: HashMap<ClipId, ClipId>,
}

impl ResolvedController {
    /// The clip that plays in place of `clip` once all overrides are applied.
    pub fn effective_clip(&self, clip: ClipId) -> ClipId {
        self.clip_map.get(&clip).copied().unwrap_or(clip)
    }
}

/// Walk an override chain from the outside in, flattening each layer's remap
/// pairs into one map.
///
/// Outer layers take precedence. When folding the next (inner) layer into the
/// already-resolved map, an inner pair `Z -> X` chains through an existing
/// mapping `X -> Y` to produce `Z -> Y`; inner pairs whose source is already
/// mapped are shadowed.
pub fn resolve_controller(reference: &ControllerRef) -> ResolvedController {
    let mut clip_map: HashMap<ClipId, ClipId> = HashMap::new();
    let mut current = reference;
    loop {
        match current {
            ControllerRef::Animator(controller) => {
                return ResolvedController {
                    controller: controller.clone(),
                    clip_map,
                };
            }
            ControllerRef::Overrides(layer) => {
                fold_layer(&mut clip_map, &layer.remaps);
                current = &layer.base;
            }
        }
    }
}

fn fold_layer(clip_map: &mut HashMap<ClipId, ClipId>, remaps: &[(ClipId, Option<ClipId>)]) {
    // Transitive composition against the already-resolved outer map.
    let mut additions: Vec<(ClipId, ClipId)> = Vec::new();
    for (source, target) in remaps {
        let Some(target) = target else { continue };
        if let Some(&outer) = clip_map.get(target)
            && !clip_map.contains_key(source)
        {
            additions.push((*source, outer));
        }
    }
    for (source, target) in additions {
        clip_map.insert(source, target);
    }
    // Then this layer's own pairs, where not already mapped.
    for (source, target) in remaps {
        let Some(target) = target else { continue };
        if !clip_map.contains_key(source) {
            clip_map.insert(*source, *target);
        }
    }
}
