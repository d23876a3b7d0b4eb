use std::collections::{HashMap, VecDeque};

use crate::animation_clip::ClipId;
use crate::context::AnalysisContext;
use crate::controller::Motion;
use crate::lattice::property_map::PropertyMap;
use crate::scene::NodeId;

/// Classify a motion node: `None`, a single clip, or an arbitrarily nested
/// blend tree. `clip_map` is the flattened override-chain remap applied to
/// every clip identity before classification.
///
/// Traversal uses an explicit queue rather than recursion, so pathological
/// nesting cannot grow the call stack. The tree is flattened into leaf maps:
/// because the side-by-side merge is commutative and associative per key, the
/// flat fold is equivalent to merging level by level. Leaves under a node that
/// blends with independent weights ("direct" kind) are forced variable, since
/// no constant survives free mixing.
pub fn evaluate_motion(
    ctx: &mut AnalysisContext,
    root: NodeId,
    motion: Option<&Motion>,
    clip_map: &HashMap<ClipId, ClipId>,
) -> PropertyMap {
    let mut leaf_maps: Vec<PropertyMap> = Vec::new();
    let mut queue: VecDeque<(Option<&Motion>, bool)> = VecDeque::new();
    queue.push_back((motion, false));

    while let Some((motion, forced_variable)) = queue.pop_front() {
        match motion {
            // An empty motion slot animates nothing; when it is the selected
            // branch, its siblings' properties keep their pre-existing values.
            None => leaf_maps.push(PropertyMap::new()),
            Some(Motion::Clip(clip)) => {
                let clip = clip_map.get(clip).copied().unwrap_or(*clip);
                let mut map = (*ctx.clip_properties(root, clip)).clone();
                if forced_variable {
                    map.force_variable_all();
                }
                leaf_maps.push(map);
            }
            Some(Motion::BlendTree(tree)) => {
                let forced_variable = forced_variable || !tree.kind.weights_sum_to_one();
                if tree.children.is_empty() {
                    leaf_maps.push(PropertyMap::new());
                    continue;
                }
                for child in &tree.children {
                    queue.push_back((child.as_ref(), forced_variable));
                }
            }
        }
    }

    let mut leaf_maps = leaf_maps.into_iter();
    let Some(mut result) = leaf_maps.next() else {
        return PropertyMap::new();
    };
    for map in leaf_maps {
        result.merge_side_by_side(&map);
    }
    result
}
