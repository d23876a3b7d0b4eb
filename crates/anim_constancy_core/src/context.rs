use std::rc::Rc;

use crate::animation_clip::{ClipId, ClipLibrary};
use crate::clip_classifier::ClipAnalysisCache;
use crate::lattice::property_map::PropertyMap;
use crate::scene::{NodeId, Scene};

/// Read-only inputs plus the per-run clip classification cache, threaded
/// through every stage of one analysis. Each run owns its own context, so
/// independent analyses cannot interfere through shared state.
pub struct AnalysisContext<'a> {
    pub scene: &'a Scene,
    pub clips: &'a ClipLibrary,
    pub cache: ClipAnalysisCache,
}

impl<'a> AnalysisContext<'a> {
    pub fn new(scene: &'a Scene, clips: &'a ClipLibrary) -> Self {
        Self {
            scene,
            clips,
            cache: ClipAnalysisCache::new(),
        }
    }

    /// Memoized classification of `clip` relative to `root`.
    pub fn clip_properties(&mut self, root: NodeId, clip: ClipId) -> Rc<PropertyMap> {
        self.cache.clip_properties(self.scene, self.clips, root, clip)
    }
}
