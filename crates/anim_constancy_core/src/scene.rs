use serde::{Deserialize, Serialize};

use crate::controller::ControllerRef;
use crate::animation_clip::ClipId;

/// Property name under which a node's own-active flag is animated.
pub const ACTIVE_PROPERTY: &str = "active";

/// Index of a node within a [`Scene`] arena.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Identifies a component uniquely within one scene.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct ComponentId(u32);

/// Path to a node relative to some ancestor, with one name per level.
#[derive(Clone, Debug, Hash, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodePath {
    pub parts: Vec<String>,
}

impl NodePath {
    /// Produce a new `NodePath` with the given child name appended to the end.
    pub fn child(&self, child: impl Into<String>) -> Self {
        let mut new_path = self.clone();
        new_path.parts.push(child.into());
        new_path
    }

    pub fn parent(&self) -> Option<Self> {
        let mut parent = self.clone();
        if parent.parts.len() > 1 {
            parent.parts.pop();
            Some(parent)
        } else {
            None
        }
    }

    pub fn last(&self) -> Option<&str> {
        self.parts.last().map(|s| s.as_str())
    }

    /// String representation of the path with '/' as the separator.
    pub fn to_slashed_string(&self) -> String {
        self.parts.join("/")
    }

    pub fn from_slashed_string(path: &str) -> Self {
        Self {
            parts: path.split('/').map(str::to_owned).collect(),
        }
    }
}

impl From<Vec<String>> for NodePath {
    fn from(value: Vec<String>) -> Self {
        Self { parts: value }
    }
}

/// A single animatable object in the hierarchy.
///
/// `active` is the pre-existing scene value of the own-active flag, i.e. the
/// value the flag holds before any animation is applied.
#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: String,
    pub active: bool,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    components: Vec<Component>,
}

#[derive(Debug, Clone)]
pub struct Component {
    pub id: ComponentId,
    /// Pre-existing value of the component's enabled flag.
    pub enabled: bool,
    pub kind: ComponentKind,
}

impl Component {
    /// Property name under which this component's enabled flag is animated.
    pub fn enabled_property(&self) -> String {
        format!("{}.enabled", self.kind.type_name())
    }
}

#[derive(Debug, Clone)]
pub enum ComponentKind {
    /// A rig animator driven by a controller graph.
    Animator { controller: Option<ControllerRef> },
    /// A legacy per-object clip player. Clips are mutually exclusive playback
    /// alternatives.
    ClipPlayer { clips: Vec<ClipId> },
    /// Any other component type. Only visible to the analysis through the
    /// component-mutation registry.
    Other { type_name: String },
}

impl ComponentKind {
    pub fn type_name(&self) -> &str {
        match self {
            ComponentKind::Animator { .. } => "Animator",
            ComponentKind::ClipPlayer { .. } => "ClipPlayer",
            ComponentKind::Other { type_name } => type_name,
        }
    }
}

/// Arena-backed node hierarchy. The analysis only ever reads it.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    nodes: Vec<SceneNode>,
    next_component: u32,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_root(&mut self, name: impl Into<String>, active: bool) -> NodeId {
        self.push_node(name.into(), active, None)
    }

    pub fn add_child(&mut self, parent: NodeId, name: impl Into<String>, active: bool) -> NodeId {
        let id = self.push_node(name.into(), active, Some(parent));
        self.nodes[parent.index()].children.push(id);
        id
    }

    fn push_node(&mut self, name: String, active: bool, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(SceneNode {
            name,
            active,
            parent,
            children: Vec::new(),
            components: Vec::new(),
        });
        id
    }

    pub fn add_component(&mut self, node: NodeId, enabled: bool, kind: ComponentKind) -> ComponentId {
        let id = ComponentId(self.next_component);
        self.next_component += 1;
        self.nodes[node.index()]
            .components
            .push(Component { id, enabled, kind });
        id
    }

    pub fn node(&self, id: NodeId) -> &SceneNode {
        &self.nodes[id.index()]
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.index()].children
    }

    pub fn components(&self, id: NodeId) -> &[Component] {
        &self.nodes[id.index()].components
    }

    pub fn child_by_name(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.nodes[id.index()]
            .children
            .iter()
            .copied()
            .find(|&child| self.nodes[child.index()].name == name)
    }

    /// Resolve a path relative to `root` by walking children by name.
    pub fn resolve_path(&self, root: NodeId, path: &NodePath) -> Option<NodeId> {
        let mut current = root;
        for part in &path.parts {
            current = self.child_by_name(current, part)?;
        }
        Some(current)
    }
}
