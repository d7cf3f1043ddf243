//! Scene host boundary
//!
//! Every sound owns one named scene object that carries its world position
//! and is parented under the audio service's root object. The audio layer
//! only needs a handful of operations from the host's scene, captured by
//! [`SceneHost`]. [`SceneGraph`] is a small slot-map backed implementation
//! for hosts without a scene of their own.

use crate::foundation::collections::{Handle, HandleMap};
use crate::foundation::math::Vec3;
use std::cell::RefCell;
use std::rc::Rc;

/// Identifier of an object in a [`SceneHost`]
pub type SceneObjectId = Handle;

/// Scene shared between the service and its sounds
pub type SharedScene = Rc<RefCell<dyn SceneHost>>;

/// Minimal object tree the audio layer parents its sounds into
pub trait SceneHost {
    /// Create a named, unparented object at the origin
    fn instantiate(&mut self, name: &str) -> SceneObjectId;

    /// Attach `object` under `parent`, or detach it with `None`
    ///
    /// The object keeps its local position.
    fn set_parent(&mut self, object: SceneObjectId, parent: Option<SceneObjectId>);

    /// Move `object` so its world position becomes `position`
    fn set_position(&mut self, object: SceneObjectId, position: Vec3);

    /// World position of `object`
    fn world_position(&self, object: SceneObjectId) -> Option<Vec3>;

    /// Name given at instantiation
    fn name(&self, object: SceneObjectId) -> Option<String>;

    /// Destroy `object` and everything parented below it
    ///
    /// Returns `false` when the object no longer exists.
    fn destroy(&mut self, object: SceneObjectId) -> bool;

    /// Whether `object` is still alive
    fn contains(&self, object: SceneObjectId) -> bool;
}

#[derive(Debug, Clone)]
struct SceneNode {
    name: String,
    local_position: Vec3,
    parent: Option<SceneObjectId>,
    children: Vec<SceneObjectId>,
}

/// Slot-map backed object tree
///
/// World position is the sum of local positions along the parent chain.
#[derive(Debug, Default)]
pub struct SceneGraph {
    nodes: HandleMap<SceneNode>,
}

impl SceneGraph {
    /// Create an empty scene
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live objects
    pub fn object_count(&self) -> usize {
        self.nodes.len()
    }

    /// Parent of `object`
    pub fn parent(&self, object: SceneObjectId) -> Option<SceneObjectId> {
        self.nodes.get(object).and_then(|node| node.parent)
    }

    /// Direct children of `object`, in attach order
    pub fn children(&self, object: SceneObjectId) -> &[SceneObjectId] {
        self.nodes.get(object).map_or(&[], |node| node.children.as_slice())
    }

    /// First live object with `name`
    pub fn find_by_name(&self, name: &str) -> Option<SceneObjectId> {
        self.nodes.iter().find(|(_, node)| node.name == name).map(|(id, _)| id)
    }

    fn detach(&mut self, object: SceneObjectId) {
        let Some(parent) = self.nodes.get_mut(object).and_then(|node| node.parent.take()) else {
            return;
        };
        if let Some(parent) = self.nodes.get_mut(parent) {
            parent.children.retain(|child| *child != object);
        }
    }

    fn is_ancestor(&self, candidate: SceneObjectId, object: SceneObjectId) -> bool {
        let mut current = Some(candidate);
        while let Some(id) = current {
            if id == object {
                return true;
            }
            current = self.parent(id);
        }
        false
    }
}

impl SceneHost for SceneGraph {
    fn instantiate(&mut self, name: &str) -> SceneObjectId {
        self.nodes.insert(SceneNode {
            name: name.to_string(),
            local_position: Vec3::zeros(),
            parent: None,
            children: Vec::new(),
        })
    }

    fn set_parent(&mut self, object: SceneObjectId, parent: Option<SceneObjectId>) {
        if !self.nodes.contains_key(object) {
            return;
        }
        if let Some(parent) = parent {
            if !self.nodes.contains_key(parent) || self.is_ancestor(parent, object) {
                log::warn!("Refusing to parent scene object under itself or a missing parent");
                return;
            }
        }

        self.detach(object);
        if let Some(parent) = parent {
            if let Some(node) = self.nodes.get_mut(object) {
                node.parent = Some(parent);
            }
            if let Some(parent_node) = self.nodes.get_mut(parent) {
                parent_node.children.push(object);
            }
        }
    }

    fn set_position(&mut self, object: SceneObjectId, position: Vec3) {
        let parent_world = self
            .parent(object)
            .and_then(|parent| self.world_position(parent))
            .unwrap_or_else(Vec3::zeros);
        if let Some(node) = self.nodes.get_mut(object) {
            node.local_position = position - parent_world;
        }
    }

    fn world_position(&self, object: SceneObjectId) -> Option<Vec3> {
        let node = self.nodes.get(object)?;
        let parent_world = node
            .parent
            .and_then(|parent| self.world_position(parent))
            .unwrap_or_else(Vec3::zeros);
        Some(node.local_position + parent_world)
    }

    fn name(&self, object: SceneObjectId) -> Option<String> {
        self.nodes.get(object).map(|node| node.name.clone())
    }

    fn destroy(&mut self, object: SceneObjectId) -> bool {
        if !self.nodes.contains_key(object) {
            return false;
        }
        self.detach(object);

        let mut pending = vec![object];
        while let Some(id) = pending.pop() {
            if let Some(node) = self.nodes.remove(id) {
                pending.extend(node.children);
            }
        }
        true
    }

    fn contains(&self, object: SceneObjectId) -> bool {
        self.nodes.contains_key(object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_world_position_accumulates_parents() {
        let mut scene = SceneGraph::new();
        let root = scene.instantiate("Audio");
        let child = scene.instantiate("Sound[beep]");

        scene.set_position(root, Vec3::new(10.0, 0.0, 0.0));
        scene.set_parent(child, Some(root));
        scene.set_position(child, Vec3::new(12.0, 3.0, 0.0));

        let world = scene.world_position(child).unwrap();
        assert_relative_eq!(world, Vec3::new(12.0, 3.0, 0.0));
        assert_eq!(scene.parent(child), Some(root));
        assert_eq!(scene.children(root), &[child]);
    }

    #[test]
    fn test_destroy_removes_subtree() {
        let mut scene = SceneGraph::new();
        let root = scene.instantiate("Audio");
        let child = scene.instantiate("child");
        let grandchild = scene.instantiate("grandchild");
        scene.set_parent(child, Some(root));
        scene.set_parent(grandchild, Some(child));

        assert!(scene.destroy(child));
        assert!(!scene.contains(grandchild));
        assert!(scene.children(root).is_empty());
        assert!(!scene.destroy(child));
        assert_eq!(scene.object_count(), 1);
    }

    #[test]
    fn test_cycles_are_rejected() {
        let mut scene = SceneGraph::new();
        let a = scene.instantiate("a");
        let b = scene.instantiate("b");
        scene.set_parent(b, Some(a));
        scene.set_parent(a, Some(b));

        assert_eq!(scene.parent(a), None);
        assert_eq!(scene.parent(b), Some(a));
    }

    #[test]
    fn test_find_by_name() {
        let mut scene = SceneGraph::new();
        let id = scene.instantiate("Sound[sfx/beep]");
        assert_eq!(scene.find_by_name("Sound[sfx/beep]"), Some(id));
        assert_eq!(scene.name(id).as_deref(), Some("Sound[sfx/beep]"));
    }
}
