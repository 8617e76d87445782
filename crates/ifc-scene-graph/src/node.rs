// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scene nodes, their components, and the arena that owns them
//!
//! Nodes live in a [`SceneGraph`] arena addressed by generational
//! [`NodeKey`]s. A parent owns its children: removing a node drops its
//! whole subtree, and stale keys simply stop resolving.

use crate::{Error, Material, MaterialKind, RenderBuffer, Result};
use ifc_scene_model::GlobalId;
use nalgebra::{UnitQuaternion, Vector3};
use rustc_hash::FxHashMap;
use slotmap::{new_key_type, SlotMap};
use std::collections::BTreeMap;
use std::f32::consts::FRAC_PI_2;
use std::fmt;
use std::sync::Arc;

new_key_type! {
    /// Key for a node in a [`SceneGraph`]
    pub struct NodeKey;
}

/// Well-known tag names
pub mod tags {
    /// Toggle-able product (as opposed to a pure grouping node)
    pub const IS_PRODUCT: &str = "IsProduct";
    /// Hosts a translucent mesh and binds the transparent material
    pub const IS_TRANSPARENT: &str = "IsTransparent";
    /// Hosts an edge buffer
    pub const IS_WIREFRAME: &str = "IsWireframe";
    /// Stable identity used by the selection protocol
    pub const GLOBAL_ID: &str = "GlobalId";
    pub const CLASS: &str = "Class";
    pub const NAME: &str = "Name";
    /// Source file of a file node
    pub const PATH: &str = "Path";
}

/// Tag payload
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TagValue {
    Bool(bool),
    Text(String),
}

impl TagValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            TagValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            TagValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for TagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagValue::Bool(b) => write!(f, "{}", b),
            TagValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<bool> for TagValue {
    fn from(b: bool) -> Self {
        TagValue::Bool(b)
    }
}

impl From<&str> for TagValue {
    fn from(s: &str) -> Self {
        TagValue::Text(s.to_string())
    }
}

impl From<String> for TagValue {
    fn from(s: String) -> Self {
        TagValue::Text(s)
    }
}

/// Named rigid transform
#[derive(Clone, Debug, PartialEq)]
pub struct Transform {
    pub name: String,
    pub rotation: UnitQuaternion<f32>,
    pub translation: Vector3<f32>,
}

impl Transform {
    pub fn identity() -> Self {
        Self {
            name: "Identity".to_string(),
            rotation: UnitQuaternion::identity(),
            translation: Vector3::zeros(),
        }
    }

    /// Swaps the kernel's Z-up convention for the renderer's Y-up
    ///
    /// Maps `(x, y, z)` to `(x, z, -y)`.
    pub fn corrective() -> Self {
        Self {
            name: "Rotate X -90°".to_string(),
            rotation: UnitQuaternion::from_axis_angle(&Vector3::x_axis(), -FRAC_PI_2),
            translation: Vector3::zeros(),
        }
    }

    pub fn translation(name: impl Into<String>, offset: [f32; 3]) -> Self {
        Self {
            name: name.into(),
            rotation: UnitQuaternion::identity(),
            translation: Vector3::from(offset),
        }
    }

    /// Transform a point
    pub fn apply(&self, point: [f32; 3]) -> [f32; 3] {
        let p = self.rotation * Vector3::from(point) + self.translation;
        [p.x, p.y, p.z]
    }

    /// Rotation as `[x, y, z, w]`
    pub fn rotation_xyzw(&self) -> [f32; 4] {
        [self.rotation.i, self.rotation.j, self.rotation.k, self.rotation.w]
    }
}

/// Point light source
#[derive(Clone, Debug, PartialEq)]
pub struct PointLight {
    pub color: [f32; 3],
    pub intensity: f32,
}

/// Renderable or behavioral part of a node
#[derive(Clone, Debug)]
pub enum Component {
    Geometry(Arc<RenderBuffer>),
    /// Shared reference into the [`MaterialPalette`](crate::MaterialPalette)
    Material(Arc<Material>),
    Transform(Transform),
    PointLight(PointLight),
    /// Marks the scene's pick target
    Picker,
}

impl Component {
    pub fn id(&self) -> ComponentId {
        match self {
            Component::Geometry(_) => ComponentId::Geometry,
            Component::Material(m) => ComponentId::Material(m.kind),
            Component::Transform(_) => ComponentId::Transform,
            Component::PointLight(_) => ComponentId::PointLight,
            Component::Picker => ComponentId::Picker,
        }
    }
}

/// Identity under which a component is stored on a node
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ComponentId {
    Geometry,
    Material(MaterialKind),
    Transform,
    PointLight,
    Picker,
}

/// Hierarchical entity with components, visibility and tags
#[derive(Debug)]
pub struct SceneNode {
    pub name: String,
    components: Vec<Component>,
    enabled: bool,
    tags: BTreeMap<String, TagValue>,
    parent: Option<NodeKey>,
    children: Vec<NodeKey>,
}

impl SceneNode {
    fn new(name: String, parent: Option<NodeKey>) -> Self {
        Self {
            name,
            components: Vec::new(),
            enabled: true,
            tags: BTreeMap::new(),
            parent,
            children: Vec::new(),
        }
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn has(&self, id: ComponentId) -> bool {
        self.components.iter().any(|c| c.id() == id)
    }

    /// Add a component unless one with the same identity is present
    pub fn add_component(&mut self, component: Component) -> bool {
        if self.has(component.id()) {
            return false;
        }
        self.components.push(component);
        true
    }

    /// Remove the component with this identity, if any
    pub fn remove_component(&mut self, id: ComponentId) -> bool {
        let before = self.components.len();
        self.components.retain(|c| c.id() != id);
        self.components.len() != before
    }

    pub fn geometry(&self) -> Option<&Arc<RenderBuffer>> {
        self.components.iter().find_map(|c| match c {
            Component::Geometry(g) => Some(g),
            _ => None,
        })
    }

    /// First bound material
    pub fn material(&self) -> Option<&Arc<Material>> {
        self.components.iter().find_map(|c| match c {
            Component::Material(m) => Some(m),
            _ => None,
        })
    }

    pub fn transform(&self) -> Option<&Transform> {
        self.components.iter().find_map(|c| match c {
            Component::Transform(t) => Some(t),
            _ => None,
        })
    }

    pub fn point_light(&self) -> Option<&PointLight> {
        self.components.iter().find_map(|c| match c {
            Component::PointLight(l) => Some(l),
            _ => None,
        })
    }

    /// Own visibility flag; ancestors are not consulted
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn tags(&self) -> &BTreeMap<String, TagValue> {
        &self.tags
    }

    pub fn tag(&self, name: &str) -> Option<&TagValue> {
        self.tags.get(name)
    }

    /// Whether a boolean tag is present and true
    pub fn flag(&self, name: &str) -> bool {
        self.tag(name).and_then(TagValue::as_bool).unwrap_or(false)
    }

    pub fn is_product(&self) -> bool {
        self.flag(tags::IS_PRODUCT)
    }

    pub fn is_wireframe(&self) -> bool {
        self.flag(tags::IS_WIREFRAME)
    }

    pub fn is_transparent(&self) -> bool {
        self.flag(tags::IS_TRANSPARENT)
    }

    pub fn global_id(&self) -> Option<GlobalId> {
        self.tag(tags::GLOBAL_ID)
            .and_then(TagValue::as_text)
            .map(GlobalId::from)
    }

    pub fn parent(&self) -> Option<NodeKey> {
        self.parent
    }

    pub fn children(&self) -> &[NodeKey] {
        &self.children
    }
}

/// Arena of scene nodes under a single root
///
/// Every mutation bumps [`SceneGraph::revision`] so renderers can detect
/// change without diffing.
pub struct SceneGraph {
    nodes: SlotMap<NodeKey, SceneNode>,
    root: NodeKey,
    products: FxHashMap<GlobalId, NodeKey>,
    revision: u64,
}

impl SceneGraph {
    pub fn new(root_name: impl Into<String>) -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(SceneNode::new(root_name.into(), None));
        Self {
            nodes,
            root,
            products: FxHashMap::default(),
            revision: 0,
        }
    }

    pub fn root(&self) -> NodeKey {
        self.root
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, key: NodeKey) -> bool {
        self.nodes.contains_key(key)
    }

    /// Create a node as the last child of `parent`
    pub fn spawn(&mut self, parent: NodeKey, name: impl Into<String>) -> Result<NodeKey> {
        if !self.nodes.contains_key(parent) {
            return Err(Error::NodeNotFound(parent));
        }
        let key = self.nodes.insert(SceneNode::new(name.into(), Some(parent)));
        if let Some(p) = self.nodes.get_mut(parent) {
            p.children.push(key);
        }
        self.touch();
        Ok(key)
    }

    /// Detach a node and drop its subtree
    ///
    /// Removing the root only clears its children.
    pub fn remove(&mut self, key: NodeKey) -> Result<()> {
        if key == self.root {
            return self.detach_children(key);
        }
        let parent = self
            .nodes
            .get(key)
            .ok_or(Error::NodeNotFound(key))?
            .parent;
        if let Some(p) = parent.and_then(|p| self.nodes.get_mut(p)) {
            p.children.retain(|&c| c != key);
        }
        self.drop_subtree(key);
        self.touch();
        Ok(())
    }

    /// Drop every child subtree of `key`, keeping the node itself
    pub fn detach_children(&mut self, key: NodeKey) -> Result<()> {
        let node = self.nodes.get_mut(key).ok_or(Error::NodeNotFound(key))?;
        let children = std::mem::take(&mut node.children);
        for child in children {
            self.drop_subtree(child);
        }
        self.touch();
        Ok(())
    }

    fn drop_subtree(&mut self, key: NodeKey) {
        let mut stack = vec![key];
        while let Some(k) = stack.pop() {
            if let Some(node) = self.nodes.remove(k) {
                if let Some(gid) = node.global_id() {
                    if self.products.get(&gid) == Some(&k) {
                        self.products.remove(&gid);
                    }
                }
                stack.extend(node.children);
            }
        }
    }

    pub fn get(&self, key: NodeKey) -> Option<&SceneNode> {
        self.nodes.get(key)
    }

    /// Mutable access; counts as a change
    ///
    /// Tags are read-only here, use [`SceneGraph::set_tag`] so the product
    /// index stays current.
    pub fn get_mut(&mut self, key: NodeKey) -> Option<&mut SceneNode> {
        if self.nodes.contains_key(key) {
            self.touch();
        }
        self.nodes.get_mut(key)
    }

    pub fn children(&self, key: NodeKey) -> &[NodeKey] {
        self.nodes
            .get(key)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn parent(&self, key: NodeKey) -> Option<NodeKey> {
        self.nodes.get(key)?.parent
    }

    /// First direct child with the given name
    pub fn find_child(&self, parent: NodeKey, name: &str) -> Option<NodeKey> {
        self.children(parent)
            .iter()
            .copied()
            .find(|&c| self.nodes.get(c).is_some_and(|n| n.name == name))
    }

    /// All nodes below `key` in depth-first pre-order, `key` excluded
    pub fn descendants(&self, key: NodeKey) -> Vec<NodeKey> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeKey> = self.children(key).iter().rev().copied().collect();
        while let Some(k) = stack.pop() {
            out.push(k);
            stack.extend(self.children(k).iter().rev());
        }
        out
    }

    /// Whether the node and all its ancestors are enabled
    pub fn is_effectively_enabled(&self, key: NodeKey) -> bool {
        let mut current = Some(key);
        while let Some(k) = current {
            match self.nodes.get(k) {
                Some(node) if node.enabled => current = node.parent,
                _ => return false,
            }
        }
        true
    }

    pub fn set_tag(&mut self, key: NodeKey, name: &str, value: impl Into<TagValue>) -> Result<()> {
        let node = self.nodes.get_mut(key).ok_or(Error::NodeNotFound(key))?;
        let value = value.into();
        if name == tags::GLOBAL_ID {
            if let Some(old) = node.global_id() {
                if self.products.get(&old) == Some(&key) {
                    self.products.remove(&old);
                }
            }
            if let Some(text) = value.as_text() {
                self.products.insert(GlobalId::from(text), key);
            }
        }
        node.tags.insert(name.to_string(), value);
        self.touch();
        Ok(())
    }

    pub fn add_component(&mut self, key: NodeKey, component: Component) -> Result<bool> {
        let node = self.get_mut(key).ok_or(Error::NodeNotFound(key))?;
        Ok(node.add_component(component))
    }

    pub fn remove_component(&mut self, key: NodeKey, id: ComponentId) -> Result<bool> {
        let node = self.get_mut(key).ok_or(Error::NodeNotFound(key))?;
        Ok(node.remove_component(id))
    }

    pub fn set_enabled(&mut self, key: NodeKey, enabled: bool) -> Result<()> {
        let node = self.get_mut(key).ok_or(Error::NodeNotFound(key))?;
        node.set_enabled(enabled);
        Ok(())
    }

    /// Node tagged with this GlobalId
    pub fn find_product(&self, global_id: &GlobalId) -> Option<NodeKey> {
        self.products.get(global_id).copied()
    }

    /// Nearest node at or above `key` carrying a GlobalId
    pub fn product_of(&self, key: NodeKey) -> Option<(NodeKey, GlobalId)> {
        let mut current = Some(key);
        while let Some(k) = current {
            let node = self.nodes.get(k)?;
            if let Some(gid) = node.global_id() {
                return Some((k, gid));
            }
            current = node.parent;
        }
        None
    }

    /// Number of GlobalId-tagged nodes
    pub fn product_count(&self) -> usize {
        self.products.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeKey, &SceneNode)> {
        self.nodes.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MaterialPalette;
    use approx::assert_relative_eq;

    fn material(kind: MaterialKind) -> Component {
        Component::Material(MaterialPalette::global().get(kind))
    }

    #[test]
    fn test_spawn_and_children_order() {
        let mut graph = SceneGraph::new("Root");
        let root = graph.root();
        let a = graph.spawn(root, "a").unwrap();
        let b = graph.spawn(root, "b").unwrap();
        assert_eq!(graph.children(root), &[a, b]);
        assert_eq!(graph.parent(b), Some(root));
        assert_eq!(graph.find_child(root, "b"), Some(b));
        assert_eq!(graph.len(), 3);
    }

    #[test]
    fn test_remove_drops_subtree() {
        let mut graph = SceneGraph::new("Root");
        let root = graph.root();
        let a = graph.spawn(root, "a").unwrap();
        let a1 = graph.spawn(a, "a1").unwrap();
        let a2 = graph.spawn(a1, "a2").unwrap();
        graph.set_tag(a1, tags::GLOBAL_ID, "G1").unwrap();

        graph.remove(a).unwrap();
        assert!(graph.get(a2).is_none());
        assert!(graph.children(root).is_empty());
        assert!(graph.find_product(&"G1".into()).is_none());
        assert!(matches!(graph.remove(a), Err(Error::NodeNotFound(_))));
    }

    #[test]
    fn test_component_set_is_idempotent() {
        let mut graph = SceneGraph::new("Root");
        let n = graph.spawn(graph.root(), "n").unwrap();
        assert!(graph.add_component(n, material(MaterialKind::Normal)).unwrap());
        assert!(!graph.add_component(n, material(MaterialKind::Normal)).unwrap());
        assert_eq!(graph.get(n).unwrap().components().len(), 1);

        assert!(graph.remove_component(n, ComponentId::Material(MaterialKind::Normal)).unwrap());
        assert!(!graph.remove_component(n, ComponentId::Material(MaterialKind::Normal)).unwrap());
        assert!(!graph.remove_component(n, ComponentId::Picker).unwrap());
    }

    #[test]
    fn test_material_swap_keeps_singleton() {
        let mut graph = SceneGraph::new("Root");
        let n = graph.spawn(graph.root(), "n").unwrap();
        graph.add_component(n, material(MaterialKind::Highlight)).unwrap();
        let bound = graph.get(n).unwrap().material().unwrap();
        assert!(Arc::ptr_eq(bound, &MaterialPalette::global().get(MaterialKind::Highlight)));
    }

    #[test]
    fn test_disabled_ancestor_hides_descendants() {
        let mut graph = SceneGraph::new("Root");
        let a = graph.spawn(graph.root(), "a").unwrap();
        let b = graph.spawn(a, "b").unwrap();
        graph.set_enabled(a, false).unwrap();
        assert!(graph.get(b).unwrap().is_enabled());
        assert!(!graph.is_effectively_enabled(b));
        graph.set_enabled(a, true).unwrap();
        assert!(graph.is_effectively_enabled(b));
    }

    #[test]
    fn test_descendants_pre_order() {
        let mut graph = SceneGraph::new("Root");
        let root = graph.root();
        let a = graph.spawn(root, "a").unwrap();
        let a1 = graph.spawn(a, "a1").unwrap();
        let b = graph.spawn(root, "b").unwrap();
        assert_eq!(graph.descendants(root), vec![a, a1, b]);
    }

    #[test]
    fn test_product_of_walks_up() {
        let mut graph = SceneGraph::new("Root");
        let p = graph.spawn(graph.root(), "G1").unwrap();
        graph.set_tag(p, tags::GLOBAL_ID, "G1").unwrap();
        let mesh = graph.spawn(p, "Mesh").unwrap();
        assert_eq!(graph.product_of(mesh), Some((p, GlobalId::from("G1"))));
        assert_eq!(graph.product_of(graph.root()), None);
    }

    #[test]
    fn test_revision_bumps_on_change() {
        let mut graph = SceneGraph::new("Root");
        let r0 = graph.revision();
        let n = graph.spawn(graph.root(), "n").unwrap();
        let r1 = graph.revision();
        assert!(r1 > r0);
        graph.set_enabled(n, false).unwrap();
        assert!(graph.revision() > r1);
        let r2 = graph.revision();
        let _ = graph.get(n);
        assert_eq!(graph.revision(), r2);
    }

    #[test]
    fn test_corrective_transform_swaps_up_axis() {
        let t = Transform::corrective();
        let p = t.apply([1.0, 2.0, 3.0]);
        assert_relative_eq!(p[0], 1.0, epsilon = 1e-6);
        assert_relative_eq!(p[1], 3.0, epsilon = 1e-6);
        assert_relative_eq!(p[2], -2.0, epsilon = 1e-6);
        assert_eq!(t.name, "Rotate X -90°");
    }
}
