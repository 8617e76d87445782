// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Read-only tree projection of the scene graph for hierarchy panels
//!
//! The mirror is rebuilt in full after every structural change instead of
//! being patched.

use crate::{ComponentId, Error, NodeKey, PrimitiveKind, Result, SceneGraph, SceneNode};

/// One row of the hierarchy
#[derive(Clone, Debug, PartialEq)]
pub struct MirrorRow {
    pub node: NodeKey,
    pub name: String,
    /// Kind of the node's main component
    pub type_name: &'static str,
    pub depth: usize,
    /// Checkbox state for product nodes; `true` means visible
    pub toggle: Option<bool>,
    pub children: Vec<MirrorRow>,
}

#[derive(Clone, Debug, Default)]
pub struct MirrorTree {
    pub roots: Vec<MirrorRow>,
}

impl MirrorTree {
    /// All rows in depth-first pre-order
    pub fn rows(&self) -> Vec<&MirrorRow> {
        let mut out = Vec::new();
        let mut stack: Vec<&MirrorRow> = self.roots.iter().rev().collect();
        while let Some(row) = stack.pop() {
            out.push(row);
            stack.extend(row.children.iter().rev());
        }
        out
    }

    pub fn find(&self, node: NodeKey) -> Option<&MirrorRow> {
        self.rows().into_iter().find(|r| r.node == node)
    }

    pub fn len(&self) -> usize {
        self.rows().len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

pub struct SceneGraphMirror;

impl SceneGraphMirror {
    /// Project the subtree rooted at `root`, root included
    pub fn rebuild(graph: &SceneGraph, root: NodeKey) -> MirrorTree {
        MirrorTree {
            roots: Self::row(graph, root, 0).into_iter().collect(),
        }
    }

    fn row(graph: &SceneGraph, key: NodeKey, depth: usize) -> Option<MirrorRow> {
        let node = graph.get(key)?;
        Some(MirrorRow {
            node: key,
            name: node.name.clone(),
            type_name: type_name(node),
            depth,
            toggle: node.is_product().then(|| node.is_enabled()),
            children: graph
                .children(key)
                .iter()
                .filter_map(|&c| Self::row(graph, c, depth + 1))
                .collect(),
        })
    }

    /// Flip visibility of a product node, returning the new state
    pub fn toggle_visibility(graph: &mut SceneGraph, node: NodeKey) -> Result<bool> {
        let scene_node = graph.get(node).ok_or(Error::NodeNotFound(node))?;
        if !scene_node.is_product() {
            return Err(Error::NotToggleable(scene_node.name.clone()));
        }
        let enabled = !scene_node.is_enabled();
        graph.set_enabled(node, enabled)?;
        Ok(enabled)
    }
}

fn type_name(node: &SceneNode) -> &'static str {
    if let Some(geometry) = node.geometry() {
        return match geometry.primitive {
            PrimitiveKind::Triangles => "Mesh",
            PrimitiveKind::Lines => "Lines",
        };
    }
    if node.has(ComponentId::PointLight) {
        "PointLight"
    } else if node.has(ComponentId::Picker) {
        "ObjectPicker"
    } else {
        "Entity"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{tags, Component, PointLight, RenderBuffer};
    use std::sync::Arc;

    fn graph() -> (SceneGraph, NodeKey, NodeKey, NodeKey) {
        let mut graph = SceneGraph::new("Root");
        let product = graph.spawn(graph.root(), "G1").unwrap();
        graph.set_tag(product, tags::IS_PRODUCT, true).unwrap();
        let mesh = graph.spawn(product, "Mesh").unwrap();
        graph
            .add_component(mesh, Component::Geometry(Arc::new(RenderBuffer::default())))
            .unwrap();
        let light = graph.spawn(graph.root(), "Light").unwrap();
        graph
            .add_component(
                light,
                Component::PointLight(PointLight {
                    color: [1.0, 1.0, 1.0],
                    intensity: 1.0,
                }),
            )
            .unwrap();
        (graph, product, mesh, light)
    }

    #[test]
    fn test_rows_pre_order_with_depth() {
        let (graph, product, mesh, light) = graph();
        let tree = SceneGraphMirror::rebuild(&graph, graph.root());
        let rows = tree.rows();
        let nodes: Vec<_> = rows.iter().map(|r| r.node).collect();
        assert_eq!(nodes, vec![graph.root(), product, mesh, light]);
        assert_eq!(rows[2].depth, 2);
        assert_eq!(tree.len(), 4);
    }

    #[test]
    fn test_type_names() {
        let (graph, product, mesh, light) = graph();
        let tree = SceneGraphMirror::rebuild(&graph, graph.root());
        assert_eq!(tree.find(product).unwrap().type_name, "Entity");
        assert_eq!(tree.find(mesh).unwrap().type_name, "Mesh");
        assert_eq!(tree.find(light).unwrap().type_name, "PointLight");
    }

    #[test]
    fn test_toggle_only_on_products_and_checked_means_visible() {
        let (mut graph, product, mesh, _) = graph();
        let tree = SceneGraphMirror::rebuild(&graph, graph.root());
        assert_eq!(tree.find(product).unwrap().toggle, Some(true));
        assert_eq!(tree.find(mesh).unwrap().toggle, None);

        assert!(!SceneGraphMirror::toggle_visibility(&mut graph, product).unwrap());
        let tree = SceneGraphMirror::rebuild(&graph, graph.root());
        assert_eq!(tree.find(product).unwrap().toggle, Some(false));
        assert!(!graph.is_effectively_enabled(mesh));
    }

    #[test]
    fn test_toggle_non_product_rejected() {
        let (mut graph, _, mesh, _) = graph();
        assert!(matches!(
            SceneGraphMirror::toggle_visibility(&mut graph, mesh),
            Err(Error::NotToggleable(name)) if name == "Mesh"
        ));
    }

    #[test]
    fn test_rebuild_reflects_removal() {
        let (mut graph, product, mesh, _) = graph();
        graph.remove(product).unwrap();
        let tree = SceneGraphMirror::rebuild(&graph, graph.root());
        assert!(tree.find(mesh).is_none());
        assert_eq!(tree.len(), 2);
    }
}
