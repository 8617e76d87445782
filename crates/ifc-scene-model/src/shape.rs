// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tessellated product geometry as produced by a model backend

use crate::{EntityId, Error, GlobalId, Result, Rgba};
use serde::{Deserialize, Serialize};

/// Lightweight product descriptor, available before any geometry is generated
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductInfo {
    pub id: EntityId,
    pub global_id: GlobalId,
    /// Schema class name (e.g., "IfcWall")
    pub class: String,
    pub name: Option<String>,
}

/// One contiguous triangulated mesh sharing a single style
///
/// All buffers are flattened: `vertices` and `normals` hold xyz triples,
/// `triangle_indices` holds index triples into the vertex list.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Solid {
    pub vertices: Vec<f32>,
    /// Empty when normals were not requested
    #[serde(default)]
    pub normals: Vec<f32>,
    pub triangle_indices: Vec<u32>,
    #[serde(default)]
    pub edge_polylines: Vec<Vec<f32>>,
    /// Legacy per-face material assignment, one entry per triangle indexing
    /// the owning shape's styles. `-1` means no material.
    #[serde(default)]
    pub material_ids: Vec<i32>,
}

impl Solid {
    /// Number of vertices
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / 3
    }

    /// Number of triangles
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.triangle_indices.len() / 3
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Whether this solid carries per-triangle material ids
    #[inline]
    pub fn has_face_materials(&self) -> bool {
        !self.material_ids.is_empty()
    }

    /// Check buffer shape invariants
    pub fn validate(&self) -> Result<()> {
        if self.vertices.len() % 3 != 0 {
            return Err(Error::invalid_solid(format!(
                "vertex buffer length {} is not a multiple of 3",
                self.vertices.len()
            )));
        }
        if !self.normals.is_empty() && self.normals.len() != self.vertices.len() {
            return Err(Error::invalid_solid(format!(
                "normal buffer length {} does not match vertex buffer length {}",
                self.normals.len(),
                self.vertices.len()
            )));
        }
        if self.triangle_indices.len() % 3 != 0 {
            return Err(Error::invalid_solid(format!(
                "index buffer length {} is not a multiple of 3",
                self.triangle_indices.len()
            )));
        }
        let n = self.vertex_count();
        if let Some(&max) = self.triangle_indices.iter().max() {
            if max as usize >= n {
                return Err(Error::invalid_solid(format!(
                    "index {} out of range for {} vertices",
                    max, n
                )));
            }
        }
        if self.has_face_materials() && self.material_ids.len() != self.triangle_count() {
            return Err(Error::invalid_solid(format!(
                "{} material ids for {} triangles",
                self.material_ids.len(),
                self.triangle_count()
            )));
        }
        if let Some(line) = self.edge_polylines.iter().find(|l| l.len() % 3 != 0) {
            return Err(Error::invalid_solid(format!(
                "polyline length {} is not a multiple of 3",
                line.len()
            )));
        }
        Ok(())
    }
}

/// One product's full tessellated geometry
///
/// `styles[i]` applies to every triangle of `solids[i]` unless the solid
/// carries per-face `material_ids`, which then index into `styles`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    pub id: EntityId,
    pub product: ProductInfo,
    pub solids: Vec<Solid>,
    pub styles: Vec<Rgba>,
    pub style_ids: Vec<i32>,
}

impl Shape {
    /// Style for solid `index`, falling back to the default gray
    pub fn style_for(&self, index: usize) -> Rgba {
        self.styles.get(index).copied().unwrap_or_default()
    }

    /// Iterate solids paired with their style
    pub fn styled_solids(&self) -> impl Iterator<Item = (&Solid, Rgba)> {
        self.solids
            .iter()
            .enumerate()
            .map(|(i, solid)| (solid, self.style_for(i)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> Solid {
        Solid {
            vertices: vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            normals: vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0],
            triangle_indices: vec![0, 1, 2],
            edge_polylines: vec![],
            material_ids: vec![],
        }
    }

    #[test]
    fn test_valid_solid() {
        let solid = triangle();
        assert!(solid.validate().is_ok());
        assert_eq!(solid.vertex_count(), 3);
        assert_eq!(solid.triangle_count(), 1);
    }

    #[test]
    fn test_index_out_of_range() {
        let mut solid = triangle();
        solid.triangle_indices = vec![0, 1, 3];
        assert!(matches!(solid.validate(), Err(Error::InvalidSolid(_))));
    }

    #[test]
    fn test_ragged_vertex_buffer() {
        let mut solid = triangle();
        solid.vertices.push(1.0);
        assert!(solid.validate().is_err());
    }

    #[test]
    fn test_material_ids_must_match_triangles() {
        let mut solid = triangle();
        solid.material_ids = vec![0, 1];
        assert!(solid.validate().is_err());
        solid.material_ids = vec![-1];
        assert!(solid.validate().is_ok());
    }

    #[test]
    fn test_style_for_missing_entry() {
        let shape = Shape {
            id: EntityId(1),
            product: ProductInfo {
                id: EntityId(1),
                global_id: GlobalId::from("G1"),
                class: "IfcWall".into(),
                name: None,
            },
            solids: vec![triangle(), triangle()],
            styles: vec![Rgba::opaque(1.0, 0.0, 0.0)],
            style_ids: vec![0],
        };
        let styles: Vec<Rgba> = shape.styled_solids().map(|(_, s)| s).collect();
        assert_eq!(styles, vec![Rgba::opaque(1.0, 0.0, 0.0), Rgba::DEFAULT]);
    }
}
