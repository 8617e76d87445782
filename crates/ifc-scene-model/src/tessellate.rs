// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Faceted boundary representation and its tessellator

use crate::{Error, Result, Solid, Tessellator};
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Planar polygon face over the brep's coordinate list
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Face {
    /// Outer loop, as indices into [`FacetedBrep::coordinates`]
    pub indices: Vec<usize>,
    /// Legacy per-face material, indexing the owning shape's styles
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style_index: Option<i32>,
}

/// Boundary representation made of planar polygon faces
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FacetedBrep {
    pub coordinates: Vec<[f64; 3]>,
    pub faces: Vec<Face>,
}

impl FacetedBrep {
    /// Whether any face carries its own style index
    pub fn has_face_styles(&self) -> bool {
        self.faces.iter().any(|f| f.style_index.is_some())
    }

    /// Axis-aligned box with outward-facing quads
    pub fn cuboid(min: [f64; 3], max: [f64; 3]) -> Self {
        let [x0, y0, z0] = min;
        let [x1, y1, z1] = max;
        let quad = |a, b, c, d| Face {
            indices: vec![a, b, c, d],
            style_index: None,
        };
        Self {
            coordinates: vec![
                [x0, y0, z0],
                [x1, y0, z0],
                [x1, y1, z0],
                [x0, y1, z0],
                [x0, y0, z1],
                [x1, y0, z1],
                [x1, y1, z1],
                [x0, y1, z1],
            ],
            faces: vec![
                quad(0, 3, 2, 1),
                quad(4, 5, 6, 7),
                quad(0, 1, 5, 4),
                quad(1, 2, 6, 5),
                quad(2, 3, 7, 6),
                quad(3, 0, 4, 7),
            ],
        }
    }
}

/// Fan-triangulating tessellator for convex planar faces
///
/// Vertices are not welded: each face gets its own copy so that flat
/// per-face normals survive. Every polygon edge becomes its own two-point
/// polyline, so concatenated edges read as a segment list.
#[derive(Clone, Copy, Debug)]
pub struct FacetTessellator {
    /// Emit per-vertex normals
    pub with_normals: bool,
}

impl Default for FacetTessellator {
    fn default() -> Self {
        Self { with_normals: true }
    }
}

impl FacetTessellator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Tessellator for FacetTessellator {
    fn tessellate(&self, brep: &FacetedBrep) -> Result<Solid> {
        let mut solid = Solid::default();
        let face_styles = brep.has_face_styles();

        for (face_index, face) in brep.faces.iter().enumerate() {
            if face.indices.len() < 3 {
                return Err(Error::invalid_solid(format!(
                    "face {} has {} vertices",
                    face_index,
                    face.indices.len()
                )));
            }

            let points = face
                .indices
                .iter()
                .map(|&i| {
                    brep.coordinates
                        .get(i)
                        .map(|c| Point3::new(c[0], c[1], c[2]))
                        .ok_or_else(|| {
                            Error::invalid_solid(format!(
                                "face {} references coordinate {} of {}",
                                face_index,
                                i,
                                brep.coordinates.len()
                            ))
                        })
                })
                .collect::<Result<Vec<_>>>()?;

            let base = solid.vertex_count() as u32;
            let normal = polygon_normal(&points);

            for p in &points {
                solid
                    .vertices
                    .extend_from_slice(&[p.x as f32, p.y as f32, p.z as f32]);
                if self.with_normals {
                    solid.normals.extend_from_slice(&[
                        normal.x as f32,
                        normal.y as f32,
                        normal.z as f32,
                    ]);
                }
            }

            for i in 1..points.len() as u32 - 1 {
                solid
                    .triangle_indices
                    .extend_from_slice(&[base, base + i, base + i + 1]);
                if face_styles {
                    solid.material_ids.push(face.style_index.unwrap_or(-1));
                }
            }

            for (i, a) in points.iter().enumerate() {
                let b = &points[(i + 1) % points.len()];
                solid.edge_polylines.push(vec![
                    a.x as f32, a.y as f32, a.z as f32, //
                    b.x as f32, b.y as f32, b.z as f32,
                ]);
            }
        }

        Ok(solid)
    }
}

/// Newell's method; falls back to +Z for degenerate polygons
fn polygon_normal(points: &[Point3<f64>]) -> Vector3<f64> {
    let mut normal = Vector3::<f64>::zeros();
    for (i, current) in points.iter().enumerate() {
        let next = &points[(i + 1) % points.len()];
        normal.x += (current.y - next.y) * (current.z + next.z);
        normal.y += (current.z - next.z) * (current.x + next.x);
        normal.z += (current.x - next.x) * (current.y + next.y);
    }

    if normal.norm() > 1e-10 {
        normal.normalize()
    } else {
        Vector3::z()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_square(style_index: Option<i32>) -> FacetedBrep {
        FacetedBrep {
            coordinates: vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [1.0, 1.0, 0.0],
                [0.0, 1.0, 0.0],
            ],
            faces: vec![Face {
                indices: vec![0, 1, 2, 3],
                style_index,
            }],
        }
    }

    #[test]
    fn test_square_fans_into_two_triangles() {
        let solid = FacetTessellator::new().tessellate(&unit_square(None)).unwrap();
        assert_eq!(solid.vertex_count(), 4);
        assert_eq!(solid.triangle_indices, vec![0, 1, 2, 0, 2, 3]);
        assert!(solid.material_ids.is_empty());
        assert!(solid.validate().is_ok());
    }

    #[test]
    fn test_flat_normal() {
        let solid = FacetTessellator::new().tessellate(&unit_square(None)).unwrap();
        for n in solid.normals.chunks_exact(3) {
            assert_relative_eq!(n[2], 1.0);
        }
    }

    #[test]
    fn test_one_segment_per_polygon_edge() {
        let solid = FacetTessellator::new().tessellate(&unit_square(None)).unwrap();
        assert_eq!(solid.edge_polylines.len(), 4);
        assert!(solid.edge_polylines.iter().all(|l| l.len() == 6));
        // the last edge closes the loop
        let last = &solid.edge_polylines[3];
        assert_eq!(&last[0..3], &[0.0, 1.0, 0.0]);
        assert_eq!(&last[3..6], &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_cuboid_has_four_segments_per_face() {
        let brep = FacetedBrep::cuboid([0.0, 0.0, 0.0], [1.0, 1.0, 1.0]);
        let solid = FacetTessellator::new().tessellate(&brep).unwrap();
        assert_eq!(solid.edge_polylines.len(), 24);
    }

    #[test]
    fn test_face_style_becomes_material_ids() {
        let solid = FacetTessellator::new()
            .tessellate(&unit_square(Some(2)))
            .unwrap();
        assert_eq!(solid.material_ids, vec![2, 2]);
    }

    #[test]
    fn test_without_normals() {
        let tess = FacetTessellator { with_normals: false };
        let solid = tess.tessellate(&unit_square(None)).unwrap();
        assert!(solid.normals.is_empty());
    }

    #[test]
    fn test_cuboid_normals_point_outward() {
        let brep = FacetedBrep::cuboid([0.0, 0.0, 0.0], [1.0, 2.0, 3.0]);
        let solid = FacetTessellator::new().tessellate(&brep).unwrap();
        assert_eq!(solid.vertex_count(), 24);
        assert_eq!(solid.triangle_count(), 12);
        // bottom face first, pointing down
        assert_relative_eq!(solid.normals[2], -1.0);
        // top face second, pointing up
        assert_relative_eq!(solid.normals[12 + 2], 1.0);
    }

    #[test]
    fn test_degenerate_face_is_error() {
        let mut brep = unit_square(None);
        brep.faces[0].indices = vec![0, 1];
        assert!(FacetTessellator::new().tessellate(&brep).is_err());

        let mut brep = unit_square(None);
        brep.faces[0].indices = vec![0, 1, 9];
        assert!(FacetTessellator::new().tessellate(&brep).is_err());
    }
}
