// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! GPU-ready vertex/index buffers built from tessellated solids
//!
//! Building is a pure function of its inputs so that it can run on worker
//! threads in any order.

use ifc_scene_model::{Rgba, Solid};

/// Color for triangles whose material id is `-1` or does not resolve
pub const FALLBACK_FACE_COLOR: [f32; 3] = [0.5, 1.0, 0.5];

/// Fill value for vertices no triangle writes a color to
const UNCOLORED: f32 = 0.5;

/// How the index buffer is interpreted
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum PrimitiveKind {
    #[default]
    Triangles,
    /// Consecutive index pairs are segments
    Lines,
}

/// Flat vertex/index buffers owned by a geometry component
///
/// `colors` always holds one RGB triple per vertex. `normals` is either
/// empty or matches `positions`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RenderBuffer {
    pub positions: Vec<f32>,
    pub normals: Vec<f32>,
    pub colors: Vec<f32>,
    pub indices: Vec<u32>,
    pub primitive: PrimitiveKind,
}

impl RenderBuffer {
    pub fn empty(primitive: PrimitiveKind) -> Self {
        Self {
            primitive,
            ..Default::default()
        }
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    #[inline]
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// Number of triangles or segments
    pub fn primitive_count(&self) -> usize {
        match self.primitive {
            PrimitiveKind::Triangles => self.indices.len() / 3,
            PrimitiveKind::Lines => self.indices.len() / 2,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    #[inline]
    pub fn has_normals(&self) -> bool {
        !self.normals.is_empty()
    }

    /// Axis-aligned bounds of all positions
    pub fn bounds(&self) -> Option<([f32; 3], [f32; 3])> {
        let mut chunks = self.positions.chunks_exact(3);
        let first = chunks.next()?;
        let mut min = [first[0], first[1], first[2]];
        let mut max = min;
        for p in chunks {
            for axis in 0..3 {
                min[axis] = min[axis].min(p[axis]);
                max[axis] = max[axis].max(p[axis]);
            }
        }
        Some((min, max))
    }
}

/// Mesh and wireframe buffers for one solid
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BuiltSolid {
    pub mesh: RenderBuffer,
    pub edges: RenderBuffer,
    /// The hosting node must use the transparent material
    pub transparent: bool,
}

/// Converts solids into render buffers
pub struct MeshBufferBuilder;

impl MeshBufferBuilder {
    /// Build buffers for a solid with one uniform style
    ///
    /// A solid without triangles yields an empty mesh buffer; callers skip
    /// attaching it. Its edges are still built unless it has no vertices.
    pub fn build(solid: &Solid, style: Rgba) -> BuiltSolid {
        if !has_triangles(solid) {
            return BuiltSolid {
                mesh: RenderBuffer::empty(PrimitiveKind::Triangles),
                edges: solid_edges(solid),
                transparent: style.is_transparent(),
            };
        }

        let rgb = style.rgb();
        let colors = rgb
            .iter()
            .copied()
            .cycle()
            .take(solid.vertices.len())
            .collect();

        BuiltSolid {
            mesh: RenderBuffer {
                positions: solid.vertices.clone(),
                normals: solid.normals.clone(),
                colors,
                indices: solid.triangle_indices.clone(),
                primitive: PrimitiveKind::Triangles,
            },
            edges: Self::build_edges(&solid.edge_polylines),
            transparent: style.is_transparent(),
        }
    }

    /// Build buffers for a solid carrying per-triangle material ids
    ///
    /// Each triangle writes its color to its three vertex slots; a vertex
    /// shared by differently colored triangles keeps the last one written.
    pub fn build_per_face(solid: &Solid, styles: &[Rgba]) -> BuiltSolid {
        if !has_triangles(solid) {
            return BuiltSolid {
                mesh: RenderBuffer::empty(PrimitiveKind::Triangles),
                edges: solid_edges(solid),
                transparent: false,
            };
        }

        let mut colors = vec![UNCOLORED; solid.vertices.len()];
        let mut transparent = false;

        for (triangle, &mat_id) in solid
            .triangle_indices
            .chunks_exact(3)
            .zip(solid.material_ids.iter())
        {
            let style = usize::try_from(mat_id).ok().and_then(|i| styles.get(i));
            let rgb = match style {
                Some(style) => {
                    transparent |= style.is_transparent();
                    style.rgb()
                }
                None => FALLBACK_FACE_COLOR,
            };
            for &vertex in triangle {
                let offset = vertex as usize * 3;
                if let Some(slot) = colors.get_mut(offset..offset + 3) {
                    slot.copy_from_slice(&rgb);
                }
            }
        }

        BuiltSolid {
            mesh: RenderBuffer {
                positions: solid.vertices.clone(),
                normals: solid.normals.clone(),
                colors,
                indices: solid.triangle_indices.clone(),
                primitive: PrimitiveKind::Triangles,
            },
            edges: Self::build_edges(&solid.edge_polylines),
            transparent,
        }
    }

    /// Concatenate polylines into one line buffer indexed `0..n`
    ///
    /// Polylines are not chained through shared vertices.
    pub fn build_edges(polylines: &[Vec<f32>]) -> RenderBuffer {
        let positions: Vec<f32> = polylines.iter().flatten().copied().collect();
        let vertex_count = (positions.len() / 3) as u32;
        RenderBuffer {
            colors: vec![0.0; positions.len()],
            positions,
            normals: Vec::new(),
            indices: (0..vertex_count).collect(),
            primitive: PrimitiveKind::Lines,
        }
    }
}

fn has_triangles(solid: &Solid) -> bool {
    !solid.vertices.is_empty() && !solid.triangle_indices.is_empty()
}

/// Edges of a solid; a solid without vertices has none
fn solid_edges(solid: &Solid) -> RenderBuffer {
    if solid.vertices.is_empty() {
        RenderBuffer::empty(PrimitiveKind::Lines)
    } else {
        MeshBufferBuilder::build_edges(&solid.edge_polylines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Two triangles sharing the edge 1-2
    fn quad() -> Solid {
        Solid {
            vertices: vec![
                0.0, 0.0, 0.0, //
                1.0, 0.0, 0.0, //
                0.0, 1.0, 0.0, //
                1.0, 1.0, 0.0,
            ],
            normals: vec![0.0, 0.0, 1.0].repeat(4),
            triangle_indices: vec![0, 1, 2, 2, 1, 3],
            edge_polylines: vec![
                vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0],
                vec![1.0, 0.0, 0.0, 1.0, 1.0, 0.0],
            ],
            material_ids: vec![],
        }
    }

    #[test]
    fn test_uniform_color_per_vertex() {
        let built = MeshBufferBuilder::build(&quad(), Rgba::opaque(0.1, 0.2, 0.3));
        assert_eq!(built.mesh.colors.len(), built.mesh.positions.len());
        for rgb in built.mesh.colors.chunks_exact(3) {
            assert_eq!(rgb, &[0.1, 0.2, 0.3]);
        }
        assert!(!built.transparent);
    }

    #[test]
    fn test_indices_pass_through_and_stay_in_range() {
        let solid = quad();
        let built = MeshBufferBuilder::build(&solid, Rgba::DEFAULT);
        assert_eq!(built.mesh.indices, solid.triangle_indices);
        assert_eq!(built.mesh.index_count(), 3 * solid.triangle_count());
        let n = built.mesh.vertex_count() as u32;
        assert!(built.mesh.indices.iter().all(|&i| i < n));
        assert_eq!(built.mesh.normals, solid.normals);
    }

    #[test]
    fn test_alpha_marks_transparent() {
        let built = MeshBufferBuilder::build(&quad(), Rgba::new(1.0, 1.0, 1.0, 0.4));
        assert!(built.transparent);
    }

    #[test]
    fn test_empty_solid_yields_empty_buffers() {
        let solid = Solid {
            edge_polylines: vec![vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0]],
            ..Default::default()
        };
        let built = MeshBufferBuilder::build(&solid, Rgba::DEFAULT);
        assert!(built.mesh.is_empty());
        assert!(built.mesh.colors.is_empty());
        assert!(built.mesh.indices.is_empty());
        assert!(built.edges.is_empty());
    }

    #[test]
    fn test_vertices_without_triangles_yield_empty_mesh() {
        let mut solid = quad();
        solid.vertices.truncate(9);
        solid.normals.truncate(9);
        solid.triangle_indices.clear();
        assert!(solid.validate().is_ok());

        let built = MeshBufferBuilder::build(&solid, Rgba::DEFAULT);
        assert!(built.mesh.is_empty());
        assert!(built.mesh.colors.is_empty());
        assert!(built.mesh.indices.is_empty());
        assert_eq!(built.edges.primitive_count(), 2);

        let built = MeshBufferBuilder::build_per_face(&solid, &[Rgba::DEFAULT]);
        assert!(built.mesh.is_empty());
        assert!(built.mesh.colors.is_empty());
        assert_eq!(built.edges.primitive_count(), 2);
    }

    #[test]
    fn test_edges_use_synthetic_indices() {
        let edges = MeshBufferBuilder::build_edges(&quad().edge_polylines);
        assert_eq!(edges.primitive, PrimitiveKind::Lines);
        assert_eq!(edges.indices, vec![0, 1, 2, 3]);
        assert_eq!(edges.vertex_count(), 4);
        assert_eq!(edges.primitive_count(), 2);
    }

    #[test]
    fn test_per_face_minus_one_uses_fallback() {
        let mut solid = quad();
        solid.material_ids = vec![-1, -1];
        let built = MeshBufferBuilder::build_per_face(&solid, &[Rgba::opaque(1.0, 0.0, 0.0)]);
        for rgb in built.mesh.colors.chunks_exact(3) {
            assert_eq!(rgb, &FALLBACK_FACE_COLOR);
        }
    }

    #[test]
    fn test_per_face_out_of_range_uses_fallback() {
        let mut solid = quad();
        solid.material_ids = vec![0, 7];
        let built = MeshBufferBuilder::build_per_face(&solid, &[Rgba::opaque(1.0, 0.0, 0.0)]);
        // vertex 3 belongs only to the second triangle
        assert_eq!(&built.mesh.colors[9..12], &FALLBACK_FACE_COLOR);
        assert_eq!(&built.mesh.colors[0..3], &[1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_per_face_last_writer_wins() {
        let mut solid = quad();
        solid.material_ids = vec![0, 1];
        let styles = [Rgba::opaque(1.0, 0.0, 0.0), Rgba::opaque(0.0, 0.0, 1.0)];
        let built = MeshBufferBuilder::build_per_face(&solid, &styles);
        let color = |v: usize| &built.mesh.colors[v * 3..v * 3 + 3];
        assert_eq!(color(0), &[1.0, 0.0, 0.0]);
        // shared vertices take the second triangle's color
        assert_eq!(color(1), &[0.0, 0.0, 1.0]);
        assert_eq!(color(2), &[0.0, 0.0, 1.0]);
        assert_eq!(color(3), &[0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_per_face_untouched_vertices_keep_fill() {
        let mut solid = quad();
        solid.vertices.extend_from_slice(&[5.0, 5.0, 5.0]);
        solid.normals.extend_from_slice(&[0.0, 0.0, 1.0]);
        solid.material_ids = vec![0, 0];
        let built = MeshBufferBuilder::build_per_face(&solid, &[Rgba::opaque(0.0, 0.0, 0.0)]);
        assert_eq!(built.mesh.colors.len(), 15);
        assert_eq!(&built.mesh.colors[12..15], &[0.5, 0.5, 0.5]);
    }

    #[test]
    fn test_bounds() {
        let built = MeshBufferBuilder::build(&quad(), Rgba::DEFAULT);
        let (min, max) = built.mesh.bounds().unwrap();
        assert_relative_eq!(min[0], 0.0);
        assert_relative_eq!(max[1], 1.0);
        assert!(RenderBuffer::default().bounds().is_none());
    }
}
