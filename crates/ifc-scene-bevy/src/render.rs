//! Scene graph to Bevy entities
//!
//! Whenever the graph revision changes, every rendered entity is despawned
//! and respawned from the graph. Mesh assets are cached by buffer identity so
//! a respawn after a material swap does not re-upload geometry.

use crate::{log, SceneBounds, SceneState, ViewerSettings};
use bevy::asset::RenderAssetUsages;
use bevy::mesh::{Indices, PrimitiveTopology};
use bevy::prelude::*;
use ifc_scene_graph::{
    MaterialKind, MaterialPalette, NodeKey, PrimitiveKind, RenderBuffer, SceneGraph, Shading,
    Transform as NodeTransform,
};
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;

pub struct RenderPlugin;

impl Plugin for RenderPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SceneMaterials>()
            .init_resource::<RenderCache>()
            .add_systems(Update, sync_scene_system);
    }
}

/// Bevy entity mirroring one renderable scene node
#[derive(Component, Clone, Debug)]
pub struct RenderedNode {
    pub node: NodeKey,
    /// World-space bounds
    pub bounds: SceneBounds,
    /// Belongs to a product and can be picked
    pub pickable: bool,
}

/// Marker for lights spawned from the graph
#[derive(Component)]
pub struct RenderedLight;

/// One shared handle per palette material, for surfaces and for lines
#[derive(Resource)]
pub struct SceneMaterials {
    surfaces: [Handle<StandardMaterial>; 4],
    lines: [Handle<StandardMaterial>; 4],
}

fn slot(kind: MaterialKind) -> usize {
    match kind {
        MaterialKind::Normal => 0,
        MaterialKind::Highlight => 1,
        MaterialKind::Transparent => 2,
        MaterialKind::Wireframe => 3,
    }
}

impl SceneMaterials {
    pub fn get(&self, kind: MaterialKind, primitive: PrimitiveKind) -> Handle<StandardMaterial> {
        match primitive {
            PrimitiveKind::Triangles => self.surfaces[slot(kind)].clone(),
            PrimitiveKind::Lines => self.lines[slot(kind)].clone(),
        }
    }
}

/// Bevy material for a palette entry
pub fn standard_material(kind: MaterialKind, unlit: bool) -> StandardMaterial {
    let material = MaterialPalette::global().get(kind);
    let [r, g, b, a] = material.diffuse.to_array();
    let base_color = match material.shading {
        // Vertex colors carry the look
        Shading::PerVertexColor => Color::WHITE,
        _ => Color::srgba(r, g, b, a),
    };
    StandardMaterial {
        base_color,
        unlit,
        metallic: 0.0,
        perceptual_roughness: (1.0 - material.shininess).clamp(0.089, 1.0),
        reflectance: if material.alpha_blend { 0.5 } else { 0.3 },
        alpha_mode: if material.alpha_blend {
            AlphaMode::Blend
        } else {
            AlphaMode::Opaque
        },
        double_sided: true,
        cull_mode: None,
        ..default()
    }
}

impl FromWorld for SceneMaterials {
    fn from_world(world: &mut World) -> Self {
        let mut assets = world.resource_mut::<Assets<StandardMaterial>>();
        let surfaces = MaterialKind::ALL.map(|kind| assets.add(standard_material(kind, false)));
        let lines = MaterialKind::ALL.map(|kind| assets.add(standard_material(kind, true)));
        Self { surfaces, lines }
    }
}

/// Uploaded meshes keyed by buffer address and color usage
///
/// Entries hold their buffer so the address stays unique while cached.
#[derive(Resource, Default)]
pub struct RenderCache {
    revision: Option<u64>,
    flags: Option<(bool, bool)>,
    meshes: FxHashMap<(usize, bool), (Arc<RenderBuffer>, Handle<Mesh>)>,
}

impl RenderCache {
    /// Force a respawn on the next frame
    pub fn invalidate(&mut self) {
        self.revision = None;
    }
}

/// Convert flat render buffers into a Bevy mesh
///
/// `with_colors` attaches the per-vertex colors; materials other than the
/// vertex-color one must not be tinted by them.
pub fn buffer_to_mesh(buffer: &RenderBuffer, with_colors: bool) -> Mesh {
    let topology = match buffer.primitive {
        PrimitiveKind::Triangles => PrimitiveTopology::TriangleList,
        PrimitiveKind::Lines => PrimitiveTopology::LineList,
    };
    let mut mesh = Mesh::new(topology, RenderAssetUsages::default());

    let positions = triples(&buffer.positions);
    if buffer.primitive == PrimitiveKind::Triangles {
        let normals = if buffer.has_normals() {
            triples(&buffer.normals)
        } else {
            compute_flat_normals(&positions, &buffer.indices)
        };
        mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, normals);
    }
    if with_colors {
        let colors: Vec<[f32; 4]> = triples(&buffer.colors)
            .into_iter()
            .map(|[r, g, b]| [r, g, b, 1.0])
            .collect();
        mesh.insert_attribute(Mesh::ATTRIBUTE_COLOR, colors);
    }
    mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, positions);
    mesh.insert_indices(Indices::U32(buffer.indices.clone()));
    mesh
}

fn triples(flat: &[f32]) -> Vec<[f32; 3]> {
    match bytemuck::try_cast_slice::<f32, [f32; 3]>(flat) {
        Ok(cast) => cast.to_vec(),
        Err(_) => flat
            .chunks_exact(3)
            .map(|c| [c[0], c[1], c[2]])
            .collect(),
    }
}

/// Compute flat normals from triangle positions and indices
fn compute_flat_normals(positions: &[[f32; 3]], indices: &[u32]) -> Vec<[f32; 3]> {
    let mut normals = vec![Vec3::ZERO; positions.len()];
    for tri in indices.chunks_exact(3) {
        let [i0, i1, i2] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        if i0 >= positions.len() || i1 >= positions.len() || i2 >= positions.len() {
            continue;
        }
        let p0 = Vec3::from_array(positions[i0]);
        let face_normal =
            (Vec3::from_array(positions[i1]) - p0).cross(Vec3::from_array(positions[i2]) - p0);
        for idx in [i0, i1, i2] {
            normals[idx] += face_normal;
        }
    }
    normals
        .into_iter()
        .map(|n| n.try_normalize().unwrap_or(Vec3::Y).to_array())
        .collect()
}

/// Bevy transform for a scene node transform
pub fn to_bevy_transform(transform: &NodeTransform) -> Transform {
    let [x, y, z, w] = transform.rotation_xyzw();
    let t = &transform.translation;
    Transform {
        translation: Vec3::new(t.x, t.y, t.z),
        rotation: Quat::from_xyzw(x, y, z, w),
        scale: Vec3::ONE,
    }
}

/// World-space box around a buffer placed by `transform`
pub fn world_bounds(buffer: &RenderBuffer, transform: &Transform) -> Option<SceneBounds> {
    let (min, max) = buffer.bounds()?;
    let (min, max) = (Vec3::from_array(min), Vec3::from_array(max));
    let mut out_min = Vec3::splat(f32::INFINITY);
    let mut out_max = Vec3::splat(f32::NEG_INFINITY);
    for i in 0..8 {
        let corner = Vec3::new(
            if i & 1 == 0 { min.x } else { max.x },
            if i & 2 == 0 { min.y } else { max.y },
            if i & 4 == 0 { min.z } else { max.z },
        );
        let p = transform.transform_point(corner);
        out_min = out_min.min(p);
        out_max = out_max.max(p);
    }
    Some(SceneBounds {
        min: out_min,
        max: out_max,
    })
}

/// Reference lines hidden by the viewer settings
fn hidden_reference_lines(graph: &SceneGraph, settings: &ViewerSettings) -> FxHashSet<NodeKey> {
    let mut hidden = FxHashSet::default();
    let grids = graph
        .find_child(graph.root(), "Scene")
        .and_then(|scene| graph.find_child(scene, "Grids"));
    let Some(grids) = grids else {
        return hidden;
    };
    // The three axes come first, then the grid lines
    for (i, &line) in graph.children(grids).iter().enumerate() {
        let show = if i < 3 {
            settings.show_axes
        } else {
            settings.show_grid
        };
        if !show {
            hidden.insert(line);
        }
    }
    hidden
}

fn sync_scene_system(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    materials: Res<SceneMaterials>,
    mut cache: ResMut<RenderCache>,
    mut scene: ResMut<SceneState>,
    settings: Res<ViewerSettings>,
    existing: Query<Entity, Or<(With<RenderedNode>, With<RenderedLight>)>>,
) {
    let revision = scene.view.graph().revision();
    let flags = (settings.show_grid, settings.show_axes);
    if cache.revision == Some(revision) && cache.flags == Some(flags) {
        return;
    }

    for entity in existing.iter() {
        commands.entity(entity).despawn();
    }

    let graph = scene.view.graph();
    let hidden = hidden_reference_lines(graph, &settings);
    let mut previous = std::mem::take(&mut cache.meshes);
    let mut model_bounds: Option<SceneBounds> = None;
    let mut spawned = 0usize;

    for (key, node) in graph.iter() {
        if !graph.is_effectively_enabled(key) || hidden.contains(&key) {
            continue;
        }

        if let Some(light) = node.point_light() {
            let translation = node
                .transform()
                .map(|t| to_bevy_transform(t).translation)
                .unwrap_or(Vec3::ZERO);
            let [r, g, b] = light.color;
            commands.spawn((
                PointLight {
                    color: Color::srgb(r, g, b),
                    intensity: light.intensity * 2_000_000.0,
                    range: 500.0,
                    shadows_enabled: false,
                    ..default()
                },
                Transform::from_translation(translation),
                RenderedLight,
            ));
            continue;
        }

        let Some(buffer) = node.geometry() else {
            continue;
        };
        if buffer.is_empty() {
            continue;
        }

        let kind = node
            .material()
            .map(|m| m.kind)
            .unwrap_or(MaterialKind::Normal);
        let with_colors = MaterialPalette::global().get(kind).shading == Shading::PerVertexColor;
        let cache_key = (Arc::as_ptr(buffer) as usize, with_colors);
        let handle = match previous.remove(&cache_key) {
            Some((_, handle)) => handle,
            None => meshes.add(buffer_to_mesh(buffer, with_colors)),
        };
        cache
            .meshes
            .insert(cache_key, (Arc::clone(buffer), handle.clone()));

        let transform = node.transform().map(to_bevy_transform).unwrap_or_default();
        let bounds = world_bounds(buffer, &transform).unwrap_or_default();
        let pickable = graph.product_of(key).is_some();
        if pickable {
            model_bounds = Some(match model_bounds {
                Some(b) => b.union(bounds),
                None => bounds,
            });
        }

        commands.spawn((
            Mesh3d(handle),
            MeshMaterial3d(materials.get(kind, buffer.primitive)),
            transform,
            RenderedNode {
                node: key,
                bounds,
                pickable,
            },
        ));
        spawned += 1;
    }

    for (_, (_, handle)) in previous {
        meshes.remove(&handle);
    }

    log(&format!(
        "[Render] Revision {}: {} nodes spawned",
        revision, spawned
    ));
    scene.bounds = model_bounds;
    cache.revision = Some(revision);
    cache.flags = Some(flags);
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn triangle() -> RenderBuffer {
        RenderBuffer {
            positions: vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            normals: Vec::new(),
            colors: vec![1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
            indices: vec![0, 1, 2],
            primitive: PrimitiveKind::Triangles,
        }
    }

    #[test]
    fn test_triangle_buffer_to_mesh() {
        let mesh = buffer_to_mesh(&triangle(), true);
        assert_eq!(mesh.primitive_topology(), PrimitiveTopology::TriangleList);
        assert_eq!(mesh.count_vertices(), 3);
        assert!(mesh.attribute(Mesh::ATTRIBUTE_COLOR).is_some());
        assert!(mesh.attribute(Mesh::ATTRIBUTE_NORMAL).is_some());
        assert_eq!(mesh.indices().map(|i| i.len()), Some(3));
    }

    #[test]
    fn test_mesh_without_colors() {
        let mesh = buffer_to_mesh(&triangle(), false);
        assert!(mesh.attribute(Mesh::ATTRIBUTE_COLOR).is_none());
    }

    #[test]
    fn test_lines_have_no_normals() {
        let buffer = RenderBuffer {
            positions: vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0],
            colors: vec![0.0; 6],
            indices: vec![0, 1],
            primitive: PrimitiveKind::Lines,
            ..Default::default()
        };
        let mesh = buffer_to_mesh(&buffer, true);
        assert_eq!(mesh.primitive_topology(), PrimitiveTopology::LineList);
        assert!(mesh.attribute(Mesh::ATTRIBUTE_NORMAL).is_none());
    }

    #[test]
    fn test_flat_normals_face_up_the_winding() {
        let positions = triples(&triangle().positions);
        let normals = compute_flat_normals(&positions, &[0, 1, 2]);
        for n in normals {
            assert_relative_eq!(n[2], 1.0);
        }
    }

    #[test]
    fn test_corrective_transform_maps_z_up_to_y_up() {
        let transform = to_bevy_transform(&NodeTransform::corrective());
        let p = transform.transform_point(Vec3::new(1.0, 2.0, 3.0));
        assert_relative_eq!(p.x, 1.0, epsilon = 1e-5);
        assert_relative_eq!(p.y, 3.0, epsilon = 1e-5);
        assert_relative_eq!(p.z, -2.0, epsilon = 1e-5);
    }

    #[test]
    fn test_world_bounds_under_corrective_transform() {
        let transform = to_bevy_transform(&NodeTransform::corrective());
        let bounds = world_bounds(&triangle(), &transform).unwrap();
        assert_relative_eq!(bounds.min.z, -1.0, epsilon = 1e-5);
        assert_relative_eq!(bounds.max.z, 0.0, epsilon = 1e-5);
        assert_relative_eq!(bounds.max.x, 1.0, epsilon = 1e-5);
        assert!(world_bounds(&RenderBuffer::default(), &transform).is_none());
    }

    #[test]
    fn test_transparent_material_blends() {
        let material = standard_material(MaterialKind::Transparent, false);
        assert!(matches!(material.alpha_mode, AlphaMode::Blend));
        let normal = standard_material(MaterialKind::Normal, false);
        assert_eq!(normal.base_color, Color::WHITE);
        assert!(standard_material(MaterialKind::Wireframe, true).unlit);
    }
}
