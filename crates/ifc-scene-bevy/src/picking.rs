//! Click picking
//!
//! A left click that did not turn into a drag casts a ray through the cursor.
//! The nearest product geometry hit is handed to the selection controller,
//! which swaps materials in the graph; the render sync picks that up.
//! Shift+click leaves the selection alone and turns the camera toward the
//! hit point instead.

use crate::camera::{CameraController, CameraInputSet, MainCamera};
use crate::render::RenderedNode;
use crate::{log, SceneBounds, SceneState};
use bevy::prelude::*;
use bevy::window::PrimaryWindow;
use ifc_scene_graph::{Modifiers, NodeKey};

pub struct PickingPlugin;

impl Plugin for PickingPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<PickingSettings>()
            .add_systems(Update, picking_system.after(CameraInputSet));
    }
}

#[derive(Resource)]
pub struct PickingSettings {
    pub enabled: bool,
}

impl Default for PickingSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

fn picking_system(
    keyboard: Res<ButtonInput<KeyCode>>,
    windows: Query<&Window, With<PrimaryWindow>>,
    cameras: Query<(&Camera, &GlobalTransform), With<MainCamera>>,
    nodes: Query<&RenderedNode>,
    mut controller: ResMut<CameraController>,
    mut scene: ResMut<SceneState>,
    settings: Res<PickingSettings>,
) {
    if !controller.take_click() || !settings.enabled {
        return;
    }

    let Ok(window) = windows.single() else { return };
    let Some(cursor_pos) = window.cursor_position() else { return };
    let Ok((camera, camera_transform)) = cameras.single() else { return };
    let Ok(ray) = camera.viewport_to_world(camera_transform, cursor_pos) else { return };

    let hit = closest_hit(
        ray.origin,
        *ray.direction,
        nodes.iter().filter(|n| n.pickable).map(|n| (n.node, n.bounds)),
    );

    // Clicking empty space keeps the selection
    let Some((node, distance)) = hit else { return };

    if keyboard.pressed(KeyCode::ShiftLeft) || keyboard.pressed(KeyCode::ShiftRight) {
        let point = ray.origin + *ray.direction * distance;
        log(&format!("[Picking] Recentering on {:?}", point));
        controller.look_at_point(point);
        return;
    }

    let modifiers = Modifiers {
        ctrl: keyboard.pressed(KeyCode::ControlLeft) || keyboard.pressed(KeyCode::ControlRight),
        super_key: keyboard.pressed(KeyCode::SuperLeft) || keyboard.pressed(KeyCode::SuperRight),
    };
    let events = scene.view.pick_node(node, modifiers);
    log(&format!("[Picking] {} selection events", events.len()));
}

/// Nearest candidate whose box the ray enters, with the entry distance
pub fn closest_hit(
    origin: Vec3,
    direction: Vec3,
    candidates: impl IntoIterator<Item = (NodeKey, SceneBounds)>,
) -> Option<(NodeKey, f32)> {
    let mut closest: Option<(NodeKey, f32)> = None;
    for (node, bounds) in candidates {
        if let Some(distance) = ray_aabb(origin, direction, bounds.min, bounds.max) {
            if closest.map(|(_, d)| distance < d).unwrap_or(true) {
                closest = Some((node, distance));
            }
        }
    }
    closest
}

/// Ray-AABB intersection (slab method)
///
/// Returns the entry distance, or zero when the origin is inside the box.
pub fn ray_aabb(origin: Vec3, direction: Vec3, min: Vec3, max: Vec3) -> Option<f32> {
    let inv_dir = Vec3::new(1.0 / direction.x, 1.0 / direction.y, 1.0 / direction.z);

    let t1 = (min - origin) * inv_dir;
    let t2 = (max - origin) * inv_dir;

    let tmin = t1.min(t2);
    let tmax = t1.max(t2);

    let t_enter = tmin.x.max(tmin.y).max(tmin.z);
    let t_exit = tmax.x.min(tmax.y).min(tmax.z);

    if t_enter <= t_exit && t_exit >= 0.0 {
        Some(t_enter.max(0.0))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use slotmap::SlotMap;

    fn unit_box(offset: Vec3) -> SceneBounds {
        SceneBounds {
            min: offset - Vec3::splat(0.5),
            max: offset + Vec3::splat(0.5),
        }
    }

    #[test]
    fn test_ray_hits_box_in_front() {
        let d = ray_aabb(
            Vec3::new(0.0, 0.0, -5.0),
            Vec3::Z,
            Vec3::splat(-1.0),
            Vec3::splat(1.0),
        );
        assert_relative_eq!(d.unwrap(), 4.0);
    }

    #[test]
    fn test_ray_misses_box_behind_or_aside() {
        assert!(ray_aabb(Vec3::new(0.0, 0.0, 5.0), Vec3::Z, Vec3::splat(-1.0), Vec3::splat(1.0)).is_none());
        assert!(ray_aabb(Vec3::new(3.0, 0.0, -5.0), Vec3::Z, Vec3::splat(-1.0), Vec3::splat(1.0)).is_none());
    }

    #[test]
    fn test_origin_inside_box() {
        let d = ray_aabb(Vec3::ZERO, Vec3::X, Vec3::splat(-1.0), Vec3::splat(1.0));
        assert_eq!(d, Some(0.0));
    }

    #[test]
    fn test_closest_hit_prefers_nearest() {
        let mut keys: SlotMap<NodeKey, ()> = SlotMap::with_key();
        let near = keys.insert(());
        let far = keys.insert(());
        let aside = keys.insert(());
        let candidates = vec![
            (far, unit_box(Vec3::new(0.0, 0.0, 10.0))),
            (aside, unit_box(Vec3::new(5.0, 0.0, 2.0))),
            (near, unit_box(Vec3::new(0.0, 0.0, 3.0))),
        ];
        assert_eq!(closest_hit(Vec3::ZERO, Vec3::Z, candidates), Some((near, 2.5)));
        assert_eq!(closest_hit(Vec3::ZERO, -Vec3::Z, Vec::new()), None);
    }
}
