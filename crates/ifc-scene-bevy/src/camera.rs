//! Orbit camera with pan, zoom, preset views and fit-to-scene

use crate::{log, SceneState};
use bevy::ecs::message::MessageReader;
use bevy::input::mouse::{MouseMotion, MouseWheel};
use bevy::prelude::*;

/// System set for camera input (for ordering)
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct CameraInputSet;

pub struct CameraPlugin;

impl Plugin for CameraPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<CameraController>()
            .init_resource::<AutoFitState>()
            .add_systems(Startup, setup_camera)
            .add_systems(
                Update,
                (
                    camera_input_system,
                    camera_keyboard_system,
                    auto_fit_camera_system,
                    camera_update_system,
                )
                    .chain()
                    .in_set(CameraInputSet),
            );
    }
}

/// Camera operating mode
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum CameraMode {
    #[default]
    Orbit,
    Pan,
}

/// Whether the camera has been fitted to the current scene
#[derive(Resource, Default)]
pub struct AutoFitState {
    pub has_fit: bool,
}

#[derive(Resource)]
pub struct CameraController {
    pub mode: CameraMode,
    /// Target point to orbit around
    pub target: Vec3,
    pub distance: f32,
    /// Horizontal rotation
    pub azimuth: f32,
    /// Vertical rotation
    pub elevation: f32,
    /// 0.0 = instant, 1.0 = never moves
    pub damping: f32,
    pub angular_velocity: Vec2,
    pub animation_target: Option<CameraAnimationTarget>,
    /// Field of view in degrees
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    pub orbit_sensitivity: f32,
    pub pan_sensitivity: f32,
    pub zoom_sensitivity: f32,
    pub is_dragging: bool,
    /// Did the mouse move significantly since the button went down?
    pub did_drag: bool,
    /// Released without dragging this frame
    pub just_clicked: bool,
}

impl Default for CameraController {
    fn default() -> Self {
        Self {
            mode: CameraMode::Orbit,
            target: Vec3::ZERO,
            distance: 30.0,
            azimuth: 0.785,   // 45 degrees
            elevation: 0.615, // ~35 degrees (isometric)
            damping: 0.92,
            angular_velocity: Vec2::ZERO,
            animation_target: None,
            fov: 45.0,
            near: 0.05,
            far: 10000.0,
            orbit_sensitivity: 0.005,
            pan_sensitivity: 0.01,
            zoom_sensitivity: 0.1,
            is_dragging: false,
            did_drag: false,
            just_clicked: false,
        }
    }
}

impl CameraController {
    /// Camera position from spherical coordinates around the target
    pub fn position(&self) -> Vec3 {
        let x = self.distance * self.elevation.cos() * self.azimuth.sin();
        let y = self.distance * self.elevation.sin();
        let z = self.distance * self.elevation.cos() * self.azimuth.cos();
        self.target + Vec3::new(x, y, z)
    }

    pub fn set_preset_view(&mut self, azimuth: f32, elevation: f32) {
        self.animation_target = Some(CameraAnimationTarget {
            azimuth,
            elevation,
            distance: self.distance,
            target: self.target,
            duration: 0.5,
            elapsed: 0.0,
        });
    }

    /// Isometric view
    pub fn home(&mut self) {
        self.set_preset_view(0.785, 0.615);
    }

    /// Distance at which a sphere around the box fills the view
    pub fn fit_distance(&self, min: Vec3, max: Vec3) -> f32 {
        let diagonal = (max - min).length();
        let fov_rad = self.fov.to_radians();
        (diagonal / (2.0 * (fov_rad / 2.0).tan())).max(1.0)
    }

    /// Animate to frame the given bounds
    pub fn fit_bounds(&mut self, min: Vec3, max: Vec3) {
        self.animation_target = Some(CameraAnimationTarget {
            azimuth: self.azimuth,
            elevation: self.elevation,
            distance: self.fit_distance(min, max),
            target: (min + max) * 0.5,
            duration: 0.5,
            elapsed: 0.0,
        });
    }

    /// Turn to look at `point` without moving the eye
    pub fn look_at_point(&mut self, point: Vec3) {
        let offset = self.position() - point;
        let distance = offset.length().max(self.near);
        self.animation_target = Some(CameraAnimationTarget {
            azimuth: offset.x.atan2(offset.z),
            elevation: (offset.y / distance).clamp(-1.0, 1.0).asin(),
            distance,
            target: point,
            duration: 0.5,
            elapsed: 0.0,
        });
    }

    pub fn is_animating(&self) -> bool {
        self.animation_target.is_some()
    }

    /// Take the pending click, if any
    pub fn take_click(&mut self) -> bool {
        std::mem::take(&mut self.just_clicked)
    }
}

/// Animation target for smooth camera transitions
#[derive(Clone, Debug)]
pub struct CameraAnimationTarget {
    pub azimuth: f32,
    pub elevation: f32,
    pub distance: f32,
    pub target: Vec3,
    pub duration: f32,
    pub elapsed: f32,
}

impl CameraAnimationTarget {
    /// Advance by `dt`; returns the eased blend factor and whether it is done
    fn advance(&mut self, dt: f32) -> (f32, bool) {
        self.elapsed += dt;
        let t = (self.elapsed / self.duration).min(1.0);
        // Ease out cubic
        (1.0 - (1.0 - t).powi(3), self.elapsed >= self.duration)
    }
}

/// Marker component for the main camera
#[derive(Component)]
pub struct MainCamera;

fn setup_camera(mut commands: Commands, controller: Res<CameraController>) {
    use bevy::render::view::Msaa;

    commands.spawn((
        Camera3d::default(),
        Transform::from_translation(controller.position()).looking_at(controller.target, Vec3::Y),
        Projection::Perspective(PerspectiveProjection {
            fov: controller.fov.to_radians(),
            near: controller.near,
            far: controller.far,
            ..default()
        }),
        MainCamera,
        Msaa::Sample4,
    ));

    // Point lights come from the scene graph; keep a dim fill so nothing is black
    commands.spawn(AmbientLight {
        color: Color::WHITE,
        brightness: 250.0,
        affects_lightmapped_meshes: true,
    });
}

#[allow(unused_variables)]
fn camera_input_system(
    mouse_button: Res<ButtonInput<MouseButton>>,
    mut mouse_motion: MessageReader<MouseMotion>,
    mut mouse_wheel: MessageReader<MouseWheel>,
    mut controller: ResMut<CameraController>,
    #[cfg(feature = "bevy-ui")] ui_interactions: Query<&Interaction, With<Node>>,
) {
    #[cfg(feature = "bevy-ui")]
    let mouse_over_ui = ui_interactions
        .iter()
        .any(|interaction| matches!(interaction, Interaction::Hovered | Interaction::Pressed));
    #[cfg(not(feature = "bevy-ui"))]
    let mouse_over_ui = false;

    if mouse_button.just_pressed(MouseButton::Left) && !mouse_over_ui {
        controller.is_dragging = true;
        controller.did_drag = false;
        controller.just_clicked = false;
    }
    if mouse_button.just_released(MouseButton::Left) && controller.is_dragging {
        if !controller.did_drag {
            controller.just_clicked = true;
        }
        controller.is_dragging = false;
    }

    // Right button pans regardless of mode
    let panning = mouse_button.pressed(MouseButton::Right) && !mouse_over_ui;

    if controller.is_dragging || panning {
        for ev in mouse_motion.read() {
            if ev.delta.length() > 3.0 {
                controller.did_drag = true;
            }
            if panning || controller.mode == CameraMode::Pan {
                let right = Vec3::new(controller.azimuth.cos(), 0.0, -controller.azimuth.sin());
                let scale = controller.pan_sensitivity * controller.distance * 0.1;
                let pan = -right * ev.delta.x * scale + Vec3::Y * ev.delta.y * scale;
                controller.target += pan;
            } else {
                controller.azimuth -= ev.delta.x * controller.orbit_sensitivity;
                controller.elevation -= ev.delta.y * controller.orbit_sensitivity;
                controller.elevation = controller.elevation.clamp(-1.5, 1.5);
                controller.angular_velocity = ev.delta * controller.orbit_sensitivity;
            }
        }
    } else {
        mouse_motion.clear();
        let damping = controller.damping;
        controller.angular_velocity *= damping;
        if controller.angular_velocity.length() > 0.0001 {
            controller.azimuth -= controller.angular_velocity.x;
            controller.elevation -= controller.angular_velocity.y;
            controller.elevation = controller.elevation.clamp(-1.5, 1.5);
        }
    }

    if mouse_over_ui {
        mouse_wheel.clear();
        return;
    }
    for ev in mouse_wheel.read() {
        let zoom_delta = (ev.y * controller.zoom_sensitivity).clamp(-0.5, 0.5);
        controller.distance = (controller.distance * (1.0 - zoom_delta)).clamp(0.1, 50000.0);
    }
}

fn camera_keyboard_system(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut controller: ResMut<CameraController>,
    scene: Res<SceneState>,
) {
    use std::f32::consts::{FRAC_PI_2, PI};

    if keyboard.just_pressed(KeyCode::Digit1) {
        controller.set_preset_view(0.0, 0.0); // Front
    }
    if keyboard.just_pressed(KeyCode::Digit2) {
        controller.set_preset_view(PI, 0.0); // Back
    }
    if keyboard.just_pressed(KeyCode::Digit3) {
        controller.set_preset_view(-FRAC_PI_2, 0.0); // Left
    }
    if keyboard.just_pressed(KeyCode::Digit4) {
        controller.set_preset_view(FRAC_PI_2, 0.0); // Right
    }
    if keyboard.just_pressed(KeyCode::Digit5) {
        controller.set_preset_view(0.0, FRAC_PI_2 - 0.001); // Top
    }
    if keyboard.just_pressed(KeyCode::KeyH) {
        controller.home();
    }
    if keyboard.just_pressed(KeyCode::KeyF) {
        if let Some(bounds) = scene.bounds {
            controller.fit_bounds(bounds.min, bounds.max);
        }
    }
    if keyboard.just_pressed(KeyCode::KeyP) {
        controller.mode = match controller.mode {
            CameraMode::Orbit => CameraMode::Pan,
            CameraMode::Pan => CameraMode::Orbit,
        };
    }
}

/// Frame the model once its first geometry is rendered
fn auto_fit_camera_system(
    scene: Res<SceneState>,
    mut auto_fit: ResMut<AutoFitState>,
    mut controller: ResMut<CameraController>,
) {
    if auto_fit.has_fit {
        return;
    }
    let Some(bounds) = scene.bounds else {
        return;
    };

    log(&format!(
        "[Camera] Auto-fitting to {:?} .. {:?}",
        bounds.min, bounds.max
    ));
    controller.target = bounds.center();
    controller.distance = controller.fit_distance(bounds.min, bounds.max);
    controller.azimuth = 0.785;
    controller.elevation = 0.615;
    auto_fit.has_fit = true;
}

fn camera_update_system(
    mut controller: ResMut<CameraController>,
    mut camera: Query<&mut Transform, With<MainCamera>>,
    time: Res<Time>,
) {
    let dt = time.delta_secs();

    if let Some(mut animation) = controller.animation_target.take() {
        let (t, completed) = animation.advance(dt);
        controller.azimuth = lerp(controller.azimuth, animation.azimuth, t);
        controller.elevation = lerp(controller.elevation, animation.elevation, t);
        controller.distance = lerp(controller.distance, animation.distance, t);
        controller.target = controller.target.lerp(animation.target, t);
        if !completed {
            controller.animation_target = Some(animation);
        }
    }

    if let Ok(mut transform) = camera.single_mut() {
        let position = controller.position();
        transform.translation = transform
            .translation
            .lerp(position, 1.0 - controller.damping.powi(2));
        transform.look_at(controller.target, Vec3::Y);
    }
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_position_on_sphere() {
        let controller = CameraController {
            target: Vec3::new(1.0, 2.0, 3.0),
            distance: 10.0,
            azimuth: 0.0,
            elevation: 0.0,
            ..Default::default()
        };
        let p = controller.position();
        assert_relative_eq!(p.x, 1.0);
        assert_relative_eq!(p.y, 2.0);
        assert_relative_eq!(p.z, 13.0);
    }

    #[test]
    fn test_fit_bounds_targets_center() {
        let mut controller = CameraController::default();
        controller.fit_bounds(Vec3::ZERO, Vec3::new(2.0, 4.0, 6.0));
        let target = controller.animation_target.as_ref().unwrap();
        assert_eq!(target.target, Vec3::new(1.0, 2.0, 3.0));
        assert!(target.distance > (Vec3::new(2.0, 4.0, 6.0)).length());
        assert!(controller.is_animating());
    }

    #[test]
    fn test_animation_completes() {
        let mut animation = CameraAnimationTarget {
            azimuth: 0.0,
            elevation: 0.0,
            distance: 1.0,
            target: Vec3::ZERO,
            duration: 0.5,
            elapsed: 0.0,
        };
        let (t, done) = animation.advance(0.25);
        assert!(t > 0.5 && !done);
        let (t, done) = animation.advance(0.25);
        assert_relative_eq!(t, 1.0);
        assert!(done);
    }

    #[test]
    fn test_look_at_point_keeps_eye() {
        let mut controller = CameraController {
            target: Vec3::ZERO,
            distance: 10.0,
            azimuth: 0.3,
            elevation: 0.4,
            ..Default::default()
        };
        let eye = controller.position();
        let point = Vec3::new(2.0, 1.0, -3.0);
        controller.look_at_point(point);

        let animation = controller.animation_target.clone().unwrap();
        let moved = CameraController {
            target: animation.target,
            distance: animation.distance,
            azimuth: animation.azimuth,
            elevation: animation.elevation,
            ..Default::default()
        };
        assert_eq!(animation.target, point);
        assert_relative_eq!(moved.position().x, eye.x, epsilon = 1e-4);
        assert_relative_eq!(moved.position().y, eye.y, epsilon = 1e-4);
        assert_relative_eq!(moved.position().z, eye.z, epsilon = 1e-4);
    }

    #[test]
    fn test_take_click_resets() {
        let mut controller = CameraController {
            just_clicked: true,
            ..Default::default()
        };
        assert!(controller.take_click());
        assert!(!controller.take_click());
    }
}
