//! IFC-Scene Bevy Viewer
//!
//! Renders the scene graph built by `ifc-scene-graph` with Bevy. The graph
//! stays the source of truth: this crate mirrors it into Bevy entities,
//! forwards clicks to the selection controller, and hosts the panels.
//!
//! Features pure Bevy UI (toolbar, hierarchy, properties).

pub mod camera;
pub mod config;
pub mod loader;
pub mod picking;
pub mod render;

#[cfg(feature = "bevy-ui")]
pub mod ui;

use bevy::prelude::*;
use ifc_scene_graph::{LoadJob, SceneView};
use std::sync::atomic::{AtomicBool, Ordering};

/// Global debug mode flag (set from the DEBUG environment variable)
static DEBUG_MODE: AtomicBool = AtomicBool::new(false);

/// Check if debug mode is enabled
pub fn is_debug() -> bool {
    DEBUG_MODE.load(Ordering::Relaxed)
}

fn init_debug_from_env() {
    if std::env::var("DEBUG").is_ok() {
        DEBUG_MODE.store(true, Ordering::Relaxed);
    }
}

/// Route `log` records to stderr, filtered by `RUST_LOG`
fn init_logging() {
    let default = if is_debug() { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    if tracing_subscriber::fmt().with_env_filter(filter).try_init().is_err() {
        log::warn!("Logger already installed");
    }
}

// Re-exports
pub use camera::{AutoFitState, CameraController, CameraMode, CameraPlugin, MainCamera};
pub use config::{Theme, ViewerConfig};
pub use loader::{
    CloseFilesRequest, LoadFileRequest, LoaderPlugin, OpenFileDialogRequest, ReloadAllRequest,
    SceneLoadedEvent,
};
pub use picking::PickingPlugin;
pub use render::{RenderPlugin, RenderedNode};

#[cfg(feature = "bevy-ui")]
pub use ui::{UiState, ViewerUiPlugin};

/// Main viewer plugin - combines all subsystems
pub struct SceneViewerPlugin {
    pub config: ViewerConfig,
}

impl Plugin for SceneViewerPlugin {
    fn build(&self, app: &mut App) {
        let view = match SceneView::new(self.config.scene.clone()) {
            Ok(view) => view,
            Err(e) => {
                log::error!("Scene setup failed: {}", e);
                return;
            }
        };

        app.insert_resource(SceneState::new(view))
            .insert_resource(ViewerSettings::from(&self.config))
            .insert_resource(ClearColor(self.config.theme.background_color()))
            .add_plugins((CameraPlugin, RenderPlugin, PickingPlugin, LoaderPlugin))
            .add_systems(Update, sync_selection_system);

        #[cfg(feature = "bevy-ui")]
        app.add_plugins(ViewerUiPlugin);
    }
}

/// The scene and its in-flight load
#[derive(Resource)]
pub struct SceneState {
    pub view: SceneView,
    pub job: Option<LoadJob>,
    /// Bounds of the rendered model geometry
    pub bounds: Option<SceneBounds>,
    /// Last status line for the UI
    pub status: String,
}

impl SceneState {
    pub fn new(view: SceneView) -> Self {
        Self {
            view,
            job: None,
            bounds: None,
            status: "Ready".to_string(),
        }
    }
}

/// Axis-aligned bounding box for scene
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SceneBounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl SceneBounds {
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn diagonal(&self) -> f32 {
        self.size().length()
    }

    pub fn union(self, other: SceneBounds) -> SceneBounds {
        SceneBounds {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }
}

/// Viewer settings and state
#[derive(Resource, Clone, Debug)]
pub struct ViewerSettings {
    pub theme: Theme,
    pub show_grid: bool,
    pub show_axes: bool,
}

impl From<&ViewerConfig> for ViewerSettings {
    fn from(config: &ViewerConfig) -> Self {
        Self {
            theme: config.theme,
            show_grid: config.show_grid,
            show_axes: config.show_axes,
        }
    }
}

impl Theme {
    pub fn background_color(&self) -> Color {
        match self {
            Theme::Light => Color::srgb(0.95, 0.95, 0.95),
            Theme::Dark => Color::srgb(0.12, 0.12, 0.12),
        }
    }
}

/// Apply selection events published by other views
fn sync_selection_system(mut scene: ResMut<SceneState>) {
    let changed = scene.view.sync();
    if changed > 0 {
        log(&format!("[Bevy] Applied {} external selection events", changed));
    }
}

/// Log only in debug mode
pub fn log(msg: &str) {
    if is_debug() {
        log::debug!("{}", msg);
    }
}

/// Log info that should always be shown
pub fn log_info(msg: &str) {
    log::info!("{}", msg);
}

/// Files to open once the viewer is up
#[derive(Resource, Default, Clone, Debug)]
pub struct StartupFiles(pub Vec<std::path::PathBuf>);

fn open_startup_files(files: Res<StartupFiles>, mut requests: MessageWriter<LoadFileRequest>) {
    for path in &files.0 {
        requests.write(LoadFileRequest { path: path.clone() });
    }
}

/// Run the desktop viewer, opening `files` on start
pub fn run_native(config: ViewerConfig, files: Vec<std::path::PathBuf>) {
    init_debug_from_env();
    init_logging();
    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: config.window_title.clone(),
                resolution: (1280u32, 720u32).into(),
                ..default()
            }),
            ..default()
        }))
        .add_plugins(SceneViewerPlugin { config })
        .insert_resource(StartupFiles(files))
        .add_systems(Startup, open_startup_files)
        .run();
}
