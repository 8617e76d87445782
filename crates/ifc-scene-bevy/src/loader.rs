//! Model file loading - file dialog, drag-and-drop and the load queue
//!
//! Geometry is built on the graph's worker pool; this module only starts
//! jobs and drains them once per frame so the window stays responsive.

use crate::camera::AutoFitState;
use crate::SceneState;
use bevy::prelude::*;
#[cfg(all(not(target_os = "ios"), not(target_os = "macos")))]
use bevy::tasks::IoTaskPool;
use bevy::tasks::Task;
use ifc_scene_graph::{LoadProgress, LoadReport};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

pub struct LoaderPlugin;

impl Plugin for LoaderPlugin {
    fn build(&self, app: &mut App) {
        app.add_message::<OpenFileDialogRequest>()
            .add_message::<LoadFileRequest>()
            .add_message::<ReloadAllRequest>()
            .add_message::<CloseFilesRequest>()
            .add_message::<SceneLoadedEvent>()
            .init_resource::<FileDialogState>()
            .init_resource::<PendingLoads>()
            .add_systems(
                Update,
                (
                    handle_open_dialog_request,
                    poll_file_dialog,
                    handle_file_drop,
                    handle_close_request,
                    handle_reload_request,
                    handle_load_request,
                    poll_load_system,
                )
                    .chain(),
            );
    }
}

/// Message to request opening a file dialog
#[derive(Message)]
pub struct OpenFileDialogRequest;

/// Message to load a model file (from button, drop or command line)
#[derive(Message, Clone, Debug)]
pub struct LoadFileRequest {
    pub path: PathBuf,
}

/// Rebuild every loaded file from disk
#[derive(Message)]
pub struct ReloadAllRequest;

/// Close every loaded file
#[derive(Message)]
pub struct CloseFilesRequest;

/// Message emitted when a file has been fully inserted
#[derive(Message, Clone, Debug)]
pub struct SceneLoadedEvent {
    pub path: PathBuf,
    pub inserted: usize,
    pub failed: usize,
}

impl From<&LoadReport> for SceneLoadedEvent {
    fn from(report: &LoadReport) -> Self {
        Self {
            path: report.path.clone(),
            inserted: report.inserted,
            failed: report.failures.len(),
        }
    }
}

/// State for tracking async file dialog
#[derive(Resource, Default)]
pub struct FileDialogState {
    task: Option<Task<Option<PathBuf>>>,
}

/// Files waiting for the current load to finish
#[derive(Resource, Default, Debug)]
pub struct PendingLoads {
    pub queue: VecDeque<PathBuf>,
}

/// Whether a path looks like a model file the viewer can open
pub fn is_model_file(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Status line for a finished load
pub fn report_status(report: &LoadReport) -> String {
    let mut status = format!(
        "{}: {} products in {:.2}s",
        file_label(&report.path),
        report.inserted,
        report.elapsed.as_secs_f32()
    );
    if !report.failures.is_empty() {
        status.push_str(&format!(", {} failed", report.failures.len()));
    }
    status
}

/// System to handle request to open file dialog (spawns async task)
#[cfg(all(not(target_os = "ios"), not(target_os = "macos")))]
fn handle_open_dialog_request(
    mut requests: MessageReader<OpenFileDialogRequest>,
    mut state: ResMut<FileDialogState>,
) {
    for _ in requests.read() {
        if state.task.is_some() {
            crate::log("[Loader] File dialog already open");
            continue;
        }

        crate::log_info("[Loader] Opening file dialog...");

        let task = IoTaskPool::get().spawn(async {
            use rfd::AsyncFileDialog;

            let file = AsyncFileDialog::new()
                .add_filter("Model Files", &["json", "JSON"])
                .set_title("Open Model File")
                .pick_file()
                .await;

            file.map(|f| f.path().to_path_buf())
        });

        state.task = Some(task);
    }
}

/// Stub for platforms without rfd
#[cfg(any(target_os = "ios", target_os = "macos"))]
fn handle_open_dialog_request(
    mut requests: MessageReader<OpenFileDialogRequest>,
    mut _state: ResMut<FileDialogState>,
) {
    for _ in requests.read() {
        crate::log_info("[Loader] No file dialog on this platform; drop a file instead");
    }
}

fn poll_file_dialog(
    mut state: ResMut<FileDialogState>,
    mut load_requests: MessageWriter<LoadFileRequest>,
) {
    let Some(task) = state.task.as_mut() else {
        return;
    };
    if let Some(result) = bevy::tasks::block_on(bevy::tasks::poll_once(task)) {
        match result {
            Some(path) => {
                crate::log_info(&format!("[Loader] File selected: {:?}", path));
                load_requests.write(LoadFileRequest { path });
            }
            None => crate::log("[Loader] File dialog cancelled"),
        }
        state.task = None;
    }
}

fn handle_file_drop(
    mut drops: MessageReader<bevy::window::FileDragAndDrop>,
    mut load_requests: MessageWriter<LoadFileRequest>,
) {
    for event in drops.read() {
        if let bevy::window::FileDragAndDrop::DroppedFile { path_buf, .. } = event {
            if is_model_file(path_buf) {
                crate::log_info(&format!("[Loader] File dropped: {:?}", path_buf));
                load_requests.write(LoadFileRequest {
                    path: path_buf.clone(),
                });
            } else {
                crate::log(&format!("[Loader] Ignoring dropped file {:?}", path_buf));
            }
        }
    }
}

/// Queue requests and start the next one when idle
fn handle_load_request(
    mut requests: MessageReader<LoadFileRequest>,
    mut pending: ResMut<PendingLoads>,
    mut scene: ResMut<SceneState>,
) {
    for request in requests.read() {
        if !pending.queue.contains(&request.path) {
            pending.queue.push_back(request.path.clone());
        }
    }

    if scene.job.is_some() {
        return;
    }
    while let Some(path) = pending.queue.pop_front() {
        match scene.view.begin_load(&path) {
            Ok(job) => {
                crate::log_info(&format!("[Loader] Loading file: {:?}", path));
                scene.status = format!("Loading {}...", file_label(&path));
                scene.job = Some(job);
                return;
            }
            Err(e) => {
                log::error!("[Loader] Error loading {:?}: {}", path, e);
                scene.status = format!("Failed to open {}: {}", file_label(&path), e);
            }
        }
    }
}

/// Drain finished geometry into the graph
fn poll_load_system(
    mut scene: ResMut<SceneState>,
    mut auto_fit: ResMut<AutoFitState>,
    mut loaded: MessageWriter<SceneLoadedEvent>,
) {
    let Some(mut job) = scene.job.take() else {
        return;
    };

    match scene.view.poll_load(&mut job) {
        Ok(LoadProgress::Pending { inserted }) => {
            scene.status = format!(
                "Loading {}: {} products ({:.0}%)",
                file_label(job.path()),
                inserted,
                job.progress() * 100.0
            );
            scene.job = Some(job);
        }
        Ok(LoadProgress::Finished(report)) => {
            crate::log_info(&format!(
                "[Loader] Loaded {} products ({} failed)",
                report.inserted,
                report.failures.len()
            ));
            scene.status = report_status(&report);
            auto_fit.has_fit = false;
            loaded.write(SceneLoadedEvent::from(&report));
        }
        Err(e) => {
            log::error!("[Loader] Load of {:?} failed: {}", job.path(), e);
            scene.status = format!("Failed to load {}: {}", file_label(job.path()), e);
            if let Err(e) = scene.view.abandon_load(job) {
                log::error!("[Loader] Could not discard partial load: {}", e);
            }
        }
    }
}

fn handle_reload_request(
    mut requests: MessageReader<ReloadAllRequest>,
    mut scene: ResMut<SceneState>,
    mut loaded: MessageWriter<SceneLoadedEvent>,
) {
    if requests.read().count() == 0 {
        return;
    }
    if scene.job.is_some() {
        scene.status = "Reload ignored: a file is still loading".to_string();
        return;
    }

    match scene.view.reload_all() {
        Ok(reports) => {
            let inserted: usize = reports.iter().map(|r| r.inserted).sum();
            crate::log_info(&format!(
                "[Loader] Reloaded {} files, {} products",
                reports.len(),
                inserted
            ));
            scene.status = format!("Reloaded {} files", reports.len());
            for report in &reports {
                loaded.write(SceneLoadedEvent::from(report));
            }
        }
        Err(e) => {
            log::error!("[Loader] Reload failed: {}", e);
            scene.status = format!("Reload failed: {}", e);
        }
    }
}

fn handle_close_request(
    mut requests: MessageReader<CloseFilesRequest>,
    mut scene: ResMut<SceneState>,
    mut pending: ResMut<PendingLoads>,
    mut auto_fit: ResMut<AutoFitState>,
) {
    if requests.read().count() == 0 {
        return;
    }

    pending.queue.clear();
    if let Some(job) = scene.job.take() {
        if let Err(e) = scene.view.abandon_load(job) {
            log::error!("[Loader] Could not discard partial load: {}", e);
        }
    }

    match scene.view.close_files() {
        Ok(()) => {
            crate::log_info("[Loader] Closed all files");
            scene.status = "Ready".to_string();
        }
        Err(e) => {
            log::error!("[Loader] Close failed: {}", e);
            scene.status = format!("Close failed: {}", e);
        }
    }
    scene.bounds = None;
    auto_fit.has_fit = false;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_model_file_filter() {
        assert!(is_model_file(Path::new("/tmp/house.json")));
        assert!(is_model_file(Path::new("HOUSE.JSON")));
        assert!(!is_model_file(Path::new("house.ifc")));
        assert!(!is_model_file(Path::new("json")));
    }

    #[test]
    fn test_report_status() {
        let report = LoadReport {
            path: PathBuf::from("/models/house.json"),
            products: 4,
            inserted: 3,
            elapsed: Duration::from_millis(1500),
            ..Default::default()
        };
        assert_eq!(report_status(&report), "house.json: 3 products in 1.50s");

        let event = SceneLoadedEvent::from(&report);
        assert_eq!(event.inserted, 3);
        assert_eq!(event.failed, 0);
    }

    #[test]
    fn test_load_request_runs_through_the_app() {
        let path = std::env::temp_dir().join(format!("ifc-scene-loader-{}.json", std::process::id()));
        std::fs::write(
            &path,
            r#"{
                "schema": "IFC4",
                "products": [
                    {
                        "id": 1,
                        "global_id": "G1",
                        "class": "IfcWall",
                        "items": [{
                            "coordinates": [[0,0,0],[1,0,0],[1,1,0]],
                            "faces": [{ "indices": [0,1,2] }]
                        }]
                    }
                ]
            }"#,
        )
        .unwrap();

        let view = ifc_scene_graph::SceneView::new(Default::default()).unwrap();
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .add_message::<bevy::window::FileDragAndDrop>()
            .insert_resource(SceneState::new(view))
            .init_resource::<AutoFitState>()
            .add_plugins(LoaderPlugin);

        app.world_mut()
            .write_message(LoadFileRequest { path: path.clone() });
        for _ in 0..200 {
            app.update();
            if app.world().resource::<SceneState>().job.is_none() {
                break;
            }
            std::thread::sleep(Duration::from_millis(5));
        }

        let scene = app.world().resource::<SceneState>();
        assert!(scene.job.is_none());
        assert_eq!(scene.view.graph().product_count(), 1);
        assert!(scene.status.starts_with("ifc-scene-loader-"));
        std::fs::remove_file(&path).unwrap();
    }
}
