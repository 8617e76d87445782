//! Desktop entry point
//!
//! Usage: `ifc-scene-viewer [model.json ...]`. The viewer configuration is
//! read from the file named by `IFC_SCENE_CONFIG`.

use ifc_scene_bevy::{run_native, ViewerConfig};
use std::path::PathBuf;

fn main() {
    let files: Vec<PathBuf> = std::env::args_os().skip(1).map(PathBuf::from).collect();
    run_native(ViewerConfig::from_env(), files);
}
