//! Bevy UI for the scene viewer
//!
//! Toolbar, hierarchy and properties panels around the 3D viewport.

mod hierarchy;
mod layout;
mod properties;
mod styles;
mod toolbar;

pub use hierarchy::*;
pub use layout::*;
pub use properties::*;
pub use styles::*;
pub use toolbar::{ButtonAction, ToolbarButton, ToolbarPlugin};

use bevy::input::mouse::MouseWheel;
use bevy::prelude::*;
use bevy::ui::{ComputedNode, ScrollPosition};

pub struct ViewerUiPlugin;

impl Plugin for ViewerUiPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<UiState>()
            .add_plugins((
                LayoutPlugin,
                ToolbarPlugin,
                HierarchyPlugin,
                PropertiesPlugin,
            ))
            .add_systems(Update, ui_scroll_system);
    }
}

/// Marker for scrollable panels that need manual scroll handling
#[derive(Component)]
pub struct ScrollablePanel;

/// Scroll the panel under the cursor
fn ui_scroll_system(
    mut mouse_wheel: MessageReader<MouseWheel>,
    mut scrollable_query: Query<
        (&mut ScrollPosition, &ComputedNode, &GlobalTransform),
        With<ScrollablePanel>,
    >,
    windows: Query<&Window>,
) {
    const LINE_HEIGHT: f32 = 40.0;

    let Ok(window) = windows.single() else {
        return;
    };
    let Some(cursor_pos) = window.cursor_position() else {
        return;
    };

    for ev in mouse_wheel.read() {
        let delta_y = -ev.y * LINE_HEIGHT;

        for (mut scroll_pos, computed, global_transform) in scrollable_query.iter_mut() {
            let center = global_transform.translation().truncate();
            let half_size = computed.size() / 2.0;
            let min = center - half_size;
            let max = center + half_size;

            if cursor_pos.cmpge(min).all() && cursor_pos.cmple(max).all() {
                scroll_pos.y = (scroll_pos.y + delta_y).max(0.0);
                // One panel per event
                break;
            }
        }
    }
}

/// Panel visibility
#[derive(Resource)]
pub struct UiState {
    /// Left panel (hierarchy) visible
    pub show_hierarchy: bool,
    /// Right panel (properties) visible
    pub show_properties: bool,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            show_hierarchy: true,
            show_properties: true,
        }
    }
}
