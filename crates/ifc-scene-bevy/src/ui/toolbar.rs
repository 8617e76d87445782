//! Toolbar UI component

use bevy::ecs::hierarchy::ChildSpawnerCommands;
use bevy::prelude::*;
use bevy::ui::{
    widget::Button, AlignItems, BackgroundColor, BorderRadius, Interaction, JustifyContent, Node,
    UiRect, Val,
};

use super::layout::{LeftPanel, RightPanel, ToolbarContainer};
use super::styles::{UiColors, UiSizes};
use crate::camera::CameraController;
use crate::loader::{CloseFilesRequest, OpenFileDialogRequest, ReloadAllRequest};
use crate::SceneState;

pub struct ToolbarPlugin;

impl Plugin for ToolbarPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, setup_toolbar.after(super::layout::setup_layout))
            .add_systems(Update, button_interaction);
    }
}

#[derive(Component)]
pub struct ToolbarButton {
    pub action: ButtonAction,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ButtonAction {
    OpenFile,
    ReloadAll,
    CloseAll,
    ToggleMeshes,
    ToggleWireframe,
    Home,
    FitAll,
    ToggleHierarchy,
    ToggleProperties,
}

impl ButtonAction {
    pub fn label(self) -> &'static str {
        match self {
            ButtonAction::OpenFile => "Open",
            ButtonAction::ReloadAll => "Reload",
            ButtonAction::CloseAll => "Close",
            ButtonAction::ToggleMeshes => "Meshes",
            ButtonAction::ToggleWireframe => "Wireframe",
            ButtonAction::Home => "Home",
            ButtonAction::FitAll => "Fit",
            ButtonAction::ToggleHierarchy => "Tree",
            ButtonAction::ToggleProperties => "Props",
        }
    }
}

/// Toolbar sections, separated in order
const SECTIONS: [&[ButtonAction]; 4] = [
    &[ButtonAction::OpenFile, ButtonAction::ReloadAll, ButtonAction::CloseAll],
    &[ButtonAction::ToggleMeshes, ButtonAction::ToggleWireframe],
    &[ButtonAction::Home, ButtonAction::FitAll],
    &[ButtonAction::ToggleHierarchy, ButtonAction::ToggleProperties],
];

fn setup_toolbar(
    mut commands: Commands,
    toolbar_query: Query<Entity, With<ToolbarContainer>>,
    settings: Res<crate::ViewerSettings>,
) {
    let Ok(toolbar_entity) = toolbar_query.single() else {
        return;
    };

    commands.entity(toolbar_entity).with_children(|toolbar| {
        for (i, section) in SECTIONS.iter().enumerate() {
            if i > 0 {
                spawn_separator(toolbar);
            }
            for &action in section.iter() {
                spawn_button(toolbar, action);
            }
        }

        toolbar.spawn(Node {
            flex_grow: 1.0,
            ..default()
        });

        let theme = match settings.theme {
            crate::Theme::Light => "light",
            crate::Theme::Dark => "dark",
        };
        toolbar.spawn((
            Text::new(format!("IFC Scene Viewer ({})", theme)),
            TextFont {
                font_size: UiSizes::FONT_SIZE,
                ..default()
            },
            TextColor(UiColors::TEXT_SECONDARY),
        ));
    });
}

fn spawn_button(parent: &mut ChildSpawnerCommands, action: ButtonAction) {
    parent
        .spawn((
            ToolbarButton { action },
            Button,
            Node {
                height: Val::Px(UiSizes::BUTTON_SIZE),
                padding: UiRect::horizontal(Val::Px(12.0)),
                justify_content: JustifyContent::Center,
                align_items: AlignItems::Center,
                margin: UiRect::horizontal(Val::Px(2.0)),
                border_radius: BorderRadius::all(Val::Px(UiSizes::BORDER_RADIUS)),
                ..default()
            },
            BackgroundColor(UiColors::BUTTON_BG),
        ))
        .with_children(|btn: &mut ChildSpawnerCommands| {
            btn.spawn(super::styles::small_text(action.label(), UiColors::TEXT_PRIMARY));
        });
}

fn spawn_separator(parent: &mut ChildSpawnerCommands) {
    parent.spawn((
        Node {
            width: Val::Px(1.0),
            height: Val::Px(24.0),
            margin: UiRect::horizontal(Val::Px(8.0)),
            ..default()
        },
        BackgroundColor(UiColors::BORDER),
    ));
}

fn panel_visibility(show: bool) -> Visibility {
    if show {
        Visibility::Inherited
    } else {
        Visibility::Hidden
    }
}

#[allow(clippy::too_many_arguments)]
fn button_interaction(
    mut query: Query<(&Interaction, &mut BackgroundColor, &ToolbarButton), Changed<Interaction>>,
    mut ui_state: ResMut<super::UiState>,
    mut left_panel: Query<&mut Visibility, (With<LeftPanel>, Without<RightPanel>)>,
    mut right_panel: Query<&mut Visibility, (With<RightPanel>, Without<LeftPanel>)>,
    mut open_dialog: MessageWriter<OpenFileDialogRequest>,
    mut reload: MessageWriter<ReloadAllRequest>,
    mut close: MessageWriter<CloseFilesRequest>,
    mut camera_controller: ResMut<CameraController>,
    mut scene: ResMut<SceneState>,
) {
    for (interaction, mut bg_color, button) in query.iter_mut() {
        match *interaction {
            Interaction::Pressed => {
                *bg_color = BackgroundColor(UiColors::BUTTON_ACTIVE);
                crate::log(&format!("[UI] {:?} pressed", button.action));

                match button.action {
                    ButtonAction::OpenFile => {
                        open_dialog.write(OpenFileDialogRequest);
                    }
                    ButtonAction::ReloadAll => {
                        reload.write(ReloadAllRequest);
                    }
                    ButtonAction::CloseAll => {
                        close.write(CloseFilesRequest);
                    }
                    ButtonAction::ToggleMeshes => {
                        let visible = scene.view.toggle_meshes();
                        scene.status = format!("Meshes {}", if visible { "shown" } else { "hidden" });
                    }
                    ButtonAction::ToggleWireframe => {
                        let visible = scene.view.toggle_wireframe();
                        scene.status =
                            format!("Wireframe {}", if visible { "shown" } else { "hidden" });
                    }
                    ButtonAction::Home => camera_controller.home(),
                    ButtonAction::FitAll => {
                        if let Some(bounds) = scene.bounds {
                            camera_controller.fit_bounds(bounds.min, bounds.max);
                        }
                    }
                    ButtonAction::ToggleHierarchy => {
                        ui_state.show_hierarchy = !ui_state.show_hierarchy;
                        if let Ok(mut vis) = left_panel.single_mut() {
                            *vis = panel_visibility(ui_state.show_hierarchy);
                        }
                    }
                    ButtonAction::ToggleProperties => {
                        ui_state.show_properties = !ui_state.show_properties;
                        if let Ok(mut vis) = right_panel.single_mut() {
                            *vis = panel_visibility(ui_state.show_properties);
                        }
                    }
                }
            }
            Interaction::Hovered => {
                *bg_color = BackgroundColor(UiColors::BUTTON_HOVER);
            }
            Interaction::None => {
                *bg_color = BackgroundColor(UiColors::BUTTON_BG);
            }
        }
    }
}
