//! Main UI layout - toolbar, panels, viewport, status bar

use super::styles::{UiColors, UiSizes};
use crate::SceneState;
use bevy::prelude::*;
use bevy::ui::{
    AlignItems, BackgroundColor, FlexDirection, Node, Overflow, ScrollPosition, UiRect, Val,
};

pub struct LayoutPlugin;

impl Plugin for LayoutPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, (setup_ui_camera, setup_layout).chain())
            .add_systems(Update, update_status_bar);
    }
}

/// Marker for the UI camera
#[derive(Component)]
pub struct UiOnlyCamera;

/// Dedicated 2D camera drawing the UI over the 3D view
fn setup_ui_camera(mut commands: Commands) {
    commands.spawn((
        Camera2d,
        Camera {
            order: 1,
            clear_color: ClearColorConfig::None,
            ..default()
        },
        UiOnlyCamera,
    ));
}

/// Marker for the root UI node
#[derive(Component)]
pub struct UiRoot;

#[derive(Component)]
pub struct ToolbarContainer;

/// Marker for the left panel (hierarchy)
#[derive(Component)]
pub struct LeftPanel;

/// Marker for the right panel (properties)
#[derive(Component)]
pub struct RightPanel;

/// Transparent area the 3D view shows through
#[derive(Component)]
pub struct ViewportArea;

#[derive(Component)]
pub struct StatusBar;

/// Text of the status bar
#[derive(Component)]
pub struct StatusText;

fn side_panel() -> Node {
    Node {
        width: Val::Px(UiSizes::PANEL_WIDTH),
        height: Val::Percent(100.0),
        flex_direction: FlexDirection::Column,
        padding: UiRect::all(Val::Px(UiSizes::PADDING)),
        overflow: Overflow::scroll_y(),
        ..default()
    }
}

pub fn setup_layout(mut commands: Commands) {
    crate::log("[UI] Setting up layout");

    commands
        .spawn((
            UiRoot,
            Node {
                width: Val::Percent(100.0),
                height: Val::Percent(100.0),
                flex_direction: FlexDirection::Column,
                ..default()
            },
            BackgroundColor(Color::NONE),
        ))
        .with_children(|parent| {
            parent.spawn((
                ToolbarContainer,
                Node {
                    width: Val::Percent(100.0),
                    height: Val::Px(UiSizes::TOOLBAR_HEIGHT),
                    flex_direction: FlexDirection::Row,
                    align_items: AlignItems::Center,
                    padding: UiRect::horizontal(Val::Px(UiSizes::PADDING)),
                    ..default()
                },
                BackgroundColor(UiColors::TOOLBAR_BG),
            ));

            parent
                .spawn((
                    Node {
                        width: Val::Percent(100.0),
                        flex_grow: 1.0,
                        flex_direction: FlexDirection::Row,
                        ..default()
                    },
                    BackgroundColor(Color::NONE),
                ))
                .with_children(|content| {
                    content.spawn((
                        LeftPanel,
                        super::ScrollablePanel,
                        side_panel(),
                        BackgroundColor(UiColors::PANEL_BG),
                        Interaction::default(),
                        ScrollPosition::default(),
                    ));

                    content.spawn((
                        ViewportArea,
                        Node {
                            flex_grow: 1.0,
                            height: Val::Percent(100.0),
                            ..default()
                        },
                        BackgroundColor(Color::NONE),
                    ));

                    content.spawn((
                        RightPanel,
                        super::ScrollablePanel,
                        side_panel(),
                        BackgroundColor(UiColors::PANEL_BG),
                        Interaction::default(),
                        ScrollPosition::default(),
                    ));
                });

            parent
                .spawn((
                    StatusBar,
                    Node {
                        width: Val::Percent(100.0),
                        height: Val::Px(UiSizes::STATUS_HEIGHT),
                        flex_direction: FlexDirection::Row,
                        align_items: AlignItems::Center,
                        padding: UiRect::horizontal(Val::Px(UiSizes::PADDING)),
                        ..default()
                    },
                    BackgroundColor(UiColors::TOOLBAR_BG),
                ))
                .with_children(|bar| {
                    bar.spawn((
                        StatusText,
                        super::styles::small_text("Ready", UiColors::TEXT_SECONDARY),
                    ));
                });
        });
}

fn update_status_bar(scene: Res<SceneState>, mut texts: Query<&mut Text, With<StatusText>>) {
    if !scene.is_changed() {
        return;
    }
    for mut text in texts.iter_mut() {
        if text.0 != scene.status {
            text.0 = scene.status.clone();
        }
    }
}
