//! Hierarchy panel - the scene graph mirror as an indented tree
//!
//! Product rows carry a visibility checkbox. Clicking a row selects the
//! product the same way a plain click in the 3D view does.

use super::layout::LeftPanel;
use super::styles::{row_indent, small_text, UiColors, UiSizes};
use crate::SceneState;
use bevy::ecs::hierarchy::ChildSpawnerCommands;
use bevy::prelude::*;
use bevy::ui::{
    widget::Button, AlignItems, BackgroundColor, BorderRadius, FlexDirection, Interaction, Node,
    UiRect, Val,
};
use ifc_scene_graph::model::GlobalId;
use ifc_scene_graph::{tags, MirrorRow, Modifiers, NodeKey, SceneEvent, SceneGraph, Subscription};

pub struct HierarchyPlugin;

impl Plugin for HierarchyPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, setup_hierarchy.after(super::layout::setup_layout))
            .add_systems(
                Update,
                (handle_entity_click, handle_toggle_click, update_hierarchy).chain(),
            );
    }
}

/// Name of the hierarchy's subscription on the event bus
pub const TREE_VIEW: &str = "tree";

/// The hierarchy's end of the event bus
#[derive(Resource)]
pub struct TreeSubscription {
    pub subscription: Subscription,
    /// Graph revision the rows were built from
    revision: Option<u64>,
}

#[derive(Component)]
pub struct HierarchyContent;

/// Marker for every spawned row (cleanup marker)
#[derive(Component)]
pub struct HierarchyItem;

/// Clickable label of a row
#[derive(Component)]
pub struct EntityListItem {
    pub node: NodeKey,
    pub global_id: Option<GlobalId>,
}

/// Visibility checkbox of a product row
#[derive(Component)]
pub struct HierarchyToggle {
    pub node: NodeKey,
}

fn setup_hierarchy(
    mut commands: Commands,
    panel_query: Query<Entity, With<LeftPanel>>,
    scene: Res<SceneState>,
) {
    commands.insert_resource(TreeSubscription {
        subscription: scene.view.bus().subscribe(TREE_VIEW),
        revision: None,
    });

    let Ok(panel_entity) = panel_query.single() else {
        return;
    };

    commands.entity(panel_entity).with_children(|panel| {
        panel.spawn((
            Text::new("Scene"),
            TextFont {
                font_size: UiSizes::FONT_SIZE_LG,
                ..default()
            },
            TextColor(UiColors::TEXT_PRIMARY),
            Node {
                margin: UiRect::bottom(Val::Px(UiSizes::PADDING)),
                ..default()
            },
        ));

        panel.spawn((
            HierarchyContent,
            Node {
                width: Val::Percent(100.0),
                flex_direction: FlexDirection::Column,
                ..default()
            },
            BackgroundColor(Color::NONE),
        ));
    });
}

/// Checkbox glyph for a toggle state
pub fn toggle_glyph(visible: bool) -> &'static str {
    if visible {
        "[x]"
    } else {
        "[ ]"
    }
}

/// Display text of a row: product name and class when tagged
pub fn row_label(graph: &SceneGraph, row: &MirrorRow) -> String {
    let Some(node) = graph.get(row.node) else {
        return row.name.clone();
    };
    let name = node.tag(tags::NAME).and_then(|t| t.as_text());
    let class = node.tag(tags::CLASS).and_then(|t| t.as_text());
    match (name, class) {
        (Some(name), Some(class)) if !name.is_empty() => format!("{} ({})", name, class),
        (_, Some(class)) => format!("{} ({})", row.name, class),
        _ => row.name.clone(),
    }
}

fn update_hierarchy(
    mut commands: Commands,
    scene: Res<SceneState>,
    tree: Option<ResMut<TreeSubscription>>,
    content_query: Query<Entity, With<HierarchyContent>>,
    existing_items: Query<Entity, With<HierarchyItem>>,
) {
    let Some(mut tree) = tree else {
        return;
    };

    // Updates from other views force a rebuild even without graph changes
    let events = tree.subscription.drain();
    let updated = events.iter().any(|e| matches!(e, SceneEvent::Update(_)));
    let revision = scene.view.graph().revision();
    if tree.revision == Some(revision) && !updated {
        return;
    }
    tree.revision = Some(revision);

    let Ok(content_entity) = content_query.single() else {
        return;
    };

    for entity in existing_items.iter() {
        commands.entity(entity).despawn();
    }

    let graph = scene.view.graph();
    let selection = scene.view.selection();
    let mirror = scene.view.mirror();

    commands.entity(content_entity).with_children(|content| {
        for row in mirror.rows() {
            let global_id = graph.get(row.node).and_then(|n| n.global_id());
            let selected = global_id
                .as_ref()
                .is_some_and(|gid| selection.is_selected(gid));
            spawn_row(content, row, row_label(graph, row), global_id, selected);
        }
    });
    crate::log(&format!("[UI] Hierarchy rebuilt at revision {}", revision));
}

fn spawn_row(
    parent: &mut ChildSpawnerCommands,
    row: &MirrorRow,
    label: String,
    global_id: Option<GlobalId>,
    selected: bool,
) {
    let text_color = match row.toggle {
        Some(false) => UiColors::TEXT_MUTED,
        _ if row.depth == 0 => UiColors::TEXT_ACCENT,
        _ => UiColors::TEXT_PRIMARY,
    };

    parent
        .spawn((
            HierarchyItem,
            Node {
                width: Val::Percent(100.0),
                flex_direction: FlexDirection::Row,
                align_items: AlignItems::Center,
                padding: row_indent(row.depth),
                ..default()
            },
        ))
        .with_children(|line: &mut ChildSpawnerCommands| {
            if let Some(visible) = row.toggle {
                line.spawn((
                    HierarchyToggle { node: row.node },
                    Button,
                    Node {
                        margin: UiRect::right(Val::Px(UiSizes::PADDING_SM)),
                        ..default()
                    },
                    BackgroundColor(Color::NONE),
                ))
                .with_children(|toggle: &mut ChildSpawnerCommands| {
                    toggle.spawn(small_text(toggle_glyph(visible), UiColors::TEXT_SECONDARY));
                });
            }

            line.spawn((
                EntityListItem {
                    node: row.node,
                    global_id,
                },
                Button,
                Node {
                    flex_grow: 1.0,
                    padding: UiRect::horizontal(Val::Px(UiSizes::PADDING_SM)),
                    border_radius: BorderRadius::all(Val::Px(UiSizes::BORDER_RADIUS)),
                    ..default()
                },
                BackgroundColor(if selected {
                    UiColors::SELECTED
                } else {
                    Color::NONE
                }),
            ))
            .with_children(|item: &mut ChildSpawnerCommands| {
                item.spawn(small_text(label, text_color));
                item.spawn(small_text(format!("  {}", row.type_name), UiColors::TEXT_SECONDARY));
            });
        });
}

fn handle_entity_click(
    mut query: Query<(&Interaction, &EntityListItem, &mut BackgroundColor), Changed<Interaction>>,
    mut scene: ResMut<SceneState>,
) {
    for (interaction, item, mut bg_color) in query.iter_mut() {
        let selected = item
            .global_id
            .as_ref()
            .is_some_and(|gid| scene.view.selection().is_selected(gid));
        match *interaction {
            Interaction::Pressed => {
                if let Some(gid) = &item.global_id {
                    scene.view.pick(gid, Modifiers::default());
                    *bg_color = BackgroundColor(UiColors::SELECTED);
                }
            }
            Interaction::Hovered => {
                *bg_color = BackgroundColor(UiColors::HOVER);
            }
            Interaction::None => {
                *bg_color = BackgroundColor(if selected {
                    UiColors::SELECTED
                } else {
                    Color::NONE
                });
            }
        }
    }
}

fn handle_toggle_click(
    query: Query<(&Interaction, &HierarchyToggle), Changed<Interaction>>,
    mut scene: ResMut<SceneState>,
) {
    for (interaction, toggle) in query.iter() {
        if *interaction != Interaction::Pressed {
            continue;
        }
        match scene.view.toggle_visibility(toggle.node) {
            Ok(visible) => crate::log(&format!("[UI] Product visible: {}", visible)),
            Err(e) => log::warn!("[UI] Cannot toggle visibility: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ifc_scene_graph::SceneGraphMirror;

    #[test]
    fn test_row_label_uses_name_and_class() {
        let mut graph = SceneGraph::new("Root");
        let root = graph.root();
        let wall = graph.spawn(root, "2O2Fr$t4X7Zf8NOew3FLOH").unwrap();
        graph.set_tag(wall, tags::IS_PRODUCT, true).unwrap();
        graph.set_tag(wall, tags::CLASS, "IfcWall").unwrap();
        graph.set_tag(wall, tags::NAME, "Basic Wall").unwrap();
        let slab = graph.spawn(root, "0K7w7JN4n3nxqYJvZGbxUs").unwrap();
        graph.set_tag(slab, tags::CLASS, "IfcSlab").unwrap();

        let mirror = SceneGraphMirror::rebuild(&graph, root);
        let rows = mirror.rows();
        assert_eq!(row_label(&graph, rows[0]), "Root");
        assert_eq!(row_label(&graph, rows[1]), "Basic Wall (IfcWall)");
        assert_eq!(row_label(&graph, rows[2]), "0K7w7JN4n3nxqYJvZGbxUs (IfcSlab)");
        assert_eq!(rows[1].toggle, Some(true));
        assert_eq!(rows[2].toggle, None);
    }

    #[test]
    fn test_toggle_glyph() {
        assert_eq!(toggle_glyph(true), "[x]");
        assert_eq!(toggle_glyph(false), "[ ]");
    }
}
